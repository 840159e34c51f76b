use alloy::dyn_abi::{DynSolValue, EventExt};
use alloy::rpc::types::Log;
use alloy_json_abi::{Event, JsonAbi};
use alloy_primitives::{Address, B256, U256};
use amm_core::types::LogPosition;
use amm_core::{AmmError, Amount, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::fields::{FieldRef, STRATEGIES};
use crate::typed::{log_position, FromDecodedLog};

/// One event parameter, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    /// `None` when the interface description leaves the parameter unnamed
    pub name: Option<String>,
    pub value: DynSolValue,
}

/// A log matched against an interface description
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    pub name: String,
    /// Contract that emitted the log
    pub emitter: Address,
    pub fields: Vec<DecodedField>,
    pub position: LogPosition,
}

impl DecodedLog {
    /// First value produced by the extraction strategies, in order
    pub fn field(&self, field: &FieldRef) -> Option<&DynSolValue> {
        STRATEGIES.iter().find_map(|strategy| strategy(self, field))
    }

    fn missing(&self, field: &FieldRef, expected: &str) -> AmmError {
        AmmError::Decode(format!(
            "{}: no {} at '{}' or position {}",
            self.name, expected, field.name, field.index
        ))
    }

    pub fn address(&self, field: &FieldRef) -> Result<Address> {
        match self.field(field) {
            Some(DynSolValue::Address(address)) => Ok(*address),
            _ => Err(self.missing(field, "address")),
        }
    }

    pub fn uint(&self, field: &FieldRef) -> Result<U256> {
        match self.field(field) {
            Some(DynSolValue::Uint(value, _)) => Ok(*value),
            _ => Err(self.missing(field, "uint")),
        }
    }

    pub fn amount(&self, field: &FieldRef) -> Result<Amount> {
        self.uint(field).map(Amount::from)
    }

    pub fn word(&self, field: &FieldRef) -> Result<B256> {
        match self.field(field) {
            Some(DynSolValue::FixedBytes(word, 32)) => Ok(*word),
            _ => Err(self.missing(field, "bytes32")),
        }
    }
}

/// Matches raw logs against the events of one interface description.
///
/// A receipt routinely contains logs from other contracts (token transfers
/// and the like). Anything that does not parse against the interface is a
/// non-match, never an error.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    interface: Arc<JsonAbi>,
    by_selector: HashMap<B256, Event>,
}

impl EventDecoder {
    pub fn new(interface: Arc<JsonAbi>) -> Self {
        let by_selector = interface
            .events()
            .filter(|event| !event.anonymous)
            .map(|event| (event.selector(), event.clone()))
            .collect();

        Self {
            interface,
            by_selector,
        }
    }

    pub fn interface(&self) -> &Arc<JsonAbi> {
        &self.interface
    }

    /// Parse a log against the interface, whatever event it is
    pub fn decode_any(&self, log: &Log) -> Option<DecodedLog> {
        let topic0 = log.topics().first()?;
        let event = self.by_selector.get(topic0)?;

        let decoded = match event.decode_log(&log.inner.data) {
            Ok(decoded) => decoded,
            Err(e) => {
                trace!(event = %event.name, error = %e, "Log does not parse against interface");
                return None;
            }
        };

        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let mut fields = Vec::with_capacity(event.inputs.len());
        for input in &event.inputs {
            let next = if input.indexed {
                indexed.next()
            } else {
                body.next()
            };
            let value = next?;
            fields.push(DecodedField {
                name: Some(input.name.clone()).filter(|name| !name.is_empty()),
                value,
            });
        }

        Some(DecodedLog {
            name: event.name.clone(),
            emitter: log.address(),
            fields,
            position: log_position(log),
        })
    }

    /// Parse a log and keep it only if it is the expected event
    pub fn decode(&self, log: &Log, expected: &str) -> Option<DecodedLog> {
        self.decode_any(log).filter(|decoded| decoded.name == expected)
    }

    /// First log among `logs` decoding to the expected event
    pub fn find(&self, logs: &[Log], expected: &str) -> Option<DecodedLog> {
        logs.iter().find_map(|log| self.decode(log, expected))
    }

    /// Decode into a typed record. A log whose fields cannot be extracted
    /// by any strategy counts as a non-match.
    pub fn decode_typed<E: FromDecodedLog>(&self, log: &Log) -> Option<E> {
        let decoded = self.decode_any(log)?;
        if !E::EVENTS.contains(&decoded.name.as_str()) {
            return None;
        }
        match E::from_decoded(&decoded) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(event = %decoded.name, error = %e, "Event matched but fields are not extractable");
                None
            }
        }
    }
}
