use alloy_primitives::{Address, TxHash};
use alloy_sol_types::SolCall;
use amm_core::{AmmError, Result};
use amm_decoder::{DecodedLog, EventDecoder, FromDecodedLog};
use amm_rpc::{ContractHandle, Receipt};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Wait for a submitted transaction and turn an on-chain revert into an error.
///
/// A receipt is only ever returned for a successful transaction.
pub async fn confirm(handle: &ContractHandle, tx: TxHash) -> Result<Receipt> {
    let wait_start = Instant::now();
    let receipt = handle.wait_for_receipt(tx).await?;

    if !receipt.success {
        warn!(tx = ?tx, block = ?receipt.block_number, "Transaction reverted");
        return Err(AmmError::OnChainRevert { tx });
    }

    debug!(
        tx = ?tx,
        block = ?receipt.block_number,
        logs = receipt.logs.len(),
        wait_ms = wait_start.elapsed().as_millis(),
        "Transaction confirmed"
    );
    Ok(receipt)
}

/// Submits calls, awaits inclusion and pulls the caller's event out of the
/// receipt.
#[derive(Debug, Clone)]
pub struct TransactionExecutor {
    decoder: EventDecoder,
}

impl TransactionExecutor {
    pub fn new(decoder: EventDecoder) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &EventDecoder {
        &self.decoder
    }

    /// Submit and wait. Fails with `OnChainRevert` carrying the transaction
    /// hash if the ledger reports the transaction as reverted.
    pub async fn execute<C>(&self, handle: &ContractHandle, call: &C) -> Result<Receipt>
    where
        C: SolCall + Sync,
    {
        let tx = handle.submit(call).await?;
        info!(contract = ?handle.address(), method = C::SIGNATURE, tx = ?tx, "Awaiting inclusion");
        confirm(handle, tx).await
    }

    /// First log emitted by `emitter` that decodes to `event`. Logs from
    /// other contracts and other events are skipped.
    pub fn extract(&self, receipt: &Receipt, emitter: Address, event: &str) -> Option<DecodedLog> {
        receipt
            .logs
            .iter()
            .filter(|log| log.address() == emitter)
            .find_map(|log| self.decoder.decode(log, event))
    }

    /// Typed form of [`extract`](Self::extract). A matching log whose fields
    /// cannot be extracted is skipped like any other non-match.
    pub fn extract_typed<E: FromDecodedLog>(
        &self,
        receipt: &Receipt,
        emitter: Address,
        event: &str,
    ) -> Option<E> {
        receipt
            .logs
            .iter()
            .filter(|log| log.address() == emitter)
            .filter_map(|log| self.decoder.decode(log, event))
            .find_map(|decoded| match E::from_decoded(&decoded) {
                Ok(typed) => Some(typed),
                Err(e) => {
                    warn!(
                        event = event,
                        tx = ?receipt.transaction_hash,
                        log_index = decoded.position.log_index,
                        error = %e,
                        "Event found but its fields are not extractable"
                    );
                    None
                }
            })
    }
}
