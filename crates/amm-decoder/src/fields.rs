use alloy::dyn_abi::DynSolValue;

use crate::decoder::DecodedLog;

/// A named event parameter together with its declaration index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub name: &'static str,
    pub index: usize,
}

impl FieldRef {
    pub const fn new(name: &'static str, index: usize) -> Self {
        Self { name, index }
    }
}

pub type ExtractionStrategy = for<'a> fn(&'a DecodedLog, &FieldRef) -> Option<&'a DynSolValue>;

/// Named lookup first, positional fallback second. Some deployments ship
/// interface descriptions with parameter names stripped.
pub const STRATEGIES: [ExtractionStrategy; 2] = [by_name, by_position];

pub fn by_name<'a>(log: &'a DecodedLog, field: &FieldRef) -> Option<&'a DynSolValue> {
    log.fields
        .iter()
        .find(|f| f.name.as_deref() == Some(field.name))
        .map(|f| &f.value)
}

pub fn by_position<'a>(log: &'a DecodedLog, field: &FieldRef) -> Option<&'a DynSolValue> {
    log.fields.get(field.index).map(|f| &f.value)
}
