mod decoder;
mod fields;
mod typed;

pub use decoder::{DecodedField, DecodedLog, EventDecoder};
pub use fields::{by_name, by_position, ExtractionStrategy, FieldRef, STRATEGIES};
pub use typed::{
    log_position, FromDecodedLog, LIQUIDITY_ADDED, LIQUIDITY_REMOVED, POOL_CREATED, SWAP,
};
