use alloy::rpc::types::Log;
use amm_core::types::{
    LiquidityChange, LiquidityChangedEvent, LogPosition, PoolCreatedEvent, SwapEvent,
};
use amm_core::{AmmError, Result};

use crate::decoder::DecodedLog;
use crate::fields::FieldRef;

pub const POOL_CREATED: &str = "PoolCreated";
pub const LIQUIDITY_ADDED: &str = "LiquidityAdded";
pub const LIQUIDITY_REMOVED: &str = "LiquidityRemoved";
pub const SWAP: &str = "Swap";

/// Typed record built from a decoded log
pub trait FromDecodedLog: Sized {
    /// Event names this record can be built from
    const EVENTS: &'static [&'static str];

    fn from_decoded(log: &DecodedLog) -> Result<Self>;
}

pub fn log_position(log: &Log) -> LogPosition {
    LogPosition {
        block_number: log.block_number.unwrap_or_default(),
        log_index: log.log_index.unwrap_or_default(),
        transaction_hash: log.transaction_hash.unwrap_or_default(),
    }
}

mod pool_created {
    use super::FieldRef;

    pub const POOL_ID: FieldRef = FieldRef::new("poolId", 0);
    pub const TOKEN0: FieldRef = FieldRef::new("token0", 1);
    pub const TOKEN1: FieldRef = FieldRef::new("token1", 2);
    pub const FEE: FieldRef = FieldRef::new("fee", 3);
    pub const CREATOR: FieldRef = FieldRef::new("creator", 4);
    pub const AMOUNT0: FieldRef = FieldRef::new("amount0", 5);
    pub const AMOUNT1: FieldRef = FieldRef::new("amount1", 6);
    pub const LIQUIDITY: FieldRef = FieldRef::new("liquidity", 7);
}

/// Shared by LiquidityAdded and LiquidityRemoved
mod liquidity {
    use super::FieldRef;

    pub const POOL_ID: FieldRef = FieldRef::new("poolId", 0);
    pub const PROVIDER: FieldRef = FieldRef::new("provider", 1);
    pub const AMOUNT0: FieldRef = FieldRef::new("amount0", 2);
    pub const AMOUNT1: FieldRef = FieldRef::new("amount1", 3);
    pub const LIQUIDITY: FieldRef = FieldRef::new("liquidity", 4);
}

mod swap {
    use super::FieldRef;

    pub const POOL_ID: FieldRef = FieldRef::new("poolId", 0);
    pub const SENDER: FieldRef = FieldRef::new("sender", 1);
    pub const TOKEN_IN: FieldRef = FieldRef::new("tokenIn", 2);
    pub const AMOUNT_IN: FieldRef = FieldRef::new("amountIn", 3);
    pub const AMOUNT_OUT: FieldRef = FieldRef::new("amountOut", 4);
    pub const RECIPIENT: FieldRef = FieldRef::new("recipient", 5);
}

impl FromDecodedLog for PoolCreatedEvent {
    const EVENTS: &'static [&'static str] = &[POOL_CREATED];

    fn from_decoded(log: &DecodedLog) -> Result<Self> {
        let fee = log.uint(&pool_created::FEE)?;
        Ok(Self {
            pool_id: log.word(&pool_created::POOL_ID)?,
            token0: log.address(&pool_created::TOKEN0)?,
            token1: log.address(&pool_created::TOKEN1)?,
            fee_bps: u32::try_from(fee)
                .map_err(|_| AmmError::Decode(format!("fee {} out of range", fee)))?,
            creator: log.address(&pool_created::CREATOR)?,
            amount0: log.amount(&pool_created::AMOUNT0)?,
            amount1: log.amount(&pool_created::AMOUNT1)?,
            liquidity: log.amount(&pool_created::LIQUIDITY)?,
            position: log.position,
        })
    }
}

impl FromDecodedLog for LiquidityChangedEvent {
    const EVENTS: &'static [&'static str] = &[LIQUIDITY_ADDED, LIQUIDITY_REMOVED];

    fn from_decoded(log: &DecodedLog) -> Result<Self> {
        let change = match log.name.as_str() {
            LIQUIDITY_ADDED => LiquidityChange::Added,
            LIQUIDITY_REMOVED => LiquidityChange::Removed,
            other => {
                return Err(AmmError::Decode(format!(
                    "{} is not a liquidity event",
                    other
                )))
            }
        };
        Ok(Self {
            pool_id: log.word(&liquidity::POOL_ID)?,
            provider: log.address(&liquidity::PROVIDER)?,
            change,
            amount0: log.amount(&liquidity::AMOUNT0)?,
            amount1: log.amount(&liquidity::AMOUNT1)?,
            liquidity: log.amount(&liquidity::LIQUIDITY)?,
            position: log.position,
        })
    }
}

impl FromDecodedLog for SwapEvent {
    const EVENTS: &'static [&'static str] = &[SWAP];

    fn from_decoded(log: &DecodedLog) -> Result<Self> {
        Ok(Self {
            pool_id: log.word(&swap::POOL_ID)?,
            sender: log.address(&swap::SENDER)?,
            token_in: log.address(&swap::TOKEN_IN)?,
            amount_in: log.amount(&swap::AMOUNT_IN)?,
            amount_out: log.amount(&swap::AMOUNT_OUT)?,
            recipient: log.address(&swap::RECIPIENT)?,
            position: log.position,
        })
    }
}
