use crate::codec::Amount;
use crate::types::PoolId;
use alloy_primitives::{Address, B256};

/// Where a log sits in the ledger's total order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition {
    pub block_number: u64,
    pub log_index: u64,
    pub transaction_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolCreatedEvent {
    pub pool_id: PoolId,
    pub token0: Address,
    pub token1: Address,
    pub fee_bps: u32,
    pub creator: Address,
    pub amount0: Amount,
    pub amount1: Amount,
    pub liquidity: Amount,
    pub position: LogPosition,
}

impl PoolCreatedEvent {
    /// Unordered token pair key, for "latest pool for a pair" lookups
    pub fn pair(&self) -> (Address, Address) {
        if self.token0 <= self.token1 {
            (self.token0, self.token1)
        } else {
            (self.token1, self.token0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidityChange {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityChangedEvent {
    pub pool_id: PoolId,
    pub provider: Address,
    pub change: LiquidityChange,
    pub amount0: Amount,
    pub amount1: Amount,
    /// Shares minted (added) or burned (removed)
    pub liquidity: Amount,
    pub position: LogPosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEvent {
    pub pool_id: PoolId,
    pub sender: Address,
    pub token_in: Address,
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub recipient: Address,
    pub position: LogPosition,
}
