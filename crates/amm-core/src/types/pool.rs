use crate::codec::Amount;
use alloy_primitives::{Address, B256};

/// Canonical pool identifier, computed by the AMM contract from
/// (tokenA, tokenB, fee). Never derived client-side.
pub type PoolId = B256;

/// Read-through snapshot of a pool as last reported by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub pool_id: PoolId,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: Amount,
    pub reserve1: Amount,
    /// Fee tier in basis points
    pub fee_bps: u32,
    /// Outstanding liquidity shares
    pub total_supply: Amount,
}

impl Pool {
    pub fn contains(&self, token: &Address) -> bool {
        self.token0 == *token || self.token1 == *token
    }

    /// The other side of the pair, if `token` belongs to this pool
    pub fn counterpart(&self, token: &Address) -> Option<Address> {
        if self.token0 == *token {
            Some(self.token1)
        } else if self.token1 == *token {
            Some(self.token0)
        } else {
            None
        }
    }
}
