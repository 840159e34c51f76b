use alloy_primitives::aliases::U24;
use alloy_primitives::Address;
use amm_core::contracts::{IAmm, IERC20};
use amm_core::types::{Pool, PoolCreatedEvent, PoolId};
use amm_core::{AmmError, Amount, Result};
use amm_sync::PoolSet;
use futures::Stream;
use tracing::debug;

use crate::client::AmmClient;

const MAX_FEE: u32 = (1 << 24) - 1;

impl AmmClient {
    /// Snapshot of a pool, or `None` if the ledger has no pool with this
    /// identity. Transport failures are still errors.
    pub async fn get_pool(&self, pool_id: PoolId) -> Result<Option<Pool>> {
        let pool = match self.amm.query(&IAmm::getPoolCall { poolId: pool_id }).await {
            Ok(pool) => pool,
            Err(AmmError::CallReverted(reason)) => {
                debug!(pool_id = ?pool_id, reason = %reason, "Pool lookup reverted");
                return Ok(None);
            }
            Err(AmmError::Decode(reason)) => {
                debug!(pool_id = ?pool_id, reason = %reason, "Pool lookup returned no pool data");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if pool.token0 == Address::ZERO {
            debug!(pool_id = ?pool_id, "No such pool");
            return Ok(None);
        }

        Ok(Some(Pool {
            pool_id,
            token0: pool.token0,
            token1: pool.token1,
            reserve0: Amount::from(pool.reserve0),
            reserve1: Amount::from(pool.reserve1),
            fee_bps: pool.fee.to::<u32>(),
            total_supply: Amount::from(pool.totalSupply),
        }))
    }

    /// Liquidity shares held by `account`; zero when it holds none or the
    /// pool does not exist.
    pub async fn get_user_liquidity(&self, pool_id: PoolId, account: Address) -> Result<Amount> {
        let call = IAmm::getUserLiquidityCall {
            poolId: pool_id,
            user: account,
        };
        match self.amm.query(&call).await {
            Ok(shares) => Ok(Amount::from(shares)),
            Err(AmmError::CallReverted(reason)) => {
                debug!(pool_id = ?pool_id, account = ?account, reason = %reason, "Liquidity lookup reverted");
                Ok(Amount::zero())
            }
            Err(e) => Err(e),
        }
    }

    /// Identity the ledger assigns to (tokenA, tokenB, fee). Argument order
    /// is canonicalized by the contract, not here.
    pub async fn get_pool_identity(
        &self,
        token_a: Address,
        token_b: Address,
        fee_bps: u32,
    ) -> Result<PoolId> {
        if fee_bps > MAX_FEE {
            return Err(AmmError::InvalidFee(fee_bps));
        }

        let call = IAmm::getPoolIdCall {
            tokenA: token_a,
            tokenB: token_b,
            fee: U24::from(fee_bps),
        };
        self.amm.query(&call).await
    }

    /// Every pool created from `from_block` (the deployment's start block
    /// when `None`) up to the current head, in ledger order.
    pub async fn get_all_pools(&self, from_block: Option<u64>) -> Result<Vec<PoolCreatedEvent>> {
        let from = from_block.unwrap_or(self.start_block);
        let pools = self.scanner.collect(from, None).await?;
        debug!(from_block = from, pools = pools.len(), "Pool discovery finished");
        Ok(pools)
    }

    /// Lazy form of [`get_all_pools`](Self::get_all_pools) over an explicit range
    pub fn scan_pools(
        &self,
        from_block: u64,
        to_block: Option<u64>,
    ) -> impl Stream<Item = Result<PoolCreatedEvent>> + '_ {
        self.scanner.scan(from_block, to_block)
    }

    /// Known pools folded from the creation log
    pub async fn pool_set(&self, from_block: Option<u64>) -> Result<PoolSet> {
        self.get_all_pools(from_block).await.map(PoolSet::from_events)
    }

    pub async fn balance_of(&self, token: Address, account: Address) -> Result<Amount> {
        let balance = self
            .token(token)
            .query(&IERC20::balanceOfCall { account })
            .await?;
        Ok(Amount::from(balance))
    }

    pub async fn allowance(&self, token: Address, owner: Address) -> Result<Amount> {
        let remaining = self
            .token(token)
            .query(&IERC20::allowanceCall {
                owner,
                spender: self.amm.address(),
            })
            .await?;
        Ok(Amount::from(remaining))
    }
}
