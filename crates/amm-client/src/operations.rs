use alloy_primitives::Address;
use amm_core::codec::to_wire;
use amm_core::contracts::IAmm;
use amm_core::types::{
    AddLiquidityOutcome, CreatePoolOutcome, LiquidityChangedEvent, PoolCreatedEvent, PoolId,
    RemoveLiquidityOutcome, SwapEvent, SwapOutcome,
};
use amm_core::{AmmError, Amount};
use amm_decoder::{LIQUIDITY_ADDED, LIQUIDITY_REMOVED, POOL_CREATED, SWAP};
use amm_tx::Pipeline;

use crate::client::AmmClient;
use crate::OperationOutcome;

impl AmmClient {
    /// Approve `token_a` then `token_b`, create the pool, report its
    /// identity and the shares minted.
    pub async fn create_pool(
        &self,
        token_a: Address,
        token_b: Address,
        amount_a: &Amount,
        amount_b: &Amount,
    ) -> OperationOutcome<CreatePoolOutcome> {
        let mut pipeline = Pipeline::new("create_pool", &self.executor);
        let call = IAmm::createPoolCall {
            tokenA: token_a,
            tokenB: token_b,
            amountA: to_wire(amount_a).map_err(|e| pipeline.fail(e))?,
            amountB: to_wire(amount_b).map_err(|e| pipeline.fail(e))?,
        };

        let spender = self.amm.address();
        pipeline.approve(&self.token(token_a), spender, amount_a).await?;
        pipeline.approve(&self.token(token_b), spender, amount_b).await?;

        let receipt = pipeline.submit(&self.amm, &call).await?;
        let outcome = pipeline
            .extract::<PoolCreatedEvent>(&receipt, spender, POOL_CREATED)
            .map(|event| CreatePoolOutcome {
                pool_id: event.pool_id,
                liquidity: event.liquidity,
            });
        Ok(pipeline.finish(&receipt, POOL_CREATED, outcome))
    }

    /// Read the pool for its token order, approve token0 then token1, add.
    pub async fn add_liquidity(
        &self,
        pool_id: PoolId,
        amount0_desired: &Amount,
        amount1_desired: &Amount,
    ) -> OperationOutcome<AddLiquidityOutcome> {
        let mut pipeline = Pipeline::new("add_liquidity", &self.executor);
        let call = IAmm::addLiquidityCall {
            poolId: pool_id,
            amount0Desired: to_wire(amount0_desired).map_err(|e| pipeline.fail(e))?,
            amount1Desired: to_wire(amount1_desired).map_err(|e| pipeline.fail(e))?,
        };
        let pool = self
            .get_pool(pool_id)
            .await
            .map_err(|e| pipeline.fail(e))?
            .ok_or_else(|| pipeline.fail(AmmError::PoolNotFound(pool_id)))?;

        let spender = self.amm.address();
        pipeline
            .approve(&self.token(pool.token0), spender, amount0_desired)
            .await?;
        pipeline
            .approve(&self.token(pool.token1), spender, amount1_desired)
            .await?;

        let receipt = pipeline.submit(&self.amm, &call).await?;
        let outcome = pipeline
            .extract::<LiquidityChangedEvent>(&receipt, spender, LIQUIDITY_ADDED)
            .map(|event| AddLiquidityOutcome {
                liquidity: event.liquidity,
                amount0: event.amount0,
                amount1: event.amount1,
            });
        Ok(pipeline.finish(&receipt, LIQUIDITY_ADDED, outcome))
    }

    /// Burn shares. Shares are not an ERC-20 here, so nothing is approved.
    pub async fn remove_liquidity(
        &self,
        pool_id: PoolId,
        liquidity: &Amount,
    ) -> OperationOutcome<RemoveLiquidityOutcome> {
        let mut pipeline = Pipeline::new("remove_liquidity", &self.executor);
        let call = IAmm::removeLiquidityCall {
            poolId: pool_id,
            liquidity: to_wire(liquidity).map_err(|e| pipeline.fail(e))?,
        };

        let receipt = pipeline.submit(&self.amm, &call).await?;
        let outcome = pipeline
            .extract::<LiquidityChangedEvent>(&receipt, self.amm.address(), LIQUIDITY_REMOVED)
            .map(|event| RemoveLiquidityOutcome {
                amount0: event.amount0,
                amount1: event.amount1,
            });
        Ok(pipeline.finish(&receipt, LIQUIDITY_REMOVED, outcome))
    }

    /// Approve `token_in`, swap, report the amount received by `recipient`.
    pub async fn swap(
        &self,
        pool_id: PoolId,
        token_in: Address,
        amount_in: &Amount,
        min_amount_out: &Amount,
        recipient: Address,
    ) -> OperationOutcome<SwapOutcome> {
        let mut pipeline = Pipeline::new("swap", &self.executor);
        let call = IAmm::swapCall {
            poolId: pool_id,
            tokenIn: token_in,
            amountIn: to_wire(amount_in).map_err(|e| pipeline.fail(e))?,
            minAmountOut: to_wire(min_amount_out).map_err(|e| pipeline.fail(e))?,
            recipient,
        };

        let spender = self.amm.address();
        pipeline.approve(&self.token(token_in), spender, amount_in).await?;

        let receipt = pipeline.submit(&self.amm, &call).await?;
        let outcome = pipeline
            .extract::<SwapEvent>(&receipt, spender, SWAP)
            .map(|event| SwapOutcome {
                amount_out: event.amount_out,
            });
        Ok(pipeline.finish(&receipt, SWAP, outcome))
    }
}
