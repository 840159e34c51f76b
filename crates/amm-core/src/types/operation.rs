use crate::codec::Amount;
use crate::types::PoolId;
use alloy_primitives::B256;

/// The receipt confirmed but carried no log matching the expected event.
/// The action most likely succeeded; its outputs are unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeAnomaly {
    pub expected_event: String,
    pub transaction: B256,
    pub logs_in_receipt: usize,
}

/// Result of one successful mutating pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult<T> {
    pub outcome: T,
    pub transaction: B256,
    /// `Some` when `outcome` holds zero defaults instead of decoded values
    pub anomaly: Option<DecodeAnomaly>,
}

impl<T> OperationResult<T> {
    pub fn confirmed(outcome: T, transaction: B256) -> Self {
        Self {
            outcome,
            transaction,
            anomaly: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.anomaly.is_none()
    }
}

impl<T: Default> OperationResult<T> {
    pub fn anomalous(transaction: B256, anomaly: DecodeAnomaly) -> Self {
        Self {
            outcome: T::default(),
            transaction,
            anomaly: Some(anomaly),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatePoolOutcome {
    pub pool_id: PoolId,
    pub liquidity: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddLiquidityOutcome {
    pub liquidity: Amount,
    pub amount0: Amount,
    pub amount1: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveLiquidityOutcome {
    pub amount0: Amount,
    pub amount1: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapOutcome {
    pub amount_out: Amount,
}
