mod allowance;
mod events;
mod operation;
mod pool;

pub use allowance::AllowanceState;
pub use events::{LiquidityChange, LiquidityChangedEvent, LogPosition, PoolCreatedEvent, SwapEvent};
pub use operation::{
    AddLiquidityOutcome, CreatePoolOutcome, DecodeAnomaly, OperationResult,
    RemoveLiquidityOutcome, SwapOutcome,
};
pub use pool::{Pool, PoolId};
