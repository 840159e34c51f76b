mod client;
mod operations;
mod queries;

pub use client::AmmClient;
pub use amm_tx::{PipelineFailure, PipelineProgress, PipelineStep};

/// Outcome of a mutating operation: a confirmed result or the step it failed at
pub type OperationOutcome<T> =
    std::result::Result<amm_core::types::OperationResult<T>, PipelineFailure>;
