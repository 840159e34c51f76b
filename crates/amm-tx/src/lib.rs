mod approval;
mod executor;
mod pipeline;

pub use approval::ensure_allowance;
pub use executor::{confirm, TransactionExecutor};
pub use pipeline::{Pipeline, PipelineFailure, PipelineProgress, PipelineStep};
