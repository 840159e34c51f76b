mod classify;
mod handle;
mod provider;
mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use classify::{classify_rpc_error, classify_send_error};
pub use handle::{ContractHandle, ExecutionContext};
pub use provider::{AlloyReader, AlloySigner, BoxedProvider, ProviderManager};
pub use transport::{LogQuery, Receipt, ReadTransport, SigningTransport};
