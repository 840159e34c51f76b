pub mod codec;
pub mod config;
pub mod contracts;
pub mod error;
pub mod interface;
pub mod types;

pub use codec::Amount;
pub use config::{ClientConfig, DeploymentConfig, EnvConfig, ScanConfig, SecretKey, TransportConfig};
pub use error::{AmmError, ErrorKind, Result};
