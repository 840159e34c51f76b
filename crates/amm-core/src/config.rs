use crate::error::{AmmError, Result};
use alloy_primitives::Address;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Deployment configuration loaded from JSON file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DeploymentConfig {
    pub amm: Address,
    #[serde(rename = "startBlock", default)]
    pub start_block: u64,
    /// Deployment-specific interface description, overriding the bundled one
    #[serde(rename = "ammAbi", default)]
    pub amm_abi: Option<PathBuf>,
}

/// Signing key. Kept out of `Debug` output.
#[derive(Clone)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Runtime configuration from environment variables
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub private_key: Option<SecretKey>,
}

/// Complete client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    /// Absent means read-only: every mutating pipeline fails with a capability error
    pub private_key: Option<SecretKey>,
    pub amm: Address,
    pub start_block: u64,
    pub amm_abi: Option<PathBuf>,
    pub scan: ScanConfig,
    pub transport: TransportConfig,
}

/// Pool discovery settings
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Blocks per eth_getLogs request
    pub batch_size: u64,
}

impl ScanConfig {
    pub fn from_env() -> Self {
        let batch_size = env::var("SCAN_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|size: &u64| *size > 0)
            .unwrap_or(10_000);

        Self { batch_size }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Receipt polling. The timeout belongs to the transport, not the pipelines.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl TransportConfig {
    pub fn from_env() -> Self {
        let poll_ms = env::var("RECEIPT_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        let timeout_secs = env::var("RECEIPT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        Self {
            receipt_poll_interval: Duration::from_millis(poll_ms),
            receipt_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let chain_id = env::var("CHAIN_ID")
            .map_err(|_| AmmError::MissingEnvVar("CHAIN_ID".to_string()))?
            .parse::<u64>()
            .map_err(|_| AmmError::MissingEnvVar("CHAIN_ID (invalid format)".to_string()))?;

        let rpc_url = sanitize(
            &env::var("RPC_URL").map_err(|_| AmmError::MissingEnvVar("RPC_URL".to_string()))?,
        );

        let private_key = env::var("PRIVATE_KEY")
            .ok()
            .map(|key| sanitize(&key))
            .filter(|key| !key.is_empty())
            .map(SecretKey::new);

        info!(rpc_url = %rpc_url, signing = private_key.is_some(), "Environment loaded");

        Ok(Self {
            chain_id,
            rpc_url,
            private_key,
        })
    }
}

/// Remove surrounding quotes and whitespace
fn sanitize(value: &str) -> String {
    let trimmed = value.trim();
    let without_quotes = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    without_quotes.to_string()
}

impl DeploymentConfig {
    /// Load deployment configuration from JSON file
    pub fn load(chain_id: u64) -> Result<Self> {
        let path = Self::deployment_path(chain_id);
        let content = fs::read_to_string(&path)
            .map_err(|_| AmmError::DeploymentFileNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| AmmError::DeploymentParseError(e.to_string()))
    }

    fn deployment_path(chain_id: u64) -> PathBuf {
        PathBuf::from(format!("deployments/{}.json", chain_id))
    }
}

impl ClientConfig {
    /// Load complete configuration from environment and deployment file
    pub fn load() -> Result<Self> {
        let env_config = EnvConfig::load()?;
        let deployment = DeploymentConfig::load(env_config.chain_id)?;

        Ok(Self::from_parts(env_config, deployment))
    }

    pub fn from_parts(env_config: EnvConfig, deployment: DeploymentConfig) -> Self {
        Self {
            chain_id: env_config.chain_id,
            rpc_url: env_config.rpc_url,
            private_key: env_config.private_key,
            amm: deployment.amm,
            start_block: deployment.start_block,
            amm_abi: deployment.amm_abi,
            scan: ScanConfig::default(),
            transport: TransportConfig::default(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.private_key.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_quotes() {
        assert_eq!(sanitize("  \"http://localhost:8545\" "), "http://localhost:8545");
        assert_eq!(sanitize("'http://a'"), "http://a");
        assert_eq!(sanitize("\""), "\"");
        assert_eq!(sanitize("http://b"), "http://b");
    }

    #[test]
    fn test_deployment_parse() {
        let json = r#"{
            "AMM": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "startBlock": 1200,
            "ammAbi": "abi/custom.json"
        }"#;
        let deployment = DeploymentConfig::parse(json).unwrap();
        assert_eq!(deployment.start_block, 1200);
        assert_eq!(deployment.amm_abi, Some(PathBuf::from("abi/custom.json")));
        assert_eq!(
            deployment.amm,
            "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_deployment_defaults() {
        let deployment =
            DeploymentConfig::parse(r#"{"AMM": "0x5FbDB2315678afecb367f032d93F642f64180aa3"}"#)
                .unwrap();
        assert_eq!(deployment.start_block, 0);
        assert!(deployment.amm_abi.is_none());
    }

    #[test]
    fn test_deployment_parse_error() {
        assert!(matches!(
            DeploymentConfig::parse(r#"{"startBlock": 1}"#),
            Err(AmmError::DeploymentParseError(_))
        ));
    }

    #[test]
    fn test_secret_key_is_redacted() {
        let key = SecretKey::new("0xdeadbeef");
        assert!(!format!("{:?}", key).contains("deadbeef"));
        assert_eq!(key.expose(), "0xdeadbeef");
    }
}
