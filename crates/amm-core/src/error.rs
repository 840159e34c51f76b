use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Broad failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Capability,
    Transport,
    UserDeclined,
    OnChainRevert,
    /// The node refused to execute a call or accept a transaction; nothing
    /// was included on-chain.
    Rejected,
    Decode,
    Config,
    InvalidInput,
}

#[derive(Error, Debug)]
pub enum AmmError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Deployment file not found: {0}")]
    DeploymentFileNotFound(String),

    #[error("Failed to parse deployment file: {0}")]
    DeploymentParseError(String),

    #[error("Failed to parse interface description: {0}")]
    InterfaceParse(String),

    #[error("Method {method} mutates ledger state but the handle for {address} is read-only")]
    Capability { method: String, address: Address },

    #[error("Function selector {selector} is not part of the interface bound to {address}")]
    UnknownFunction { selector: String, address: Address },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transport timed out: {0}")]
    Timeout(String),

    #[error("Signer declined the request: {0}")]
    UserDeclined(String),

    #[error("Transaction {tx} reverted on-chain")]
    OnChainRevert { tx: B256 },

    #[error("Call reverted: {0}")]
    CallReverted(String),

    #[error("Transaction rejected before submission: {0}")]
    SubmissionRejected(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Amount does not fit in 256 bits: {0}")]
    AmountOverflow(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Fee tier {0} does not fit in 24 bits")]
    InvalidFee(u32),

    #[error("No pool with identity {0}")]
    PoolNotFound(B256),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AmmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AmmError::MissingEnvVar(_)
            | AmmError::DeploymentFileNotFound(_)
            | AmmError::DeploymentParseError(_)
            | AmmError::InterfaceParse(_)
            | AmmError::Io(_) => ErrorKind::Config,
            AmmError::Capability { .. } => ErrorKind::Capability,
            AmmError::Transport(_) | AmmError::Timeout(_) => ErrorKind::Transport,
            AmmError::UserDeclined(_) => ErrorKind::UserDeclined,
            AmmError::OnChainRevert { .. } => ErrorKind::OnChainRevert,
            AmmError::CallReverted(_) | AmmError::SubmissionRejected(_) => ErrorKind::Rejected,
            AmmError::Decode(_) | AmmError::UnknownFunction { .. } => ErrorKind::Decode,
            AmmError::AmountOverflow(_)
            | AmmError::InvalidAmount(_)
            | AmmError::InvalidFee(_)
            | AmmError::PoolNotFound(_) => ErrorKind::InvalidInput,
        }
    }

    /// Only transport-level failures are worth retrying without changing inputs.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Transaction hash carried by an on-chain revert.
    pub fn transaction(&self) -> Option<B256> {
        match self {
            AmmError::OnChainRevert { tx } => Some(*tx),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AmmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_retryable_transport_errors() {
        let err = AmmError::Timeout("receipt for 0x01".to_string());
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_revert_carries_transaction() {
        let tx = B256::repeat_byte(0x11);
        let err = AmmError::OnChainRevert { tx };
        assert_eq!(err.kind(), ErrorKind::OnChainRevert);
        assert!(!err.is_retryable());
        assert_eq!(err.transaction(), Some(tx));
    }

    #[test]
    fn test_rejected_submission_is_not_an_on_chain_revert() {
        let err = AmmError::SubmissionRejected("execution reverted: K".to_string());
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert!(!err.is_retryable());
        assert_eq!(err.transaction(), None);
        assert_eq!(
            AmmError::CallReverted("execution reverted".to_string()).kind(),
            ErrorKind::Rejected
        );
    }

    #[test]
    fn test_declined_is_not_retryable() {
        assert!(!AmmError::UserDeclined("4001".to_string()).is_retryable());
        assert!(!AmmError::Capability {
            method: "approve".to_string(),
            address: Address::ZERO,
        }
        .is_retryable());
    }
}
