use amm_core::AmmError;
use std::fmt::Display;

/// Classify an error returned by a provider or signer
pub fn classify_rpc_error(err: impl Display) -> AmmError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();

    if is_user_rejection(&lower) {
        AmmError::UserDeclined(msg)
    } else if is_revert(&lower) {
        AmmError::CallReverted(msg)
    } else if is_timeout(&lower) {
        AmmError::Timeout(msg)
    } else {
        AmmError::Transport(msg)
    }
}

/// Classify an error from submitting a transaction. The provider estimates
/// gas first, so a revert here means the transaction never reached the ledger.
pub fn classify_send_error(err: impl Display) -> AmmError {
    match classify_rpc_error(err) {
        AmmError::CallReverted(reason) => AmmError::SubmissionRejected(reason),
        other => other,
    }
}

/// EIP-1193 code 4001 and the usual wallet phrasings
fn is_user_rejection(msg: &str) -> bool {
    msg.contains("user rejected")
        || msg.contains("user denied")
        || msg.contains("rejected by user")
        || msg.contains("request rejected")
        || msg.contains("code 4001")
        || msg.contains("code: 4001")
        || msg.contains("\"code\":4001")
}

fn is_revert(msg: &str) -> bool {
    msg.contains("execution reverted") || msg.contains("revert")
}

fn is_timeout(msg: &str) -> bool {
    msg.contains("timeout") || msg.contains("timed out") || msg.contains("deadline has elapsed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rejection() {
        let err = classify_rpc_error(
            "server returned an error response: error code 4001: User rejected the request.",
        );
        assert!(matches!(err, AmmError::UserDeclined(_)));
        assert!(matches!(
            classify_rpc_error("MetaMask Tx Signature: User denied transaction signature."),
            AmmError::UserDeclined(_)
        ));
    }

    #[test]
    fn test_revert() {
        let err = classify_rpc_error(
            "server returned an error response: error code 3: execution reverted: POOL_NOT_FOUND",
        );
        assert!(matches!(err, AmmError::CallReverted(_)));
    }

    #[test]
    fn test_revert_while_sending_is_a_rejected_submission() {
        let err = classify_send_error(
            "server returned an error response: error code 3: execution reverted: INSUFFICIENT_OUTPUT_AMOUNT",
        );
        assert!(matches!(err, AmmError::SubmissionRejected(_)));
        assert_eq!(err.transaction(), None);
        assert!(matches!(
            classify_send_error("error code 4001: User rejected the request."),
            AmmError::UserDeclined(_)
        ));
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = classify_rpc_error("error sending request: operation timed out");
        assert!(matches!(err, AmmError::Timeout(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_everything_else_is_transport() {
        let err = classify_rpc_error("connection refused");
        assert!(matches!(err, AmmError::Transport(_)));
        assert!(err.is_retryable());
    }
}
