use alloy::rpc::types::Log;
use alloy_primitives::{Address, Bytes, TxHash, B256};
use amm_core::Result;
use async_trait::async_trait;

/// Single-contract, single-event log range query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub event_signature: B256,
    pub from_block: u64,
    pub to_block: u64,
}

/// Confirmation record for an included transaction
#[derive(Debug, Clone)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    /// `false` when the transaction was included but reverted
    pub success: bool,
    pub logs: Vec<Log>,
}

/// Query capability: calls without state change and historical logs.
#[async_trait]
pub trait ReadTransport: Send + Sync {
    /// `eth_call` against `to` with ABI-encoded `input`
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes>;

    /// Logs in ledger order (block, then log index)
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>>;

    async fn block_number(&self) -> Result<u64>;
}

/// Query + mutate capability bound to one signing identity.
///
/// Transactions from one identity carry increasing nonces; callers must not
/// overlap submissions on the same signer.
#[async_trait]
pub trait SigningTransport: ReadTransport {
    fn address(&self) -> Address;

    /// Submit and return the transaction hash as soon as the ledger accepts it
    async fn send_transaction(&self, to: Address, input: Bytes) -> Result<TxHash>;

    /// Suspend until the transaction is included. Reverted transactions are
    /// returned with `success == false`.
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt>;
}
