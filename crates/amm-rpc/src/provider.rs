use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, Bytes, TxHash};
use amm_core::{AmmError, ClientConfig, Result, SecretKey, TransportConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::classify::{classify_rpc_error, classify_send_error};
use crate::transport::{LogQuery, Receipt, ReadTransport, SigningTransport};

/// Boxed provider trait for HTTP connections
pub type BoxedProvider = Arc<dyn Provider<Ethereum> + Send + Sync>;

/// Read-only JSON-RPC transport
pub struct AlloyReader {
    http: BoxedProvider,
}

/// JSON-RPC transport with a local signing key
pub struct AlloySigner {
    http: BoxedProvider,
    address: Address,
    config: TransportConfig,
}

/// Builds the transports a client needs from its configuration
pub struct ProviderManager {
    reader: Arc<AlloyReader>,
    signer: Option<Arc<AlloySigner>>,
}

fn parse_url(http_url: &str) -> Result<reqwest::Url> {
    http_url
        .parse()
        .map_err(|e| AmmError::Transport(format!("Invalid HTTP URL: {}", e)))
}

impl ProviderManager {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let reader = Arc::new(AlloyReader::connect(&config.rpc_url)?);
        let signer = match &config.private_key {
            Some(key) => Some(Arc::new(AlloySigner::connect(
                &config.rpc_url,
                key,
                config.transport.clone(),
            )?)),
            None => None,
        };

        info!(
            rpc_url = %config.rpc_url,
            signer = ?signer.as_ref().map(|s| s.address),
            "Providers ready"
        );

        Ok(Self { reader, signer })
    }

    pub fn reader(&self) -> Arc<AlloyReader> {
        Arc::clone(&self.reader)
    }

    pub fn signer(&self) -> Option<Arc<AlloySigner>> {
        self.signer.clone()
    }
}

impl AlloyReader {
    pub fn connect(http_url: &str) -> Result<Self> {
        let http = ProviderBuilder::new().connect_http(parse_url(http_url)?);
        Ok(Self {
            http: Arc::new(http),
        })
    }

    pub fn http(&self) -> &BoxedProvider {
        &self.http
    }
}

impl AlloySigner {
    pub fn connect(http_url: &str, key: &SecretKey, config: TransportConfig) -> Result<Self> {
        let signer: PrivateKeySigner = key
            .expose()
            .parse()
            .map_err(|e| AmmError::MissingEnvVar(format!("PRIVATE_KEY (invalid key: {})", e)))?;
        let address = signer.address();
        let http = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(parse_url(http_url)?);

        Ok(Self {
            http: Arc::new(http),
            address,
            config,
        })
    }

    pub fn http(&self) -> &BoxedProvider {
        &self.http
    }
}

async fn call_with(
    http: &BoxedProvider,
    from: Option<Address>,
    to: Address,
    input: Bytes,
) -> Result<Bytes> {
    let mut tx = TransactionRequest::default().with_to(to).with_input(input);
    if let Some(from) = from {
        tx = tx.with_from(from);
    }
    http.call(tx).await.map_err(classify_rpc_error)
}

async fn logs_with(http: &BoxedProvider, query: &LogQuery) -> Result<Vec<Log>> {
    let filter = Filter::new()
        .address(query.address)
        .event_signature(query.event_signature)
        .from_block(query.from_block)
        .to_block(query.to_block);

    let logs = http
        .get_logs(&filter)
        .await
        .map_err(|e| classify_rpc_error(format!("{:?}", e)))?;

    if !logs.is_empty() {
        debug!(
            address = ?query.address,
            from = query.from_block,
            to = query.to_block,
            count = logs.len(),
            "Fetched event logs"
        );
    }

    Ok(logs)
}

#[async_trait]
impl ReadTransport for AlloyReader {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        call_with(&self.http, None, to, input).await
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        logs_with(&self.http, query).await
    }

    async fn block_number(&self) -> Result<u64> {
        self.http.get_block_number().await.map_err(classify_rpc_error)
    }
}

#[async_trait]
impl ReadTransport for AlloySigner {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        call_with(&self.http, Some(self.address), to, input).await
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        logs_with(&self.http, query).await
    }

    async fn block_number(&self) -> Result<u64> {
        self.http.get_block_number().await.map_err(classify_rpc_error)
    }
}

#[async_trait]
impl SigningTransport for AlloySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, to: Address, input: Bytes) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(to)
            .with_input(input);

        let pending = self
            .http
            .send_transaction(tx)
            .await
            .map_err(classify_send_error)?;

        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt> {
        let started = Instant::now();
        loop {
            let receipt = self
                .http
                .get_transaction_receipt(tx)
                .await
                .map_err(classify_rpc_error)?;

            if let Some(receipt) = receipt {
                debug!(
                    tx = ?tx,
                    block = ?receipt.block_number(),
                    status = receipt.status(),
                    wait_ms = started.elapsed().as_millis(),
                    "Receipt available"
                );
                return Ok(Receipt {
                    transaction_hash: receipt.transaction_hash(),
                    block_number: receipt.block_number(),
                    success: receipt.status(),
                    logs: receipt.inner.logs().to_vec(),
                });
            }

            if started.elapsed() >= self.config.receipt_timeout {
                return Err(AmmError::Timeout(format!(
                    "no receipt for {} after {}s",
                    tx,
                    self.config.receipt_timeout.as_secs()
                )));
            }

            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }
}
