use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use amm_core::interface::{amm_interface, erc20_interface, load_interface};
use amm_core::{ClientConfig, Result, ScanConfig};
use amm_decoder::EventDecoder;
use amm_rpc::{
    ContractHandle, ExecutionContext, ProviderManager, ReadTransport, SigningTransport,
};
use amm_sync::PoolScanner;
use amm_tx::TransactionExecutor;
use std::sync::Arc;
use tracing::info;

/// Client for one AMM deployment.
///
/// Holds handles and codecs only. Every query is a fresh read and every
/// operation run is independent. Mutating operations on one signer must not
/// overlap; the client does not queue them.
pub struct AmmClient {
    pub(crate) amm: ContractHandle,
    /// ERC-20 interface bound to the zero address; rebound per token
    pub(crate) erc20: ContractHandle,
    pub(crate) scanner: PoolScanner,
    pub(crate) executor: TransactionExecutor,
    pub(crate) start_block: u64,
}

impl AmmClient {
    /// Without a signer every mutating operation fails with a capability error.
    pub fn new(
        reader: Arc<dyn ReadTransport>,
        signer: Option<Arc<dyn SigningTransport>>,
        amm: Address,
        amm_interface: JsonAbi,
        start_block: u64,
        scan: ScanConfig,
    ) -> Result<Self> {
        let context = match signer {
            Some(signer) => ExecutionContext::Signing(signer),
            None => ExecutionContext::ReadOnly(Arc::clone(&reader)),
        };
        let amm_interface = Arc::new(amm_interface);
        let decoder = EventDecoder::new(Arc::clone(&amm_interface));

        Ok(Self {
            amm: ContractHandle::new(amm, amm_interface, context.clone()),
            erc20: ContractHandle::new(Address::ZERO, Arc::new(erc20_interface()?), context),
            scanner: PoolScanner::new(reader, decoder.clone(), amm, scan)?,
            executor: TransactionExecutor::new(decoder),
            start_block,
        })
    }

    /// Connect over JSON-RPC. Uses the deployment's own interface description
    /// when one is configured, the bundled one otherwise.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let providers = ProviderManager::new(config)?;
        let interface = match &config.amm_abi {
            Some(path) => load_interface(path)?,
            None => amm_interface()?,
        };

        let reader: Arc<dyn ReadTransport> = providers.reader();
        let signer = providers
            .signer()
            .map(|signer| signer as Arc<dyn SigningTransport>);

        info!(
            chain_id = config.chain_id,
            amm = ?config.amm,
            read_only = signer.is_none(),
            "AMM client ready"
        );

        Self::new(
            reader,
            signer,
            config.amm,
            interface,
            config.start_block,
            config.scan.clone(),
        )
    }

    pub fn amm_address(&self) -> Address {
        self.amm.address()
    }

    /// Signing identity, `None` for a read-only client
    pub fn signer_address(&self) -> Option<Address> {
        self.amm.context().signer_address()
    }

    pub fn is_read_only(&self) -> bool {
        !self.amm.context().is_signing()
    }

    pub fn start_block(&self) -> u64 {
        self.start_block
    }

    pub(crate) fn token(&self, token: Address) -> ContractHandle {
        self.erc20.at(token)
    }
}
