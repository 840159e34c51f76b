use alloy_json_abi::{Function, JsonAbi, StateMutability};
use alloy_primitives::{hex, Address, Bytes, TxHash};
use alloy_sol_types::SolCall;
use amm_core::{AmmError, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::transport::{Receipt, ReadTransport, SigningTransport};

/// Decides which functions of a handle may be invoked
#[derive(Clone)]
pub enum ExecutionContext {
    ReadOnly(Arc<dyn ReadTransport>),
    Signing(Arc<dyn SigningTransport>),
}

impl ExecutionContext {
    pub fn is_signing(&self) -> bool {
        matches!(self, ExecutionContext::Signing(_))
    }

    pub fn signer_address(&self) -> Option<Address> {
        match self {
            ExecutionContext::ReadOnly(_) => None,
            ExecutionContext::Signing(signer) => Some(signer.address()),
        }
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        match self {
            ExecutionContext::ReadOnly(transport) => transport.call(to, input).await,
            ExecutionContext::Signing(signer) => signer.call(to, input).await,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::ReadOnly(_) => f.write_str("ReadOnly"),
            ExecutionContext::Signing(signer) => write!(f, "Signing({})", signer.address()),
        }
    }
}

/// Callable binding of (address, interface, context). Holds no state.
#[derive(Clone, Debug)]
pub struct ContractHandle {
    address: Address,
    interface: Arc<JsonAbi>,
    context: ExecutionContext,
}

fn is_mutating(function: &Function) -> bool {
    matches!(
        function.state_mutability,
        StateMutability::NonPayable | StateMutability::Payable
    )
}

impl ContractHandle {
    pub fn new(address: Address, interface: Arc<JsonAbi>, context: ExecutionContext) -> Self {
        Self {
            address,
            interface,
            context,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn interface(&self) -> &Arc<JsonAbi> {
        &self.interface
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Same interface and context, different address (one ERC-20 interface
    /// serves every token).
    pub fn at(&self, address: Address) -> Self {
        Self {
            address,
            interface: Arc::clone(&self.interface),
            context: self.context.clone(),
        }
    }

    fn function<C: SolCall>(&self) -> Result<&Function> {
        self.interface
            .functions()
            .find(|f| f.selector().0 == C::SELECTOR)
            .ok_or_else(|| AmmError::UnknownFunction {
                selector: format!("{} (0x{})", C::SIGNATURE, hex::encode(C::SELECTOR)),
                address: self.address,
            })
    }

    fn capability_error(&self, method: &str) -> AmmError {
        AmmError::Capability {
            method: method.to_string(),
            address: self.address,
        }
    }

    /// `eth_call` a function and decode its return values.
    ///
    /// Mutating functions may be simulated this way only through a signing handle.
    pub async fn query<C>(&self, call: &C) -> Result<C::Return>
    where
        C: SolCall + Sync,
    {
        let function = self.function::<C>()?;
        if is_mutating(function) && !self.context.is_signing() {
            return Err(self.capability_error(&function.name));
        }

        debug!(contract = ?self.address, method = %function.name, "Query");

        let output = self
            .context
            .call(self.address, Bytes::from(call.abi_encode()))
            .await?;

        C::abi_decode_returns(&output).map_err(|e| {
            AmmError::Decode(format!("{} returned undecodable data: {}", function.name, e))
        })
    }

    /// Submit a transaction invoking a function. Returns as soon as the
    /// transaction hash is known.
    pub async fn submit<C>(&self, call: &C) -> Result<TxHash>
    where
        C: SolCall + Sync,
    {
        let ExecutionContext::Signing(signer) = &self.context else {
            return Err(self.capability_error(C::SIGNATURE));
        };
        let function = self.function::<C>()?;

        let tx = signer
            .send_transaction(self.address, Bytes::from(call.abi_encode()))
            .await?;

        debug!(contract = ?self.address, method = %function.name, tx = ?tx, "Submitted");
        Ok(tx)
    }

    /// Wait for a transaction submitted through this handle's signer
    pub async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt> {
        match &self.context {
            ExecutionContext::Signing(signer) => signer.wait_for_receipt(tx).await,
            ExecutionContext::ReadOnly(_) => Err(self.capability_error("wait_for_receipt")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLedger;
    use alloy_primitives::U256;
    use amm_core::contracts::{IAmm, IERC20};
    use amm_core::interface::{amm_interface, erc20_interface};

    fn fixtures() -> (Arc<MockLedger>, Address) {
        let ledger = Arc::new(MockLedger::new());
        let token = Address::repeat_byte(0x0a);
        ledger.mint(token, ledger.signer(), U256::from(1_000u64));
        (ledger, token)
    }

    #[tokio::test]
    async fn test_read_only_handle_rejects_mutation_without_touching_transport() {
        let (ledger, token) = fixtures();
        let handle = ContractHandle::new(
            token,
            Arc::new(erc20_interface().unwrap()),
            ExecutionContext::ReadOnly(ledger.clone()),
        );

        let approve = IERC20::approveCall {
            spender: Address::repeat_byte(0x0b),
            amount: U256::from(5u64),
        };
        let err = handle.submit(&approve).await.unwrap_err();
        assert!(matches!(err, AmmError::Capability { .. }));

        let err = handle.query(&approve).await.unwrap_err();
        assert!(matches!(err, AmmError::Capability { .. }));

        assert_eq!(ledger.sent_transactions().len(), 0);
        assert_eq!(ledger.call_count(), 0);
    }

    #[tokio::test]
    async fn test_read_only_handle_queries() {
        let (ledger, token) = fixtures();
        let handle = ContractHandle::new(
            token,
            Arc::new(erc20_interface().unwrap()),
            ExecutionContext::ReadOnly(ledger.clone()),
        );

        let balance = handle
            .query(&IERC20::balanceOfCall {
                account: ledger.signer(),
            })
            .await
            .unwrap();
        assert_eq!(balance, U256::from(1_000u64));
    }

    #[tokio::test]
    async fn test_function_outside_interface_is_rejected() {
        let (ledger, token) = fixtures();
        let amm = ContractHandle::new(
            ledger.amm(),
            Arc::new(amm_interface().unwrap()),
            ExecutionContext::Signing(ledger.clone()),
        );
        let err = amm
            .query(&IERC20::balanceOfCall {
                account: ledger.signer(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AmmError::UnknownFunction { .. }));

        let erc20 = ContractHandle::new(
            token,
            Arc::new(erc20_interface().unwrap()),
            ExecutionContext::Signing(ledger.clone()),
        );
        let err = erc20
            .submit(&IAmm::swapCall {
                poolId: Default::default(),
                tokenIn: token,
                amountIn: U256::from(1u64),
                minAmountOut: U256::ZERO,
                recipient: ledger.signer(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AmmError::UnknownFunction { .. }));
        assert_eq!(ledger.sent_transactions().len(), 0);
    }
}
