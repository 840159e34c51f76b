//! `Idle -> Approving(1..k) -> Submitted -> Confirmed -> Extracted -> Done`
//!
//! Nothing is rolled back. Confirmed approvals stay on-chain and a retried
//! run re-checks them instead of approving again.

use alloy_primitives::{Address, TxHash};
use alloy_sol_types::SolCall;
use amm_core::types::{AllowanceState, DecodeAnomaly, OperationResult};
use amm_core::{AmmError, Amount, ErrorKind};
use amm_decoder::FromDecodedLog;
use amm_rpc::{ContractHandle, Receipt};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::approval::ensure_allowance;
use crate::executor::{confirm, TransactionExecutor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Idle,
    /// Allowance for the `index`-th token (1-based)
    Approving { index: usize, token: Address },
    Submitted,
    Confirmed,
    Extracted,
    Done,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStep::Idle => f.write_str("idle"),
            PipelineStep::Approving { index, token } => write!(f, "approving({}, {})", index, token),
            PipelineStep::Submitted => f.write_str("submitted"),
            PipelineStep::Confirmed => f.write_str("confirmed"),
            PipelineStep::Extracted => f.write_str("extracted"),
            PipelineStep::Done => f.write_str("done"),
        }
    }
}

/// What a run achieved before it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineProgress {
    pub last_completed: PipelineStep,
    /// Allowances confirmed so far, in approval order
    pub approvals: Vec<AllowanceState>,
    /// Primary transaction, once submitted
    pub transaction: Option<TxHash>,
}

/// The absorbing failed state: which step failed, what had already
/// completed, and the underlying error with its kind intact.
#[derive(Error, Debug)]
#[error("{operation} failed at {step} (last completed: {}): {error}", .progress.last_completed)]
pub struct PipelineFailure {
    pub operation: &'static str,
    pub step: PipelineStep,
    pub progress: PipelineProgress,
    #[source]
    pub error: AmmError,
}

impl PipelineFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn last_completed(&self) -> PipelineStep {
        self.progress.last_completed
    }

    /// Reverted transaction, or the submitted primary transaction if the run
    /// stopped while waiting for it
    pub fn transaction(&self) -> Option<TxHash> {
        self.error.transaction().or(self.progress.transaction)
    }

    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }
}

/// One run of a mutating operation
pub struct Pipeline<'a> {
    operation: &'static str,
    executor: &'a TransactionExecutor,
    step: PipelineStep,
    progress: PipelineProgress,
}

impl<'a> Pipeline<'a> {
    pub fn new(operation: &'static str, executor: &'a TransactionExecutor) -> Self {
        info!(operation = operation, "Pipeline started");
        Self {
            operation,
            executor,
            step: PipelineStep::Idle,
            progress: PipelineProgress {
                last_completed: PipelineStep::Idle,
                approvals: Vec::new(),
                transaction: None,
            },
        }
    }

    pub fn step(&self) -> PipelineStep {
        self.step
    }

    pub fn progress(&self) -> &PipelineProgress {
        &self.progress
    }

    fn enter(&mut self, step: PipelineStep) {
        self.step = step;
        info!(
            operation = self.operation,
            step = %step,
            tx = ?self.progress.transaction,
            "Pipeline step"
        );
    }

    fn complete(&mut self) {
        self.progress.last_completed = self.step;
    }

    /// Move into the failed state with the current step and progress
    pub fn fail(&self, error: AmmError) -> PipelineFailure {
        warn!(
            operation = self.operation,
            step = %self.step,
            last_completed = %self.progress.last_completed,
            kind = ?error.kind(),
            error = %error,
            "Pipeline failed"
        );
        PipelineFailure {
            operation: self.operation,
            step: self.step,
            progress: self.progress.clone(),
            error,
        }
    }

    /// Approval step for the next token the operation draws down
    pub async fn approve(
        &mut self,
        token: &ContractHandle,
        spender: Address,
        required: &Amount,
    ) -> Result<(), PipelineFailure> {
        let index = self.progress.approvals.len() + 1;
        self.enter(PipelineStep::Approving {
            index,
            token: token.address(),
        });

        let state = ensure_allowance(token, spender, required)
            .await
            .map_err(|e| self.fail(e))?;
        self.progress.approvals.push(state);
        self.complete();
        Ok(())
    }

    /// Submit the primary call and wait for it to be confirmed
    pub async fn submit<C>(
        &mut self,
        handle: &ContractHandle,
        call: &C,
    ) -> Result<Receipt, PipelineFailure>
    where
        C: SolCall + Sync,
    {
        self.enter(PipelineStep::Submitted);
        let tx = handle.submit(call).await.map_err(|e| self.fail(e))?;
        self.progress.transaction = Some(tx);
        self.complete();

        self.enter(PipelineStep::Confirmed);
        let receipt = confirm(handle, tx).await.map_err(|e| self.fail(e))?;
        self.complete();
        Ok(receipt)
    }

    /// Pull the operation's defining event out of the receipt
    pub fn extract<E: FromDecodedLog>(
        &mut self,
        receipt: &Receipt,
        emitter: Address,
        event: &str,
    ) -> Option<E> {
        let extracted = self.executor.extract_typed(receipt, emitter, event);
        self.enter(PipelineStep::Extracted);
        self.complete();
        extracted
    }

    /// Assemble the result. A missing event yields zeroed fields plus an
    /// anomaly marker, never a plain success.
    pub fn finish<T: Default>(
        mut self,
        receipt: &Receipt,
        event: &str,
        outcome: Option<T>,
    ) -> OperationResult<T> {
        self.enter(PipelineStep::Done);
        self.complete();

        let tx = receipt.transaction_hash;
        match outcome {
            Some(outcome) => OperationResult::confirmed(outcome, tx),
            None => {
                warn!(
                    operation = self.operation,
                    tx = ?tx,
                    expected = event,
                    logs = receipt.logs.len(),
                    "Confirmed transaction carries no matching event"
                );
                OperationResult::anomalous(
                    tx,
                    DecodeAnomaly {
                        expected_event: event.to_string(),
                        transaction: tx,
                        logs_in_receipt: receipt.logs.len(),
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use amm_core::contracts::IAmm;
    use amm_core::interface::{amm_interface, erc20_interface};
    use amm_core::types::{CreatePoolOutcome, PoolCreatedEvent};
    use amm_decoder::{EventDecoder, POOL_CREATED};
    use amm_rpc::mock::MockLedger;
    use amm_rpc::ExecutionContext;
    use std::sync::Arc;

    struct Fixture {
        ledger: Arc<MockLedger>,
        amm: ContractHandle,
        erc20: ContractHandle,
        executor: TransactionExecutor,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(MockLedger::new());
        let interface = Arc::new(amm_interface().unwrap());
        let context = ExecutionContext::Signing(ledger.clone());
        Fixture {
            amm: ContractHandle::new(ledger.amm(), interface.clone(), context.clone()),
            erc20: ContractHandle::new(
                Address::ZERO,
                Arc::new(erc20_interface().unwrap()),
                context,
            ),
            executor: TransactionExecutor::new(EventDecoder::new(interface)),
            ledger,
        }
    }

    async fn create_pool(
        f: &Fixture,
        a: Address,
        b: Address,
    ) -> Result<OperationResult<CreatePoolOutcome>, PipelineFailure> {
        let amount = Amount::from(100u64);
        let mut pipeline = Pipeline::new("create_pool", &f.executor);
        pipeline.approve(&f.erc20.at(a), f.amm.address(), &amount).await?;
        pipeline.approve(&f.erc20.at(b), f.amm.address(), &amount).await?;

        let call = IAmm::createPoolCall {
            tokenA: a,
            tokenB: b,
            amountA: U256::from(100u64),
            amountB: U256::from(100u64),
        };
        let receipt = pipeline.submit(&f.amm, &call).await?;
        let outcome = pipeline
            .extract::<PoolCreatedEvent>(&receipt, f.amm.address(), POOL_CREATED)
            .map(|event| CreatePoolOutcome {
                pool_id: event.pool_id,
                liquidity: event.liquidity,
            });
        Ok(pipeline.finish(&receipt, POOL_CREATED, outcome))
    }

    #[tokio::test]
    async fn test_full_run_reaches_done() {
        let f = fixture();
        let (a, b) = (Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        f.ledger.mint(a, f.ledger.signer(), U256::from(100u64));
        f.ledger.mint(b, f.ledger.signer(), U256::from(100u64));

        let result = create_pool(&f, a, b).await.unwrap();
        assert!(result.is_complete());
        assert_eq!(result.outcome.liquidity, Amount::from(100u64));
        assert_eq!(f.ledger.sent_transactions().len(), 3);
    }

    #[tokio::test]
    async fn test_failure_records_last_completed_step() {
        let f = fixture();
        let (a, b) = (Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        f.ledger.decline_signatures_for(b);

        let failure = create_pool(&f, a, b).await.unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::UserDeclined);
        assert_eq!(failure.step, PipelineStep::Approving { index: 2, token: b });
        assert_eq!(
            failure.last_completed(),
            PipelineStep::Approving { index: 1, token: a }
        );
        assert_eq!(failure.progress.approvals.len(), 1);
        assert_eq!(failure.transaction(), None);
    }

    #[tokio::test]
    async fn test_missing_event_yields_anomaly() {
        let f = fixture();
        let (a, b) = (Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        f.ledger.mint(a, f.ledger.signer(), U256::from(100u64));
        f.ledger.mint(b, f.ledger.signer(), U256::from(100u64));
        f.ledger.suppress_event(<IAmm::PoolCreated as alloy_sol_types::SolEvent>::SIGNATURE_HASH);

        let result = create_pool(&f, a, b).await.unwrap();
        assert!(!result.is_complete());
        assert_eq!(result.outcome, CreatePoolOutcome::default());
        let anomaly = result.anomaly.unwrap();
        assert_eq!(anomaly.expected_event, POOL_CREATED);
        assert_eq!(anomaly.transaction, result.transaction);
        assert_eq!(anomaly.logs_in_receipt, 2);
    }

    #[tokio::test]
    async fn test_receipt_timeout_keeps_transaction() {
        let f = fixture();
        let (a, b) = (Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        f.ledger.set_allowance(a, f.ledger.signer(), f.ledger.amm(), U256::from(100u64));
        f.ledger.set_allowance(b, f.ledger.signer(), f.ledger.amm(), U256::from(100u64));
        f.ledger.time_out_receipts(true);

        let failure = create_pool(&f, a, b).await.unwrap_err();
        assert!(failure.is_retryable());
        assert_eq!(failure.step, PipelineStep::Confirmed);
        assert_eq!(failure.last_completed(), PipelineStep::Submitted);
        assert_eq!(failure.transaction(), Some(f.ledger.sent_transactions()[0].hash));
    }
}
