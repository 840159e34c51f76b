use crate::codec::Amount;
use alloy_primitives::{Address, B256};

/// Allowance observed (or established) right before a mutating call.
/// Never cached: allowances change out-of-band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowanceState {
    pub owner: Address,
    pub spender: Address,
    pub token: Address,
    pub authorized_amount: Amount,
    /// Set when an approval transaction had to be submitted
    pub approval_tx: Option<B256>,
}

impl AllowanceState {
    pub fn covers(&self, required: &Amount) -> bool {
        self.authorized_amount >= *required
    }
}
