use alloy_primitives::Address;
use amm_core::codec::to_wire;
use amm_core::contracts::IERC20;
use amm_core::types::AllowanceState;
use amm_core::{AmmError, Amount, Result};
use amm_rpc::ContractHandle;
use tracing::{debug, info, warn};

use crate::executor::confirm;

/// Make sure `spender` may draw at least `required` of the token behind
/// `token` on behalf of the handle's signer.
///
/// The allowance is read fresh on every call. When it already covers
/// `required` nothing is submitted. Otherwise exactly `required` is
/// approved (never an unbounded amount) and the approval is awaited before
/// returning.
pub async fn ensure_allowance(
    token: &ContractHandle,
    spender: Address,
    required: &Amount,
) -> Result<AllowanceState> {
    let owner = token
        .context()
        .signer_address()
        .ok_or_else(|| AmmError::Capability {
            method: "approve".to_string(),
            address: token.address(),
        })?;

    let current = token.query(&IERC20::allowanceCall { owner, spender }).await?;
    let mut state = AllowanceState {
        owner,
        spender,
        token: token.address(),
        authorized_amount: Amount::from(current),
        approval_tx: None,
    };

    if state.covers(required) {
        debug!(
            token = ?state.token,
            spender = ?spender,
            allowance = %state.authorized_amount,
            required = %required,
            "Allowance sufficient"
        );
        return Ok(state);
    }

    let amount = to_wire(required)?;
    info!(
        token = ?state.token,
        spender = ?spender,
        allowance = %state.authorized_amount,
        required = %required,
        "Approving"
    );

    let tx = token
        .submit(&IERC20::approveCall { spender, amount })
        .await
        .inspect_err(|e| warn!(token = ?state.token, error = %e, "Approval not submitted"))?;
    confirm(token, tx).await?;

    info!(token = ?state.token, tx = ?tx, "Approval confirmed");
    state.authorized_amount = required.clone();
    state.approval_tx = Some(tx);
    Ok(state)
}
