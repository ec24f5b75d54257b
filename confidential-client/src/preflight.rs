//! Transaction preflight
//!
//! Builds every operation the account could currently perform without
//! submitting anything. Used to check a deployment (RPC, contract, key,
//! proof construction) end to end before moving funds.

use serde::Serialize;
use tracing::{info, instrument};

use crate::client::ConfidentialClient;
use crate::error::{ClassifiedError, ClientError, ValidationError};
use crate::keys::RecipientKey;
use crate::operation::{
    ConfidentialAccount, OperationKind, OperationRequest, TransactionSubmitter,
};
use crate::state::AccountState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreflightOutcome {
    Built { has_approval: bool, call_count: usize },
    Skipped { reason: String },
    Failed { error: ClassifiedError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreflightCheck {
    pub operation: OperationKind,
    #[serde(flatten)]
    pub outcome: PreflightOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    pub network: &'static str,
    pub state: AccountState,
    /// Test amount in token base units
    pub amount: u128,
    /// Test amount in confidential units
    pub amount_units: u128,
    pub checks: Vec<PreflightCheck>,
}

impl PreflightReport {
    pub fn outcome(&self, operation: OperationKind) -> Option<&PreflightOutcome> {
        self.checks
            .iter()
            .find(|c| c.operation == operation)
            .map(|c| &c.outcome)
    }

    pub fn all_passed(&self) -> bool {
        !self
            .checks
            .iter()
            .any(|c| matches!(c.outcome, PreflightOutcome::Failed { .. }))
    }
}

fn skipped(reason: &str) -> PreflightOutcome {
    PreflightOutcome::Skipped {
        reason: reason.to_string(),
    }
}

impl<A, S> ConfidentialClient<A, S>
where
    A: ConfidentialAccount,
    S: TransactionSubmitter,
{
    /// Refresh state and build (never submit) each operation whose
    /// precondition holds for a test `amount` of token base units.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn preflight(
        &self,
        amount: u128,
        recipient: Option<&str>,
    ) -> Result<PreflightReport, ClientError> {
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        let recipient = recipient
            .map(RecipientKey::parse)
            .transpose()
            .map_err(|e| ValidationError::InvalidRecipient(e.to_string()))?;

        let _guard = self.op_lock.lock().await;
        let state = self.refresh_locked().await?;
        let units = self.to_units(amount, state.rate)?;
        let sender = self.submitter.address().to_string();
        let balance = state.current_balance();

        let mut checks = Vec::with_capacity(OperationKind::ALL.len());
        for operation in OperationKind::ALL {
            let request = match operation {
                OperationKind::Fund => Ok(OperationRequest::fund(units, &sender)),
                OperationKind::Transfer => match &recipient {
                    None => Err(skipped("no recipient public key provided")),
                    Some(_) if balance < units => Err(skipped("insufficient balance for transfer")),
                    Some(key) => Ok(OperationRequest::transfer(key.clone(), units, &sender)),
                },
                OperationKind::Rollover if state.pending_balance() == 0 => {
                    Err(skipped("no pending balance to roll over"))
                }
                OperationKind::Rollover => Ok(OperationRequest::rollover(&sender)),
                OperationKind::Withdraw if balance < units => {
                    Err(skipped("insufficient balance for withdraw"))
                }
                OperationKind::Withdraw => Ok(OperationRequest::withdraw(units, &sender)),
                OperationKind::Ragequit if !self.ragequit_enabled => {
                    Err(skipped("ragequit not enabled"))
                }
                OperationKind::Ragequit if balance == 0 => Err(skipped("no balance to ragequit")),
                OperationKind::Ragequit => Ok(OperationRequest::ragequit(&sender)),
            };

            let outcome = match request {
                Err(outcome) => outcome,
                Ok(request) => match self.account.build(&request).await {
                    Ok(built) => PreflightOutcome::Built {
                        has_approval: built.has_approval(),
                        call_count: built.into_calls().len(),
                    },
                    Err(e) => PreflightOutcome::Failed { error: e.classify() },
                },
            };

            info!(operation = %operation, outcome = ?outcome, "Preflight check");
            checks.push(PreflightCheck { operation, outcome });
        }

        Ok(PreflightReport {
            network: self.network.as_str(),
            state,
            amount,
            amount_units: units,
            checks,
        })
    }
}
