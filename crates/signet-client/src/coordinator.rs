//! Proposing transactions and deciding when to try executing them
//!
//! The vault service enforces the threshold. The coordinator only decides
//! whether an execution attempt is worth making right after a proposal: with
//! a threshold of one the proposer's own approval is enough, anything higher
//! has to wait for other signers.

use crate::service::{CallOptions, VaultService};
use signet_errors::{Error, Result};
use signet_types::{Proposal, TransactionIntent, TransactionStatus, Vault};
use tracing::{info, instrument, warn};

/// How a successful submission ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Recorded and waiting for more approvals; execution was not attempted
    PendingApproval { proposal: Proposal, threshold: u32 },
    /// Recorded and sent to the ledger, which answered with `status`
    Executed {
        proposal: Proposal,
        status: TransactionStatus,
    },
}

impl SubmitOutcome {
    pub fn proposal(&self) -> &Proposal {
        match self {
            SubmitOutcome::PendingApproval { proposal, .. }
            | SubmitOutcome::Executed { proposal, .. } => proposal,
        }
    }
}

/// Whether `proposal` has gathered enough approvals for `vault`.
///
/// Advisory: the service makes the final call when execution is requested.
pub fn can_execute(proposal: &Proposal, vault: &Vault) -> bool {
    proposal.approvals() >= vault.threshold() as usize
}

#[derive(Debug, Clone, Default)]
pub struct Coordinator {
    call: CallOptions,
}

impl Coordinator {
    pub fn new(call: CallOptions) -> Self {
        Self { call }
    }

    /// Propose `intent` and, when the vault needs a single approval, execute it.
    ///
    /// After a proposal is recorded every error carries its id; the proposal
    /// is never rolled back.
    #[instrument(skip(self, service, intent), fields(amount = intent.amount, token = %intent.token))]
    pub async fn submit(
        &self,
        service: &dyn VaultService,
        intent: &TransactionIntent,
    ) -> Result<SubmitOutcome> {
        let proposal = self
            .call
            .run(service.propose_transaction(intent))
            .await
            .map_err(|e| Error::ProposalFailed(e.to_string()))?;
        info!(proposal_id = proposal.id, "proposal recorded");

        let threshold = self
            .call
            .run(service.get_threshold())
            .await
            .map_err(|e| Error::ThresholdUnavailable {
                proposal_id: proposal.id,
                reason: e.to_string(),
            })?;

        if threshold > 1 {
            info!(
                proposal_id = proposal.id,
                threshold,
                approvals = proposal.approvals(),
                "waiting for more approvals"
            );
            return Ok(SubmitOutcome::PendingApproval {
                proposal,
                threshold,
            });
        }

        let status = self.execute(service, proposal.id).await?;
        Ok(SubmitOutcome::Executed { proposal, status })
    }

    /// Ask the service to execute an already recorded proposal
    #[instrument(skip(self, service))]
    pub async fn execute(
        &self,
        service: &dyn VaultService,
        proposal_id: u64,
    ) -> Result<TransactionStatus> {
        let status = match self.call.run(service.execute_transaction(proposal_id)).await {
            Ok(status) => status,
            Err(err) => {
                warn!(proposal_id, error = %err, "execution request failed");
                return Err(Error::ExecutionFailed {
                    proposal_id,
                    reason: err.to_string(),
                });
            }
        };

        match status {
            TransactionStatus::Completed(_)
            | TransactionStatus::Pending(_)
            | TransactionStatus::InProgress(_) => {
                info!(proposal_id, status = %status, "executed");
                Ok(status)
            }
            TransactionStatus::Failed(_) | TransactionStatus::Rejected(_) => {
                warn!(proposal_id, status = %status, "ledger did not accept transaction");
                Err(Error::ExecutionFailed {
                    proposal_id,
                    reason: status.to_string(),
                })
            }
        }
    }
}
