//! Error handling types for the signet multisig vault client.
//!
//! Local validation failures, remote call failures and poller staleness are
//! all reported through [`Error`] so callers can tell "nothing happened"
//! apart from "a proposal exists but did not execute".

use thiserror::Error;

/// Core error type for signet operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Amount text is not a non-negative integer in base units
    #[error("invalid amount:: {0}")]
    InvalidAmount(String),

    /// Recipient is not well-formed for the token's network
    #[error("invalid recipient:: {0}")]
    InvalidRecipient(String),

    /// Sender account is missing or malformed
    #[error("invalid sender:: {0}")]
    InvalidSender(String),

    /// Token identifier could not be split into network, standard and address
    #[error("malformed token id:: {0}")]
    MalformedTokenId(String),

    /// Threshold change would break `1 <= threshold <= signers`
    #[error("invalid threshold {threshold} for {signers} signers")]
    InvalidThreshold { threshold: u32, signers: usize },

    /// Signer identity is not well-formed
    #[error("invalid signer:: {0}")]
    InvalidSigner(String),

    /// Signer is already part of the vault
    #[error("duplicate signer:: {0}")]
    DuplicateSigner(String),

    /// Token is already tracked by the vault
    #[error("duplicate token:: {0}")]
    DuplicateToken(String),

    /// The remote service did not accept the proposal; nothing was recorded
    #[error("proposal failed:: {0}")]
    ProposalFailed(String),

    /// Proposal was recorded but the threshold could not be read afterwards
    #[error("proposal {proposal_id} recorded but threshold lookup failed:: {reason}")]
    ThresholdUnavailable { proposal_id: u64, reason: String },

    /// Proposal exists but execution failed or was rejected
    #[error("execution of proposal {proposal_id} failed:: {reason}")]
    ExecutionFailed { proposal_id: u64, reason: String },

    /// Poller data was superseded by a newer vault before it could be used
    #[error("stale vault state for {vault} (generation {generation})")]
    StaleVaultState { vault: String, generation: u64 },

    /// Any other remote service failure
    #[error("remote error:: {0}")]
    Remote(String),
}

impl Error {
    /// Numeric code for this error, see [`codes`]
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidAmount(_) => codes::INVALID_AMOUNT,
            Error::InvalidRecipient(_) => codes::INVALID_RECIPIENT,
            Error::InvalidSender(_) => codes::INVALID_SENDER,
            Error::MalformedTokenId(_) => codes::MALFORMED_TOKEN_ID,
            Error::InvalidThreshold { .. } => codes::INVALID_THRESHOLD,
            Error::InvalidSigner(_) => codes::INVALID_SIGNER,
            Error::DuplicateSigner(_) => codes::DUPLICATE_SIGNER,
            Error::DuplicateToken(_) => codes::DUPLICATE_TOKEN,
            Error::ProposalFailed(_) => codes::PROPOSAL_FAILED,
            Error::ThresholdUnavailable { .. } => codes::THRESHOLD_UNAVAILABLE,
            Error::ExecutionFailed { .. } => codes::EXECUTION_FAILED,
            Error::StaleVaultState { .. } => codes::STALE_VAULT_STATE,
            Error::Remote(_) => codes::REMOTE,
        }
    }

    /// Whether the error was detected locally, before any remote call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidAmount(_)
                | Error::InvalidRecipient(_)
                | Error::InvalidSender(_)
                | Error::MalformedTokenId(_)
                | Error::InvalidThreshold { .. }
                | Error::InvalidSigner(_)
                | Error::DuplicateSigner(_)
                | Error::DuplicateToken(_)
        )
    }

    /// Id of the proposal left behind on the remote service, if any
    pub fn recorded_proposal(&self) -> Option<u64> {
        match self {
            Error::ThresholdUnavailable { proposal_id, .. }
            | Error::ExecutionFailed { proposal_id, .. } => Some(*proposal_id),
            _ => None,
        }
    }
}

/// Result type alias for signet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error codes
pub mod codes {
    /// Invalid amount
    pub const INVALID_AMOUNT: u32 = 3;
    /// Invalid recipient
    pub const INVALID_RECIPIENT: u32 = 4;
    /// Invalid sender
    pub const INVALID_SENDER: u32 = 5;
    /// Malformed token id
    pub const MALFORMED_TOKEN_ID: u32 = 6;
    /// Invalid threshold
    pub const INVALID_THRESHOLD: u32 = 7;
    /// Invalid signer
    pub const INVALID_SIGNER: u32 = 8;
    /// Duplicate signer
    pub const DUPLICATE_SIGNER: u32 = 9;
    /// Duplicate token
    pub const DUPLICATE_TOKEN: u32 = 10;
    /// Proposal failed
    pub const PROPOSAL_FAILED: u32 = 20;
    /// Threshold unavailable after proposing
    pub const THRESHOLD_UNAVAILABLE: u32 = 21;
    /// Execution failed
    pub const EXECUTION_FAILED: u32 = 22;
    /// Stale vault state
    pub const STALE_VAULT_STATE: u32 = 30;
    /// Remote error
    pub const REMOTE: u32 = 40;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidAmount("-5".to_string());
        assert_eq!(err.to_string(), "invalid amount:: -5");

        let err = Error::ExecutionFailed {
            proposal_id: 7,
            reason: "ledger rejected".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "execution of proposal 7 failed:: ledger rejected"
        );
    }

    #[test]
    fn test_validation_errors_are_local() {
        assert!(Error::MalformedTokenId("icp".into()).is_validation());
        assert!(Error::InvalidThreshold {
            threshold: 0,
            signers: 2
        }
        .is_validation());
        assert!(Error::DuplicateToken("icp:native".into()).is_validation());
        assert!(!Error::ProposalFailed("down".into()).is_validation());
        assert!(!Error::Remote("down".into()).is_validation());
    }

    #[test]
    fn test_recorded_proposal() {
        assert_eq!(Error::ProposalFailed("x".into()).recorded_proposal(), None);
        let err = Error::ThresholdUnavailable {
            proposal_id: 3,
            reason: "timeout".into(),
        };
        assert_eq!(err.recorded_proposal(), Some(3));
        assert_ne!(
            Error::ProposalFailed("x".into()).code(),
            Error::ExecutionFailed {
                proposal_id: 1,
                reason: "x".into()
            }
            .code()
        );
    }
}
