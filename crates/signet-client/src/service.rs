//! The remote vault service boundary

use async_trait::async_trait;
use signet_types::{
    ExecutedTransaction, Network, Proposal, SignerId, TokenId, TransactionIntent,
    TransactionStatus,
};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Transport-level failures talking to the vault service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// HTTP request error
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("json parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The service answered with an error
    #[error("rpc error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The call did not finish within its deadline
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the call
    #[error("call cancelled")]
    Cancelled,
}

/// Result type for service calls
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

impl From<ServiceError> for signet_errors::Error {
    fn from(err: ServiceError) -> Self {
        signet_errors::Error::Remote(err.to_string())
    }
}

/// Operations exposed by a vault service for one (vault, caller) pair.
///
/// Every answer is authoritative over anything cached on the client.
#[async_trait]
pub trait VaultService: Send + Sync {
    async fn get_threshold(&self) -> ServiceResult<u32>;

    async fn get_signers(&self) -> ServiceResult<Vec<SignerId>>;

    async fn set_threshold(&self, threshold: u32) -> ServiceResult<()>;

    async fn add_signer(&self, signer: &SignerId) -> ServiceResult<()>;

    /// Record a new proposal; approvals in the answer are whatever the
    /// service decided, including whether the proposer counts as one
    async fn propose_transaction(&self, intent: &TransactionIntent) -> ServiceResult<Proposal>;

    async fn execute_transaction(&self, proposal_id: u64) -> ServiceResult<TransactionStatus>;

    /// Executed transactions, oldest first
    async fn get_transactions(&self) -> ServiceResult<Vec<ExecutedTransaction>>;

    async fn get_proposed_transactions(&self) -> ServiceResult<Vec<Proposal>>;

    /// Native balance of the vault on `network`, in base units
    async fn get_balance(&self, network: Network) -> ServiceResult<u64>;

    /// Vault subaccount holding `token`
    async fn get_subaccount(&self, token: &TokenId) -> ServiceResult<String>;

    /// Balance of `token` held in `subaccount`, in base units
    async fn get_token_balance(&self, token: &TokenId, subaccount: &str) -> ServiceResult<u64>;

    /// Token identifiers the vault tracks besides its native token
    async fn get_tokens(&self) -> ServiceResult<Vec<TokenId>>;

    /// Start tracking `token`, opening its subaccount
    async fn add_token(&self, token: &TokenId) -> ServiceResult<()>;

    async fn token_symbol(&self, token_address: &str) -> ServiceResult<String>;

    async fn token_decimals(&self, token_address: &str) -> ServiceResult<u8>;
}

/// Deadline and cancellation applied to each remote call
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl CallOptions {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Options cancelled together with `self` but also cancellable on their own
    pub fn child(&self) -> Self {
        Self {
            timeout: self.timeout,
            cancel: self.cancel.child_token(),
        }
    }

    /// Drive `call` to completion unless it times out or is cancelled first
    pub async fn run<T, F>(&self, call: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        let bounded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(ServiceError::Timeout(limit)),
                },
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ServiceError::Cancelled),
            result = bounded => result,
        }
    }
}
