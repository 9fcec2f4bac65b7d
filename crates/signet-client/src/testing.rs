//! In-memory vault service used by unit tests

use crate::service::{ServiceError, ServiceResult, VaultService};
use async_trait::async_trait;
use signet_types::{
    ExecutedTransaction, Network, Proposal, SignerId, TokenId, TransactionIntent,
    TransactionStatus,
};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) const ACCOUNT_ID: &str =
    "d4685b31b51450508aff0331584df7692a84467b680326f5c5f7d30ae711682f";

pub(crate) fn signer(text: &str) -> SignerId {
    SignerId::parse(text).unwrap()
}

pub(crate) fn native_intent(amount: u64) -> TransactionIntent {
    TransactionIntent {
        amount,
        token: TokenId::native(),
        recipient: ACCOUNT_ID.to_string(),
        transaction_type: signet_types::TransactionType::Transfer,
        sender: "vault-subaccount".to_string(),
        network: Network::Icp,
    }
}

/// What `execute_transaction` answers with
#[derive(Debug, Clone)]
pub(crate) enum ExecuteBehavior {
    Status(TransactionStatus),
    Error(String),
}

#[derive(Debug)]
struct State {
    threshold: u32,
    signers: Vec<SignerId>,
    proposals: Vec<Proposal>,
    executed: Vec<ExecutedTransaction>,
    next_id: u64,
    balance: u64,
    calls: Vec<&'static str>,
    fail_propose: bool,
    fail_threshold: bool,
    execute: ExecuteBehavior,
    approve_own_proposals: Option<SignerId>,
    tokens: Vec<TokenId>,
}

/// Vault service double recording every call it receives
#[derive(Debug)]
pub(crate) struct MockVault {
    state: Mutex<State>,
    delay: Option<Duration>,
}

impl MockVault {
    pub(crate) fn new(threshold: u32, signers: &[&str]) -> Self {
        Self {
            state: Mutex::new(State {
                threshold,
                signers: signers.iter().map(|s| signer(s)).collect(),
                proposals: Vec::new(),
                executed: Vec::new(),
                next_id: 1,
                balance: 0,
                calls: Vec::new(),
                fail_propose: false,
                fail_threshold: false,
                execute: ExecuteBehavior::Status(TransactionStatus::Completed(
                    "Successfully transferred native ICP.".to_string(),
                )),
                approve_own_proposals: None,
                tokens: Vec::new(),
            }),
            delay: None,
        }
    }

    /// Every call sleeps this long before answering
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn with_balance(self, balance: u64) -> Self {
        self.state.lock().unwrap().balance = balance;
        self
    }

    /// Tokens reported by `get_tokens`, in this order
    pub(crate) fn tracking(self, tokens: &[&str]) -> Self {
        self.state.lock().unwrap().tokens = tokens.iter().map(|t| TokenId::from(*t)).collect();
        self
    }

    pub(crate) fn tokens(&self) -> Vec<TokenId> {
        self.state.lock().unwrap().tokens.clone()
    }

    pub(crate) fn failing_propose(self) -> Self {
        self.state.lock().unwrap().fail_propose = true;
        self
    }

    pub(crate) fn failing_threshold(self) -> Self {
        self.state.lock().unwrap().fail_threshold = true;
        self
    }

    pub(crate) fn executing_with(self, behavior: ExecuteBehavior) -> Self {
        self.state.lock().unwrap().execute = behavior;
        self
    }

    /// Proposals come back already approved by `proposer`
    pub(crate) fn counting_proposer_approval(self, proposer: &str) -> Self {
        self.state.lock().unwrap().approve_own_proposals = Some(signer(proposer));
        self
    }

    pub(crate) fn set_threshold_now(&self, threshold: u32) {
        self.state.lock().unwrap().threshold = threshold;
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| **c == method).count()
    }

    pub(crate) fn threshold(&self) -> u32 {
        self.state.lock().unwrap().threshold
    }

    pub(crate) fn signers(&self) -> Vec<SignerId> {
        self.state.lock().unwrap().signers.clone()
    }

    async fn enter(&self, method: &'static str) {
        self.state.lock().unwrap().calls.push(method);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn unavailable(what: &str) -> ServiceError {
    ServiceError::Rpc {
        code: -32000,
        message: format!("{what} unavailable"),
    }
}

#[async_trait]
impl VaultService for MockVault {
    async fn get_threshold(&self) -> ServiceResult<u32> {
        self.enter("get_threshold").await;
        let state = self.state.lock().unwrap();
        if state.fail_threshold {
            return Err(unavailable("threshold"));
        }
        Ok(state.threshold)
    }

    async fn get_signers(&self) -> ServiceResult<Vec<SignerId>> {
        self.enter("get_signers").await;
        Ok(self.state.lock().unwrap().signers.clone())
    }

    async fn set_threshold(&self, threshold: u32) -> ServiceResult<()> {
        self.enter("set_threshold").await;
        self.state.lock().unwrap().threshold = threshold;
        Ok(())
    }

    async fn add_signer(&self, signer: &SignerId) -> ServiceResult<()> {
        self.enter("add_signer").await;
        self.state.lock().unwrap().signers.push(signer.clone());
        Ok(())
    }

    async fn propose_transaction(&self, intent: &TransactionIntent) -> ServiceResult<Proposal> {
        self.enter("propose_transaction").await;
        let mut state = self.state.lock().unwrap();
        if state.fail_propose {
            return Err(unavailable("proposals"));
        }
        let proposal = Proposal {
            id: state.next_id,
            intent: intent.clone(),
            signer_approvals: state.approve_own_proposals.iter().cloned().collect(),
            signer_rejections: Vec::new(),
            timestamp: None,
        };
        state.next_id += 1;
        state.proposals.push(proposal.clone());
        Ok(proposal)
    }

    async fn execute_transaction(&self, proposal_id: u64) -> ServiceResult<TransactionStatus> {
        self.enter("execute_transaction").await;
        let mut state = self.state.lock().unwrap();
        let status = match state.execute.clone() {
            ExecuteBehavior::Status(status) => status,
            ExecuteBehavior::Error(message) => {
                return Err(ServiceError::Rpc {
                    code: -32001,
                    message,
                })
            }
        };
        let position = state
            .proposals
            .iter()
            .position(|p| p.id == proposal_id)
            .ok_or_else(|| unavailable("proposal"))?;
        let proposal = state.proposals.remove(position);
        state.executed.push(ExecutedTransaction {
            intent: proposal.intent,
            status: status.clone(),
            timestamp: None,
        });
        Ok(status)
    }

    async fn get_transactions(&self) -> ServiceResult<Vec<ExecutedTransaction>> {
        self.enter("get_transactions").await;
        Ok(self.state.lock().unwrap().executed.clone())
    }

    async fn get_proposed_transactions(&self) -> ServiceResult<Vec<Proposal>> {
        self.enter("get_proposed_transactions").await;
        Ok(self.state.lock().unwrap().proposals.clone())
    }

    async fn get_balance(&self, _network: Network) -> ServiceResult<u64> {
        self.enter("get_balance").await;
        Ok(self.state.lock().unwrap().balance)
    }

    async fn get_subaccount(&self, token: &TokenId) -> ServiceResult<String> {
        self.enter("get_subaccount").await;
        Ok(format!("subaccount-of-{token}"))
    }

    async fn get_token_balance(&self, _token: &TokenId, _subaccount: &str) -> ServiceResult<u64> {
        self.enter("get_token_balance").await;
        Ok(42)
    }

    async fn get_tokens(&self) -> ServiceResult<Vec<TokenId>> {
        self.enter("get_tokens").await;
        Ok(self.state.lock().unwrap().tokens.clone())
    }

    async fn add_token(&self, token: &TokenId) -> ServiceResult<()> {
        self.enter("add_token").await;
        self.state.lock().unwrap().tokens.push(token.clone());
        Ok(())
    }

    async fn token_symbol(&self, _token_address: &str) -> ServiceResult<String> {
        self.enter("token_symbol").await;
        Ok("ckBTC".to_string())
    }

    async fn token_decimals(&self, _token_address: &str) -> ServiceResult<u8> {
        self.enter("token_decimals").await;
        Ok(8)
    }
}
