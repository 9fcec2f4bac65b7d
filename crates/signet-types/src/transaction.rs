//! Transaction intents and the shapes the vault service reports them in
//!
//! Field names on the wire follow the vault service (`to`, `from`, `signers`,
//! `rejections`); the Rust names say what the fields mean.

use crate::token::{Network, TokenId};
use crate::vault::SignerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of transaction an intent describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransactionType {
    Transfer,
    Swap,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Transfer => f.write_str("Transfer"),
            TransactionType::Swap => f.write_str("Swap"),
        }
    }
}

/// Outcome reported by the ledger for an executed transaction.
///
/// Each variant carries the ledger's message text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending(String),
    InProgress(String),
    Completed(String),
    Rejected(String),
    Failed(String),
}

impl TransactionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Pending(_) => "Pending",
            TransactionStatus::InProgress(_) => "InProgress",
            TransactionStatus::Completed(_) => "Completed",
            TransactionStatus::Rejected(_) => "Rejected",
            TransactionStatus::Failed(_) => "Failed",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TransactionStatus::Pending(msg)
            | TransactionStatus::InProgress(msg)
            | TransactionStatus::Completed(msg)
            | TransactionStatus::Rejected(msg)
            | TransactionStatus::Failed(msg) => msg,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TransactionStatus::Failed(_))
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message().is_empty() {
            f.write_str(self.label())
        } else {
            write!(f, "{}: {}", self.label(), self.message())
        }
    }
}

/// A transaction the vault should perform, as submitted by a signer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub amount: u64,
    pub token: TokenId,
    #[serde(rename = "to")]
    pub recipient: String,
    pub transaction_type: TransactionType,
    #[serde(rename = "from")]
    pub sender: String,
    pub network: Network,
}

impl TransactionIntent {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.amount, &self.token, &self.recipient, self.transaction_type)
    }
}

/// An intent collecting signer approvals
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    #[serde(flatten)]
    pub intent: TransactionIntent,
    #[serde(rename = "signers", default)]
    pub signer_approvals: Vec<SignerId>,
    #[serde(rename = "rejections", default)]
    pub signer_rejections: Vec<SignerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl Proposal {
    pub fn approvals(&self) -> usize {
        self.signer_approvals.len()
    }

    pub fn dedup_key(&self) -> DedupKey {
        self.intent.dedup_key()
    }
}

/// An intent that was sent to the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedTransaction {
    #[serde(flatten)]
    pub intent: TransactionIntent,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl ExecutedTransaction {
    pub fn dedup_key(&self) -> DedupKey {
        self.intent.dedup_key()
    }
}

/// Identity of "the same transaction" across the proposed and executed lists.
///
/// Two independent transfers with identical amount, token, recipient and type
/// share a key and cannot be told apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub amount: u64,
    pub token: TokenId,
    pub recipient: String,
    pub transaction_type: TransactionType,
}

impl DedupKey {
    pub fn new(
        amount: u64,
        token: &TokenId,
        recipient: &str,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            amount,
            token: token.clone(),
            recipient: recipient.to_string(),
            transaction_type,
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.amount, self.token, self.recipient, self.transaction_type
        )
    }
}
