//! Core data types for the signet multisig vault client.
//!
//! Everything here is plain data: vaults and their signer sets, token
//! identifiers, transaction intents and the two shapes the remote service
//! reports transactions in (proposed and executed).

pub mod address;
pub mod token;
pub mod transaction;
pub mod units;
pub mod vault;

pub use address::validate_recipient;
pub use token::{Network, TokenDescriptor, TokenId, TokenStandard, NATIVE_TOKEN};
pub use transaction::{
    DedupKey, ExecutedTransaction, Proposal, TransactionIntent, TransactionStatus,
    TransactionType,
};
pub use units::{format_units, NATIVE_DECIMALS};
pub use vault::{SignerId, Vault};

pub use signet_errors::{Error, Result};
