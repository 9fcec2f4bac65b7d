//! Client-side coordination for signet multisig vaults.
//!
//! The remote vault service is the source of truth for thresholds, signers
//! and execution. This crate decides when to *attempt* execution, keeps one
//! connection handle per vault and identity, merges the proposed and executed
//! transaction lists into a single view, and keeps vault state fresh.

pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod history;
pub mod intent;
pub mod poller;
pub mod rpc;
pub mod service;
pub mod session;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheKey, ClientCache, Connector};
pub use cli::{CliError, CliResult};
pub use config::{ClientConfig, ConfigError};
pub use coordinator::{can_execute, Coordinator, SubmitOutcome};
pub use history::{history_from_service_order, merge, split, Provenance, ViewEntry};
pub use intent::{IntentBuilder, IntentDraft};
pub use poller::{
    fetch_snapshot, PollUpdate, PollerHandle, VaultPoller, VaultSnapshot, DEFAULT_POLL_INTERVAL,
};
pub use rpc::{HttpConnector, RpcVaultClient};
pub use service::{CallOptions, ServiceError, ServiceResult, VaultService};
pub use session::{Asset, Session, TokenDisplay};
pub use settings::VaultSettings;

pub use signet_errors::{Error, Result};
