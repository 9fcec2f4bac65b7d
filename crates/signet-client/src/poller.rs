//! Background refresh of vault threshold, signers and native balance
//!
//! One poll task runs per watched vault. Switching vaults bumps a generation
//! counter and cancels the old task; a result fetched for an older generation
//! is dropped instead of published, so a slow answer for the previous vault
//! can never overwrite the state of the current one.

use crate::service::{CallOptions, VaultService};
use serde::Serialize;
use signet_errors::{Error, Result};
use signet_types::{Network, SignerId, Vault};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Refresh cadence when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Vault state as the service reported it in one fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VaultSnapshot {
    pub vault: String,
    pub threshold: u32,
    pub signers: Vec<SignerId>,
    pub native_balance: u64,
}

impl VaultSnapshot {
    /// Checked vault built from this snapshot
    pub fn to_vault(&self) -> Result<Vault> {
        Vault::new(
            self.vault.clone(),
            self.vault.clone(),
            self.threshold,
            self.signers.clone(),
        )
    }
}

/// Fetch threshold, signers and native balance concurrently
pub async fn fetch_snapshot(
    service: &dyn VaultService,
    vault: &str,
    call: &CallOptions,
) -> Result<VaultSnapshot> {
    let (threshold, signers, native_balance) = tokio::try_join!(
        call.run(service.get_threshold()),
        call.run(service.get_signers()),
        call.run(service.get_balance(Network::Icp)),
    )?;

    Ok(VaultSnapshot {
        vault: vault.to_string(),
        threshold,
        signers,
        native_balance,
    })
}

/// One published poll result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollUpdate {
    pub generation: u64,
    pub vault: String,
    pub result: Result<VaultSnapshot>,
}

/// Owns a running poll task; dropping it cancels the task
#[derive(Debug)]
pub struct PollerHandle {
    generation: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the task and wait for it to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                debug!(?err, "vault poller task exited with error");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Keeps the state of one vault at a time fresh
pub struct VaultPoller {
    interval: Duration,
    call: CallOptions,
    generation: Arc<AtomicU64>,
    updates: Arc<watch::Sender<Option<PollUpdate>>>,
    active: Option<PollerHandle>,
}

impl VaultPoller {
    pub fn new(interval: Duration, call: CallOptions) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            call,
            generation: Arc::new(AtomicU64::new(0)),
            updates: Arc::new(updates),
            active: None,
        }
    }

    /// Receiver of the latest published update
    pub fn subscribe(&self) -> watch::Receiver<Option<PollUpdate>> {
        self.updates.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Start polling `vault`, replacing whatever was polled before.
    ///
    /// The first fetch happens immediately. Returns the new generation.
    pub fn switch_vault(&mut self, service: Arc<dyn VaultService>, vault: &str) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.active.take() {
            previous.cancel();
        }

        let call = self.call.child();
        let cancel = call.cancel.clone();
        let task = tokio::spawn(poll_loop(PollTask {
            service,
            vault: vault.to_string(),
            generation,
            current: Arc::clone(&self.generation),
            updates: Arc::clone(&self.updates),
            interval: self.interval,
            call,
        }));

        info!(vault, generation, interval = ?self.interval, "polling vault");
        self.active = Some(PollerHandle {
            generation,
            cancel,
            task: Some(task),
        });
        generation
    }

    /// Stop polling; results still in flight are discarded
    pub async fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.active.take() {
            handle.shutdown().await;
        }
    }

    /// One fetch outside the polling schedule
    pub async fn refresh_once(
        &self,
        service: &dyn VaultService,
        vault: &str,
    ) -> Result<VaultSnapshot> {
        fetch_snapshot(service, vault, &self.call).await
    }
}

struct PollTask {
    service: Arc<dyn VaultService>,
    vault: String,
    generation: u64,
    current: Arc<AtomicU64>,
    updates: Arc<watch::Sender<Option<PollUpdate>>>,
    interval: Duration,
    call: CallOptions,
}

impl PollTask {
    fn is_superseded(&self) -> bool {
        self.call.cancel.is_cancelled() || self.current.load(Ordering::SeqCst) != self.generation
    }
}

async fn poll_loop(task: PollTask) {
    let mut ticker = time::interval(task.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = task.call.cancel.cancelled() => break,
            _ = ticker.tick() => {
                let result = fetch_snapshot(task.service.as_ref(), &task.vault, &task.call).await;

                if task.is_superseded() {
                    let stale = Error::StaleVaultState {
                        vault: task.vault.clone(),
                        generation: task.generation,
                    };
                    debug!(error = %stale, "discarding poll result");
                    break;
                }

                if let Err(err) = &result {
                    warn!(vault = %task.vault, error = %err, "vault refresh failed");
                }
                task.updates.send_replace(Some(PollUpdate {
                    generation: task.generation,
                    vault: task.vault.clone(),
                    result,
                }));
            }
        }
    }
    debug!(vault = %task.vault, generation = task.generation, "vault poller stopped");
}
