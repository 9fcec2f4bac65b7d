//! One transaction list out of the service's proposed and executed lists
//!
//! Entries are identified by their dedup key. Executed entries beat proposed
//! ones, and a failed execution beats a successful one with the same key so
//! a failure is never hidden.

use serde::Serialize;
use signet_types::{DedupKey, ExecutedTransaction, Proposal, TransactionIntent};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Provenance {
    Executed,
    Proposed,
}

/// A row of the merged view, tagged with the list it came from
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "provenance")]
pub enum ViewEntry {
    Executed(ExecutedTransaction),
    Proposed(Proposal),
}

impl ViewEntry {
    pub fn provenance(&self) -> Provenance {
        match self {
            ViewEntry::Executed(_) => Provenance::Executed,
            ViewEntry::Proposed(_) => Provenance::Proposed,
        }
    }

    pub fn intent(&self) -> &TransactionIntent {
        match self {
            ViewEntry::Executed(tx) => &tx.intent,
            ViewEntry::Proposed(proposal) => &proposal.intent,
        }
    }

    pub fn timestamp(&self) -> Option<u64> {
        match self {
            ViewEntry::Executed(tx) => tx.timestamp,
            ViewEntry::Proposed(proposal) => proposal.timestamp,
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        self.intent().dedup_key()
    }

    fn is_failed(&self) -> bool {
        matches!(self, ViewEntry::Executed(tx) if tx.status.is_failed())
    }
}

/// Merge executed transactions (most recent first) with pending proposals.
///
/// The result holds at most one entry per dedup key and is ordered newest
/// first; entries without a timestamp count as newest and ties keep the
/// order they were inserted in.
pub fn merge(executed: &[ExecutedTransaction], proposed: &[Proposal]) -> Vec<ViewEntry> {
    let mut view: Vec<ViewEntry> = Vec::with_capacity(executed.len() + proposed.len());
    let mut index: HashMap<DedupKey, usize> = HashMap::new();

    for tx in executed {
        let key = tx.dedup_key();
        match index.get(&key) {
            None => {
                index.insert(key, view.len());
                view.push(ViewEntry::Executed(tx.clone()));
            }
            Some(&pos) => {
                if tx.status.is_failed() && !view[pos].is_failed() {
                    view[pos] = ViewEntry::Executed(tx.clone());
                }
            }
        }
    }

    let mut by_id: Vec<&Proposal> = proposed.iter().collect();
    by_id.sort_by_key(|proposal| proposal.id);
    for proposal in by_id {
        let key = proposal.dedup_key();
        if !index.contains_key(&key) {
            index.insert(key, view.len());
            view.push(ViewEntry::Proposed(proposal.clone()));
        }
    }

    view.sort_by(|a, b| sort_time(b).cmp(&sort_time(a)));
    view
}

fn sort_time(entry: &ViewEntry) -> u64 {
    entry.timestamp().unwrap_or(u64::MAX)
}

/// Split a view back into its executed and proposed parts, in view order
pub fn split(view: &[ViewEntry]) -> (Vec<ExecutedTransaction>, Vec<Proposal>) {
    let mut executed = Vec::new();
    let mut proposed = Vec::new();
    for entry in view {
        match entry {
            ViewEntry::Executed(tx) => executed.push(tx.clone()),
            ViewEntry::Proposed(proposal) => proposed.push(proposal.clone()),
        }
    }
    (executed, proposed)
}

/// [`merge`] for lists exactly as the service returns them (executed oldest first)
pub fn history_from_service_order(
    mut executed: Vec<ExecutedTransaction>,
    proposed: &[Proposal],
) -> Vec<ViewEntry> {
    executed.reverse();
    merge(&executed, proposed)
}
