//! Ledger of reported leaks.
//!
//! Holds a weak handle to every node whose report reached the handler. A node
//! that is detached again while still alive is recognized and not reported
//! twice, and released nodes are moved out of the ledger as new reports come
//! in, to be collected by the next sweep.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use leakwatch_types::{CandidateId, NodeKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::candidate::Candidate;
use crate::host::UiNode;

/// Released records kept between sweeps. Oldest are dropped first.
pub const MAX_PENDING_RELEASES: usize = 1024;

/// A reported node that was eventually deallocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateDeallocation {
    /// The probe that first reported the node.
    pub candidate: CandidateId,

    pub class_name: String,

    pub kind: NodeKind,

    pub reported_at: DateTime<Utc>,

    /// When the ledger found the node gone.
    pub observed_at: DateTime<Utc>,
}

impl LateDeallocation {
    /// Upper bound on how long the node outlived its report.
    pub fn outlived_report_by(&self) -> Duration {
        (self.observed_at - self.reported_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

struct LedgerEntry {
    candidate: CandidateId,
    node: Weak<dyn UiNode>,
    class_name: String,
    kind: NodeKind,
    reported_at: DateTime<Utc>,
}

impl LedgerEntry {
    fn is_alive(&self) -> bool {
        self.node.strong_count() > 0
    }

    fn released(&self, observed_at: DateTime<Utc>) -> LateDeallocation {
        LateDeallocation {
            candidate: self.candidate,
            class_name: self.class_name.clone(),
            kind: self.kind,
            reported_at: self.reported_at,
            observed_at,
        }
    }
}

/// Reported-but-alive nodes, keyed by allocation address.
///
/// A stored `Weak` keeps its allocation reserved, so an address cannot be
/// reused by another node while its entry exists. Entries for released nodes
/// are pruned on every [`record`](Self::record).
#[derive(Default)]
pub struct LeakLedger {
    entries: DashMap<usize, LedgerEntry>,
    released: Mutex<VecDeque<LateDeallocation>>,
}

impl LeakLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The candidate that already reported this node, if the node is on the
    /// ledger and still alive.
    pub fn reported_by(&self, candidate: &Candidate) -> Option<CandidateId> {
        let entry = self.entries.get(&address_of(candidate.node()))?;
        if !entry.is_alive() {
            return None;
        }

        debug!(
            candidate = %candidate.id(),
            first = %entry.candidate,
            "Node already reported"
        );
        Some(entry.candidate)
    }

    /// Record that `candidate`'s report was delivered.
    ///
    /// Also moves every released node off the ledger.
    pub fn record(&self, candidate: &Candidate) {
        self.prune();

        self.entries.insert(
            address_of(candidate.node()),
            LedgerEntry {
                candidate: candidate.id(),
                node: candidate.node().clone(),
                class_name: candidate.class_name().to_string(),
                kind: candidate.kind(),
                reported_at: Utc::now(),
            },
        );
    }

    /// Whether a live entry exists for `candidate`'s node.
    pub fn contains(&self, candidate: &Candidate) -> bool {
        self.entries
            .get(&address_of(candidate.node()))
            .map_or(false, |entry| entry.is_alive())
    }

    /// Take every released node observed since the last sweep.
    pub fn sweep(&self) -> Vec<LateDeallocation> {
        self.prune();
        let mut released = self.released.lock().unwrap_or_else(PoisonError::into_inner);
        released.drain(..).collect()
    }

    /// Entries still held, live or not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&self) {
        let observed_at = Utc::now();
        let mut gone = Vec::new();

        self.entries.retain(|_, entry| {
            if entry.is_alive() {
                return true;
            }
            gone.push(entry.released(observed_at));
            false
        });

        if gone.is_empty() {
            return;
        }

        let mut released = self.released.lock().unwrap_or_else(PoisonError::into_inner);
        for late in gone {
            info!(
                candidate = %late.candidate,
                class_name = %late.class_name,
                "Reported node eventually deallocated"
            );
            if released.len() == MAX_PENDING_RELEASES {
                released.pop_front();
            }
            released.push_back(late);
        }
    }
}

fn address_of(node: &Weak<dyn UiNode>) -> usize {
    Weak::as_ptr(node) as *const () as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct LedgerView;

    impl UiNode for LedgerView {
        fn kind(&self) -> NodeKind {
            NodeKind::Leaf
        }
    }

    fn leaked() -> Arc<dyn UiNode> {
        Arc::new(LedgerView)
    }

    fn candidate_for(node: &Arc<dyn UiNode>) -> Candidate {
        Candidate::new(node, Duration::from_millis(10))
    }

    #[test]
    fn test_unrecorded_node_is_new() {
        let ledger = LeakLedger::new();
        let node = leaked();
        let candidate = candidate_for(&node);

        assert!(ledger.reported_by(&candidate).is_none());
        assert!(!ledger.contains(&candidate));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_recorded_live_node_is_recognized() {
        let ledger = LeakLedger::new();
        let node = leaked();
        let first = candidate_for(&node);
        let second = candidate_for(&node);

        ledger.record(&first);
        assert_eq!(ledger.reported_by(&second), Some(first.id()));
        assert!(ledger.contains(&second));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_sweep_collects_released_nodes() {
        let ledger = LeakLedger::new();
        let kept = leaked();
        let released = leaked();
        let kept_candidate = candidate_for(&kept);
        let released_candidate = candidate_for(&released);

        ledger.record(&kept_candidate);
        ledger.record(&released_candidate);
        drop(released);

        let late = ledger.sweep();
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].candidate, released_candidate.id());
        assert_eq!(late[0].class_name, "LedgerView");
        assert!(late[0].observed_at >= late[0].reported_at);

        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains(&kept_candidate));
        assert!(ledger.sweep().is_empty());
    }

    #[test]
    fn test_record_prunes_released_nodes() {
        let ledger = LeakLedger::new();

        for _ in 0..50 {
            let node = leaked();
            ledger.record(&candidate_for(&node));
        }
        assert_eq!(ledger.len(), 50);

        let survivor = leaked();
        ledger.record(&candidate_for(&survivor));

        // Only the live node is still held.
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.sweep().len(), 50);
    }

    #[test]
    fn test_pending_releases_are_bounded() {
        let ledger = LeakLedger::new();

        for _ in 0..MAX_PENDING_RELEASES + 10 {
            let node = leaked();
            ledger.record(&candidate_for(&node));
        }

        let late = ledger.sweep();
        assert_eq!(late.len(), MAX_PENDING_RELEASES);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_ledger_holds_no_strong_reference() {
        let ledger = LeakLedger::new();
        let node = leaked();
        ledger.record(&candidate_for(&node));
        assert_eq!(Arc::strong_count(&node), 1);
    }
}
