//! Leak reports.
//!
//! A report lives only for the duration of the handler call (and the alert,
//! if one is requested). It is the one place the detector holds a strong
//! reference to a leaked node, and it is dropped as soon as delivery ends.

use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use leakwatch_types::{CandidateId, NodeKind, ReportSlot, Snapshot};

use crate::host::UiNode;

/// A confirmed leak, as delivered to the handler.
pub struct LeakReport {
    candidate: CandidateId,
    class_name: String,
    kind: NodeKind,
    container: Option<Arc<dyn UiNode>>,
    leaf: Option<Arc<dyn UiNode>>,
    message: String,
    snapshot: Option<Snapshot>,
    detected_at: DateTime<Utc>,
}

impl LeakReport {
    /// Build a report for `node`. Exactly one of the container and leaf
    /// slots is filled, chosen by `kind`.
    pub fn new(
        candidate: CandidateId,
        kind: NodeKind,
        node: Arc<dyn UiNode>,
        elapsed: Duration,
        snapshot: Option<Snapshot>,
    ) -> Self {
        let class_name = node.class_name();
        let message = format_message(candidate, kind, &class_name, elapsed, snapshot.as_ref());

        let (container, leaf) = match kind.slot() {
            ReportSlot::Container => (Some(node), None),
            ReportSlot::Leaf => (None, Some(node)),
        };

        Self {
            candidate,
            class_name,
            kind,
            container,
            leaf,
            message,
            snapshot,
            detected_at: Utc::now(),
        }
    }

    pub fn candidate(&self) -> CandidateId {
        self.candidate
    }

    /// Class name at the time the leak was confirmed.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The leaked node, if it is a container.
    pub fn container(&self) -> Option<&Arc<dyn UiNode>> {
        self.container.as_ref()
    }

    /// The leaked node, if it is a leaf.
    pub fn leaf(&self) -> Option<&Arc<dyn UiNode>> {
        self.leaf.as_ref()
    }

    /// Human-readable diagnostic, led by the kind marker.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }
}

impl fmt::Debug for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeakReport")
            .field("candidate", &self.candidate)
            .field("class_name", &self.class_name)
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("snapshot", &self.snapshot)
            .field("detected_at", &self.detected_at)
            .finish()
    }
}

fn format_message(
    candidate: CandidateId,
    kind: NodeKind,
    class_name: &str,
    elapsed: Duration,
    snapshot: Option<&Snapshot>,
) -> String {
    let mut message = String::new();
    let _ = writeln!(message, "{}", kind.leak_marker());
    let _ = writeln!(message, "{}", class_name);
    let _ = writeln!(
        message,
        "{} still alive {:.1}s after detach",
        candidate,
        elapsed.as_secs_f64()
    );
    match snapshot {
        Some(snapshot) => {
            let _ = write!(message, "{}", snapshot);
        }
        None => {
            let _ = write!(message, "no snapshot");
        }
    }
    message
}
