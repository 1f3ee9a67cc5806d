//! A detached node under observation.

use std::fmt;
use std::sync::Weak;
use std::time::{Duration, Instant};

use leakwatch_types::{CandidateId, NodeKind};

use crate::host::{NodeRef, UiNode};

/// One detach event awaiting its probe.
///
/// Holds only a weak handle: if the candidate kept the node alive, every
/// probe would see a leak.
pub struct Candidate {
    id: CandidateId,
    node: Weak<dyn UiNode>,
    class_name: String,
    kind: NodeKind,
    delay: Duration,
    detached_at: Instant,
}

impl Candidate {
    /// Capture a candidate at the moment of detach.
    pub fn new(node: &impl NodeRef, delay: Duration) -> Self {
        let inner = node.node();
        Self {
            id: CandidateId::next(),
            class_name: inner.class_name(),
            kind: inner.kind(),
            node: node.downgrade(),
            delay,
            detached_at: Instant::now(),
        }
    }

    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn node(&self) -> &Weak<dyn UiNode> {
        &self.node
    }

    /// Class name as observed at detach time.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Delay this candidate was scheduled with.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn detached_at(&self) -> Instant {
        self.detached_at
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("id", &self.id)
            .field("class_name", &self.class_name)
            .field("kind", &self.kind)
            .field("delay", &self.delay)
            .field("alive", &(self.node.strong_count() > 0))
            .finish()
    }
}
