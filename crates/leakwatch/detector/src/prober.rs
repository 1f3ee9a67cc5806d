//! Liveness probe.
//!
//! A single weak-reference resolution at fire time. There is no polling and no
//! heuristic beyond the delay itself: the delay must be long enough for
//! animations and transitions to finish tearing the node down.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::candidate::Candidate;
use crate::host::UiNode;

/// Checks whether a candidate's node is still alive.
#[derive(Debug, Default, Clone, Copy)]
pub struct LivenessProber;

impl LivenessProber {
    pub fn new() -> Self {
        Self
    }

    /// Whether anything outside the detector still owns the node.
    pub fn is_alive(&self, candidate: &Candidate) -> bool {
        candidate.node().strong_count() > 0
    }

    /// Resolve the candidate to a strong reference if it is still alive.
    ///
    /// The returned `Arc` must be dropped before the probe finishes.
    pub fn resolve(&self, candidate: &Candidate) -> Option<Arc<dyn UiNode>> {
        match candidate.node().upgrade() {
            Some(node) => {
                trace!(candidate = %candidate.id(), "Candidate still alive");
                Some(node)
            }
            None => {
                debug!(
                    candidate = %candidate.id(),
                    class_name = %candidate.class_name(),
                    "Candidate deallocated before probe"
                );
                None
            }
        }
    }
}
