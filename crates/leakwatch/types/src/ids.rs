//! Identity tokens for leak candidates
//!
//! Every detach event gets its own token. Tokens are process-wide and strictly
//! increasing, so a later detach of the same node always sorts after an earlier one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CANDIDATE: AtomicU64 = AtomicU64::new(1);

/// Token identifying a single detach event under observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(u64);

impl CandidateId {
    /// Allocate the next token.
    pub fn next() -> Self {
        Self(NEXT_CANDIDATE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "candidate:#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_ids_increase() {
        let first = CandidateId::next();
        let second = CandidateId::next();
        assert!(second > first);
    }

    #[test]
    fn test_candidate_id_display() {
        let id = CandidateId::from_raw(42);
        assert_eq!(format!("{}", id), "candidate:#42");
    }
}
