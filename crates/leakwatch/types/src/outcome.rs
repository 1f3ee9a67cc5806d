//! Probe outcomes and handler verdicts
//!
//! Suppression and expected deallocation are ordinary outcomes, not errors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::CandidateId;

/// The host handler's answer to a leak report.
///
/// Kept as three explicit variants so that "stop detecting" can never be
/// confused with "don't alert for this one".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakVerdict {
    /// Present a user-visible alert for this report.
    ShowAlert,

    /// Report observed; no alert.
    SuppressAlert,

    /// Clear the handler. Every later probe is discarded until the
    /// detector is configured again.
    DisableDetection,
}

impl LeakVerdict {
    /// Map the legacy optional-boolean handler return onto a verdict.
    pub fn from_optional_bool(value: Option<bool>) -> Self {
        match value {
            Some(true) => LeakVerdict::ShowAlert,
            Some(false) => LeakVerdict::SuppressAlert,
            None => LeakVerdict::DisableDetection,
        }
    }

    pub fn shows_alert(&self) -> bool {
        matches!(self, LeakVerdict::ShowAlert)
    }
}

impl fmt::Display for LeakVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeakVerdict::ShowAlert => write!(f, "show-alert"),
            LeakVerdict::SuppressAlert => write!(f, "suppress-alert"),
            LeakVerdict::DisableDetection => write!(f, "disable-detection"),
        }
    }
}

/// What a fired probe concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// No handler was registered when the probe fired.
    Disabled,

    /// The node was gone. This is the expected path.
    Deallocated,

    /// The node was alive but back inside a hierarchy.
    Reattached,

    /// The node's current class name is on an ignore list.
    Suppressed,

    /// The node was alive and had already been reported by an earlier probe.
    AlreadyReported { first: CandidateId },

    /// The leak was delivered to the handler.
    Reported {
        candidate: CandidateId,
        verdict: LeakVerdict,
    },
}

impl ProbeOutcome {
    pub fn is_reported(&self) -> bool {
        matches!(self, ProbeOutcome::Reported { .. })
    }
}

/// Counters describing detector activity since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorStats {
    /// Probes scheduled from detach events.
    pub scheduled: u64,

    /// Detach events discarded by the ignore lists before scheduling.
    pub suppressed_on_detach: u64,

    /// Probes that found no handler.
    pub disabled: u64,

    /// Probes that found the node deallocated.
    pub deallocated: u64,

    /// Probes that found the node reattached.
    pub reattached: u64,

    /// Probes discarded by the fire-time ignore check.
    pub suppressed_on_fire: u64,

    /// Probes that found an already-reported node.
    pub deduplicated: u64,

    /// Leaks delivered to the handler.
    pub reported: u64,

    /// Handler invocations that returned an error or panicked.
    pub handler_failures: u64,
}

impl DetectorStats {
    /// Probes that have fired, whatever their outcome.
    pub fn fired(&self) -> u64 {
        self.disabled
            + self.deallocated
            + self.reattached
            + self.suppressed_on_fire
            + self.deduplicated
            + self.reported
            + self.handler_failures
    }

    /// Probes scheduled but not yet fired.
    pub fn pending(&self) -> u64 {
        self.scheduled.saturating_sub(self.fired())
    }
}
