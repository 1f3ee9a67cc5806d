//! leakwatch Detector - Deferred liveness probing for detached UI nodes
//!
//! When a host removes a node from its hierarchy it tells the detector. The
//! detector keeps a weak handle, waits out a grace period on the host's run
//! loop, and checks whether the node is gone. A node that is still alive,
//! still detached and not on an ignore list is reported to the registered
//! handler, whose verdict decides between an alert, silence, or switching
//! detection off.
//!
//! ## Components
//!
//! - **IgnoreRegistry**: class names never reported, per node kind
//! - **LivenessProber**: the weak-reference check at fire time
//! - **SnapshotCapturer**: best-effort rendering of leaked nodes
//! - **CallbackRegistry**: the active `{delay, handler}` pair
//! - **DetectionScheduler**: detach to verdict, one probe per candidate
//! - **LeakLedger**: dedup of reported nodes and late-deallocation sweeps
//! - **RunLoop**: where probes execute (`TokioRunLoop`, `ManualRunLoop`)
//!
//! ## Example
//!
//! ```ignore
//! let detector = LeakDetector::new()?;
//! detector.configure(Duration::from_millis(100), |report| {
//!     eprintln!("{}", report.message());
//!     LeakVerdict::SuppressAlert
//! });
//!
//! let handle = button.detach_and_detect_leak(&detector);
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod candidate;
pub mod capture;
pub mod config;
pub mod detector;
pub mod error;
pub mod host;
pub mod ignore;
pub mod ledger;
pub mod prober;
pub mod registry;
pub mod report;
pub mod runloop;
pub mod scheduler;

pub use candidate::Candidate;
pub use capture::SnapshotCapturer;
pub use config::{DetectorConfig, IgnoreListConfig};
pub use detector::{LeakDetector, LeakDetectorBuilder};
pub use error::{DetectorError, DetectorResult, HandlerError};
pub use host::{AlertPresenter, DetachAndDetect, Detachable, LogAlertPresenter, NodeRef, UiNode};
pub use ignore::{
    IgnoreRegistry, DEFAULT_IGNORED_CONTAINERS, DEFAULT_IGNORED_LEAVES,
    DEFAULT_IGNORED_ROOT_CONTAINERS,
};
pub use ledger::{LateDeallocation, LeakLedger};
pub use prober::LivenessProber;
pub use registry::{
    fallible_handler, infallible_handler, ActiveHandler, CallbackRegistry, LeakHandler,
};
pub use report::LeakReport;
pub use runloop::{Job, ManualRunLoop, RunLoop, TokioRunLoop};
pub use scheduler::{DetectionScheduler, ProbeHandle};

// Re-export the shared types hosts need alongside the detector
pub use leakwatch_types::{
    Bounds, CandidateId, CaptureError, DetectorStats, LeakVerdict, NodeKind, ProbeOutcome,
    Snapshot,
};
