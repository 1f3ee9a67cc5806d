//! leakwatch Types - Core types for detached UI node leak detection
//!
//! leakwatch observes UI nodes (views and view-controller-like containers)
//! as they are detached from their hierarchy and verifies, after a grace
//! period, that they were actually deallocated.
//!
//! ## Key Concepts
//!
//! - **NodeKind**: Whether a node is a container, a leaf or a root container
//! - **CandidateId**: Monotonic token identifying one detach event
//! - **Snapshot**: Best-effort visual capture attached to a leak report
//! - **LeakVerdict**: The host handler's three-way answer to a report
//! - **ProbeOutcome**: What a fired probe concluded

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod ids;
pub mod node;
pub mod outcome;
pub mod snapshot;

// Re-export main types
pub use error::CaptureError;
pub use ids::CandidateId;
pub use node::{NodeKind, ReportSlot, CONTAINER_LEAK_MARKER, LEAF_LEAK_MARKER};
pub use outcome::{DetectorStats, LeakVerdict, ProbeOutcome};
pub use snapshot::{Bounds, Snapshot, BYTES_PER_PIXEL};
