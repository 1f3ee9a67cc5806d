//! Host UI framework surface.
//!
//! The detector never walks or owns the host's node graph. It needs a class
//! name and kind, a weak handle, an optional rendering, and a way to be told
//! that a node left its parent. Hosts keep their nodes in `Arc`s and
//! implement the traits below.

use std::sync::{Arc, Weak};

use leakwatch_types::{Bounds, CaptureError, NodeKind, Snapshot};
use tracing::warn;

use crate::detector::LeakDetector;
use crate::report::LeakReport;
use crate::scheduler::ProbeHandle;

/// A node in the host's UI hierarchy.
pub trait UiNode: Send + Sync + 'static {
    /// Container, leaf, or root container.
    fn kind(&self) -> NodeKind;

    /// Runtime class name used for ignore-list lookups.
    ///
    /// Defaults to the unqualified Rust type name. Hosts with dynamic
    /// subclassing should return the effective class at call time.
    fn class_name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Whether the node currently has a parent, presenter or window.
    fn is_attached(&self) -> bool {
        false
    }

    /// Current size of the node.
    fn bounds(&self) -> Bounds {
        Bounds::ZERO
    }

    /// Render the node for diagnostics.
    fn render(&self) -> Result<Snapshot, CaptureError> {
        Err(CaptureError::Unsupported)
    }
}

/// Anything the detector can take a weak handle from.
///
/// Implemented for `Arc<T>` of any concrete node and for `Arc<dyn UiNode>`.
pub trait NodeRef {
    fn node(&self) -> &dyn UiNode;

    fn downgrade(&self) -> Weak<dyn UiNode>;
}

impl<T: UiNode> NodeRef for Arc<T> {
    fn node(&self) -> &dyn UiNode {
        self.as_ref()
    }

    fn downgrade(&self) -> Weak<dyn UiNode> {
        let weak: Weak<T> = Arc::downgrade(self);
        weak
    }
}

impl NodeRef for Arc<dyn UiNode> {
    fn node(&self) -> &dyn UiNode {
        self.as_ref()
    }

    fn downgrade(&self) -> Weak<dyn UiNode> {
        Arc::downgrade(self)
    }
}

/// A node that can remove itself from its parent.
pub trait Detachable: UiNode {
    fn detach_from_parent(&self);
}

/// Detach hook a host calls instead of its plain detach operation.
pub trait DetachAndDetect {
    /// Detach from the parent, then hand the node to the detector.
    ///
    /// Returns `None` when the node's class is ignored.
    fn detach_and_detect_leak(&self, detector: &LeakDetector) -> Option<ProbeHandle>;
}

impl<T: Detachable> DetachAndDetect for Arc<T> {
    fn detach_and_detect_leak(&self, detector: &LeakDetector) -> Option<ProbeHandle> {
        self.detach_from_parent();
        detector.node_detached(self)
    }
}

/// Presents a leak to the user when the handler asks for an alert.
pub trait AlertPresenter: Send + Sync {
    fn present(&self, report: &LeakReport);
}

/// Fallback presenter that writes the alert to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertPresenter;

impl AlertPresenter for LogAlertPresenter {
    fn present(&self, report: &LeakReport) {
        warn!(
            candidate = %report.candidate(),
            class_name = %report.class_name(),
            kind = %report.kind(),
            "{}",
            report.message()
        );
    }
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
