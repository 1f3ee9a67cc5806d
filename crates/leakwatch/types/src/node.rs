//! Node classification
//!
//! Ignore lists are keyed on a runtime class name, so every node also carries an
//! explicit kind tag that selects which list applies and which report slot it fills.

use serde::{Deserialize, Serialize};
use std::fmt;

/// First line of every leaf (view) leak message.
pub const LEAF_LEAK_MARKER: &str = "VIEW STILL IN MEMORY";

/// First line of every container (view controller) leak message.
pub const CONTAINER_LEAK_MARKER: &str = "VIEWCONTROLLER STILL IN MEMORY";

/// Kind of UI node under observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Owns a subtree and a presentation lifecycle (a view controller).
    Container,

    /// Member of a visual subtree without its own lifecycle (a view).
    Leaf,

    /// Top-level host for a container subtree (a window).
    RootContainer,
}

/// Which slot of a leak report a node is delivered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSlot {
    Container,
    Leaf,
}

impl NodeKind {
    /// Report slot for this kind. Root containers are reported as containers.
    pub fn slot(&self) -> ReportSlot {
        match self {
            NodeKind::Container | NodeKind::RootContainer => ReportSlot::Container,
            NodeKind::Leaf => ReportSlot::Leaf,
        }
    }

    /// Marker substring leading the leak message for this kind.
    pub fn leak_marker(&self) -> &'static str {
        match self.slot() {
            ReportSlot::Container => CONTAINER_LEAK_MARKER,
            ReportSlot::Leaf => LEAF_LEAK_MARKER,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Container => write!(f, "container"),
            NodeKind::Leaf => write!(f, "leaf"),
            NodeKind::RootContainer => write!(f, "root-container"),
        }
    }
}
