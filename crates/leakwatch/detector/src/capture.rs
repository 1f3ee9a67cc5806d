//! Best-effort snapshot capture.
//!
//! A leaked node has by definition left its hierarchy, so rendering it often
//! fails or produces nothing. Every failure here degrades to "no snapshot";
//! none of them may stop the report.

use std::panic::{self, AssertUnwindSafe};

use leakwatch_types::{CaptureError, Snapshot};
use tracing::{debug, warn};

use crate::host::UiNode;

/// Renders leaked nodes for inclusion in reports.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotCapturer {
    enabled: bool,
}

impl Default for SnapshotCapturer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SnapshotCapturer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Capture `node`, or `None` if it cannot be rendered.
    pub fn capture(&self, node: &dyn UiNode) -> Option<Snapshot> {
        if !self.enabled {
            return None;
        }

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| Self::render(node)));

        match attempt {
            Ok(Ok(snapshot)) => Some(snapshot),
            Ok(Err(e)) => {
                debug!(class_name = %node.class_name(), error = %e, "Snapshot unavailable");
                None
            }
            Err(_) => {
                warn!("Snapshot renderer panicked; reporting without snapshot");
                None
            }
        }
    }

    fn render(node: &dyn UiNode) -> Result<Snapshot, CaptureError> {
        let bounds = node.bounds();
        if bounds.is_empty() {
            return Err(CaptureError::EmptyBounds);
        }

        let snapshot = node.render()?;

        if snapshot.bounds() != bounds {
            debug!(
                expected = %bounds,
                rendered = %snapshot.bounds(),
                "Rendered snapshot size differs from node bounds"
            );
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leakwatch_types::{Bounds, NodeKind};

    struct Painted {
        bounds: Bounds,
    }

    impl UiNode for Painted {
        fn kind(&self) -> NodeKind {
            NodeKind::Leaf
        }

        fn bounds(&self) -> Bounds {
            self.bounds
        }

        fn render(&self) -> Result<Snapshot, CaptureError> {
            Snapshot::solid(self.bounds, [10, 20, 30, 255])
        }
    }

    struct Exploding;

    impl UiNode for Exploding {
        fn kind(&self) -> NodeKind {
            NodeKind::Container
        }

        fn bounds(&self) -> Bounds {
            Bounds::new(10, 10)
        }

        fn render(&self) -> Result<Snapshot, CaptureError> {
            panic!("renderer lost its context");
        }
    }

    struct Offscreen;

    impl UiNode for Offscreen {
        fn kind(&self) -> NodeKind {
            NodeKind::Leaf
        }

        fn bounds(&self) -> Bounds {
            Bounds::new(5, 5)
        }

        fn render(&self) -> Result<Snapshot, CaptureError> {
            Err(CaptureError::NotRenderable("no window".to_string()))
        }
    }

    #[test]
    fn test_capture_renders_sized_node() {
        let node = Painted {
            bounds: Bounds::new(8, 6),
        };
        let snapshot = SnapshotCapturer::default().capture(&node).unwrap();
        assert_eq!(snapshot.bounds(), Bounds::new(8, 6));
    }

    #[test]
    fn test_zero_size_yields_none() {
        let node = Painted {
            bounds: Bounds::new(0, 6),
        };
        assert!(SnapshotCapturer::default().capture(&node).is_none());
    }

    #[test]
    fn test_render_error_yields_none() {
        assert!(SnapshotCapturer::default().capture(&Offscreen).is_none());
    }

    #[test]
    fn test_render_panic_is_swallowed() {
        assert!(SnapshotCapturer::default().capture(&Exploding).is_none());
    }

    #[test]
    fn test_disabled_capturer_skips_render() {
        let node = Painted {
            bounds: Bounds::new(8, 6),
        };
        assert!(SnapshotCapturer::new(false).capture(&node).is_none());
    }
}
