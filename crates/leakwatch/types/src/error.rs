//! Error types for leakwatch-types.

use thiserror::Error;

/// Errors a host can return while rendering a diagnostic snapshot.
///
/// None of these are fatal: the detector logs them and reports the leak
/// without a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The host does not support rendering this node.
    #[error("snapshot rendering not supported")]
    Unsupported,

    /// The node has zero width or height.
    #[error("node has empty bounds")]
    EmptyBounds,

    /// The node is not part of a renderable hierarchy.
    #[error("node is not renderable: {0}")]
    NotRenderable(String),

    /// The host renderer failed.
    #[error("render failed: {0}")]
    Render(String),

    /// The pixel buffer does not match the declared dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },
}
