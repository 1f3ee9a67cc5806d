//! Diagnostic snapshots
//!
//! A snapshot is the host's rendering of a leaked node at the moment the leak
//! was confirmed. Pixels are tightly packed RGBA8.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CaptureError;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Size of a node in device pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte length of an RGBA8 buffer covering these bounds.
    pub fn rgba_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rendered image of a node
#[derive(Clone, PartialEq)]
pub struct Snapshot {
    bounds: Bounds,
    rgba: Vec<u8>,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot, checking the buffer against the bounds.
    pub fn from_rgba(bounds: Bounds, rgba: Vec<u8>) -> Result<Self, CaptureError> {
        if bounds.is_empty() {
            return Err(CaptureError::EmptyBounds);
        }

        let expected = bounds.rgba_len();
        if rgba.len() != expected {
            return Err(CaptureError::BufferMismatch {
                expected,
                actual: rgba.len(),
            });
        }

        Ok(Self {
            bounds,
            rgba,
            captured_at: Utc::now(),
        })
    }

    /// A snapshot filled with a single colour.
    pub fn solid(bounds: Bounds, rgba: [u8; 4]) -> Result<Self, CaptureError> {
        let pixels = rgba.repeat(bounds.width as usize * bounds.height as usize);
        Self::from_rgba(bounds, pixels)
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn pixels(&self) -> &[u8] {
        &self.rgba
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Short BLAKE3 fingerprint of the pixel data, used to reference the
    /// snapshot from a leak message.
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(&self.rgba);
        hash.to_hex().as_str()[..16].to_string()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("bounds", &self.bounds)
            .field("bytes", &self.rgba.len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} snapshot {}", self.bounds, self.fingerprint())
    }
}
