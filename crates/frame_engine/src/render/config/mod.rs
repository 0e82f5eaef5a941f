//! Renderer configuration
//!
//! Application-tunable settings for the frame loop and swap chain, kept out
//! of the rendering code itself so values are never hardcoded at call sites.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Default number of frames the CPU may prepare ahead of the GPU
///
/// The sync ring owns exactly this many semaphore/fence sets. Swap-chain
/// image count is negotiated separately and must never be assumed equal.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Default bounded wait for a frame fence: one second in nanoseconds
const DEFAULT_FENCE_TIMEOUT_NS: u64 = 1_000_000_000;

/// Configuration for the frame pacing core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name, used for log context
    pub application_name: String,
    /// Maximum frames in flight (clamped to 1..=8)
    pub max_frames_in_flight: usize,
    /// Bounded fence wait in nanoseconds; expiry surfaces as a timeout error
    pub fence_timeout_ns: u64,
    /// Background clear color [R, G, B, A] (0.0-1.0 range)
    pub clear_color: [f32; 4],
    /// Prefer MAILBOX presentation when the surface supports it, FIFO otherwise
    pub prefer_mailbox: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "frame_engine".to_string(),
            max_frames_in_flight: MAX_FRAMES_IN_FLIGHT,
            fence_timeout_ns: DEFAULT_FENCE_TIMEOUT_NS,
            clear_color: [0.005, 0.005, 0.005, 1.0],
            prefer_mailbox: true,
        }
    }
}

impl Config for RendererConfig {}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            ..Self::default()
        }
    }

    /// Set maximum frames in flight
    pub fn with_max_frames_in_flight(mut self, max_frames: usize) -> Self {
        self.max_frames_in_flight = max_frames.clamp(1, 8);
        self
    }

    /// Set the bounded fence wait
    pub fn with_fence_timeout_ns(mut self, timeout_ns: u64) -> Self {
        self.fence_timeout_ns = timeout_ns;
        self
    }

    /// Set the background clear color
    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }
}
