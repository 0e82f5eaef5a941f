//! # Rendering Core
//!
//! High-level frame pacing interface over the Vulkan backend.
//!
//! The module splits into three layers:
//! - **api**: the [`FrameDevice`] seam, the [`FrameLoop`] driver, and the
//!   [`ResizeCoordinator`] state machine. Everything here is backend-agnostic
//!   and testable against fakes.
//! - **backends**: the Vulkan implementation of the seam, built from RAII
//!   wrappers over `ash` handles.
//! - **window**: the narrow GLFW surface the core consumes (drawable size
//!   queries and the minimize condition wait).
//!
//! Transient surface staleness (resize, minimize, suboptimal present) is
//! handled internally and never surfaces as an error; everything else in
//! [`RenderError`] is fatal to the frame loop.

pub mod api;
pub mod backends;
pub mod config;
pub mod window;

pub use api::{Acquire, FrameDevice, FrameLoop, FrameSlot, ResizeCoordinator, ResizeState, SurfaceStatus};
pub use backends::vulkan::{
    CommandPool, CommandSubmissionPipeline, DrawInputs, Fence, FrameBufferSet, FrameSyncRing,
    Framebuffer, RenderCollaborators, Semaphore, SwapchainManager, VulkanError, VulkanFrameDevice,
    VulkanResult,
};
pub use config::{RendererConfig, MAX_FRAMES_IN_FLIGHT};
pub use window::{Window, WindowError};

use thiserror::Error;

/// Errors surfaced by the rendering core
///
/// Swap-chain staleness never appears here; it is consumed internally by the
/// resize coordinator. Every variant below aborts the frame loop.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// Swap chain or framebuffer creation failed
    ///
    /// No compatible surface configuration exists. Retrying without a changed
    /// surface cannot succeed, so there is no retry policy.
    #[error("Swap chain creation failed: {0}")]
    SwapchainCreation(String),

    /// The GPU reported loss of the logical device
    ///
    /// Unrecoverable by this core; the top-level engine decides whether to
    /// terminate or reinitialize from scratch.
    #[error("GPU device lost")]
    DeviceLost,

    /// A bounded wait on the GPU expired
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

impl From<VulkanError> for RenderError {
    fn from(err: VulkanError) -> Self {
        match err {
            VulkanError::SwapchainCreation { reason } => RenderError::SwapchainCreation(reason),
            VulkanError::DeviceLost => RenderError::DeviceLost,
            VulkanError::Timeout { operation } => RenderError::Timeout(operation),
            other => RenderError::Backend(other.to_string()),
        }
    }
}
