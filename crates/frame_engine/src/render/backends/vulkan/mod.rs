//! Vulkan rendering backend
//!
//! Low-level `ash` implementation of the frame protocol. Every wrapper here
//! follows the same ownership rule: the struct that creates a Vulkan object
//! destroys it, either through an idempotent `destroy()` or through `Drop`,
//! so teardown order falls out of scope order rather than hand-written
//! cleanup sequences.

pub mod commands;
pub mod device;
pub mod framebuffer;
pub mod swapchain;
pub mod sync;

pub use commands::{CommandPool, CommandSubmissionPipeline, DrawInputs};
pub use device::{RenderCollaborators, VulkanFrameDevice};
pub use framebuffer::{FrameBufferSet, Framebuffer};
pub use swapchain::SwapchainManager;
pub use sync::{Fence, FrameSync, FrameSyncRing, Semaphore};

use ash::vk;
use thiserror::Error;

/// Errors produced by the Vulkan backend
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Swap chain creation failed
    ///
    /// No compatible surface configuration exists, e.g. the surface was
    /// destroyed or has a zero-area extent.
    #[error("Swap chain creation failed: {reason}")]
    SwapchainCreation {
        /// Why no configuration could be selected
        reason: String,
    },

    /// The logical device was lost or a submission was rejected
    #[error("GPU device lost")]
    DeviceLost,

    /// A bounded GPU wait expired
    #[error("Timed out waiting for {operation}")]
    Timeout {
        /// The operation that was being waited on
        operation: String,
    },

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;
