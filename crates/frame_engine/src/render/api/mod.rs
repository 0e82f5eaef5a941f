//! Backend-agnostic frame pacing interface
//!
//! The [`FrameDevice`] trait is the seam between the frame protocol and the
//! GPU: the [`FrameLoop`] and [`ResizeCoordinator`] are written entirely
//! against it, so the acquire/record/submit/present ordering rules can be
//! exercised with fakes and no GPU.

pub mod frame_device;
pub mod frame_loop;
pub mod resize;

pub use frame_device::{Acquire, FrameDevice, FrameSlot, SurfaceStatus};
pub use frame_loop::FrameLoop;
pub use resize::{ResizeCoordinator, ResizeState};
