//! # Frame Engine
//!
//! The frame pacing and swap-chain lifecycle core of a Vulkan renderer.
//!
//! This crate drives the steady-state cycle of a real-time renderer:
//! wait for a frame slot, acquire a presentable image, record and submit
//! draw work, present, and advance to the next slot. It also owns the
//! swap-chain teardown/recreation state machine that transparently heals
//! the presentation surface after window resizes and minimization.
//!
//! Device bootstrap, pipeline compilation, geometry upload, and event
//! polling live outside this crate: callers hand in the handles they
//! already own through [`render::RenderCollaborators`] and the core never
//! mutates them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frame_engine::render::{
//!     FrameLoop, RendererConfig, RenderCollaborators, VulkanFrameDevice, Window,
//! };
//!
//! fn drive(collaborators: RenderCollaborators, window: Window) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RendererConfig::new("demo");
//!     let device = VulkanFrameDevice::new(collaborators, window, &config)?;
//!     let mut frame_loop = FrameLoop::new(device);
//!
//!     while !frame_loop.device().window().should_close() {
//!         let window = frame_loop.device_mut().window_mut();
//!         window.poll_events();
//!         if window.take_resize_event() {
//!             frame_loop.on_surface_resized();
//!         }
//!         frame_loop.run_frame()?;
//!     }
//!     frame_loop.shutdown()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod render;
