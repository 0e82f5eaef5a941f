//! Graphics backend implementations
//!
//! Currently Vulkan only. Backends implement the
//! [`FrameDevice`](crate::render::FrameDevice) seam defined in the api layer.

pub mod vulkan;
