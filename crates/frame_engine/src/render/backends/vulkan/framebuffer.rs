//! Framebuffer management
//!
//! One render-target binding per swap-chain image, bound to a fixed render
//! pass. The set is replaced wholesale on every swap-chain rebuild; binding
//! count and image count drifting apart indicates broken generation
//! tracking, not a runtime condition.

use ash::{vk, Device};

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Framebuffer wrapper with RAII cleanup
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a new framebuffer over the given attachments
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let framebuffer_create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            device
                .create_framebuffer(&framebuffer_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            device,
            framebuffer,
        })
    }

    /// Get the framebuffer handle
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// One framebuffer per swap-chain image view
///
/// Starts empty; populated by `rebuild` at startup and after every
/// swap-chain recreation.
pub struct FrameBufferSet {
    framebuffers: Vec<Framebuffer>,
}

impl FrameBufferSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            framebuffers: Vec::new(),
        }
    }

    /// Replace all bindings with one framebuffer per view
    ///
    /// The resulting binding count always equals `image_views.len()`.
    pub fn rebuild(
        &mut self,
        device: &Device,
        image_views: &[vk::ImageView],
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
    ) -> VulkanResult<()> {
        self.destroy();

        for &view in image_views {
            self.framebuffers.push(Framebuffer::new(
                device.clone(),
                render_pass,
                &[view],
                extent,
            )?);
        }

        debug_assert_eq!(self.framebuffers.len(), image_views.len());
        log::debug!("Framebuffer set rebuilt with {} bindings", self.framebuffers.len());
        Ok(())
    }

    /// Release all bindings
    ///
    /// Idempotent and safe on empty sets; each framebuffer is destroyed by
    /// its own `Drop`.
    pub fn destroy(&mut self) {
        self.framebuffers.clear();
    }

    /// Get the framebuffer for a swap-chain image
    ///
    /// An out-of-range index means the set and the swap chain disagree on
    /// generation, which is a bug; it panics rather than being reported as
    /// a recoverable error.
    pub fn handle(&self, image_index: usize) -> vk::Framebuffer {
        self.framebuffers[image_index].handle()
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    /// Whether the set currently holds no bindings
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }
}

impl Default for FrameBufferSet {
    fn default() -> Self {
        Self::new()
    }
}
