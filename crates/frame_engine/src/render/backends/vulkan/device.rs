//! Vulkan implementation of the frame device seam
//!
//! Composes the sync ring, swap chain, framebuffer set, and command
//! pipeline behind the [`FrameDevice`] trait. All externally owned handles
//! arrive through [`RenderCollaborators`]; nothing here bootstraps or
//! mutates them.

use ash::extensions::khr::Surface;
use ash::vk;

use crate::render::api::frame_device::{Acquire, FrameDevice, FrameSlot, SurfaceStatus};
use crate::render::backends::vulkan::commands::{CommandSubmissionPipeline, DrawInputs};
use crate::render::backends::vulkan::framebuffer::FrameBufferSet;
use crate::render::backends::vulkan::swapchain::{AcquiredIndex, SwapchainManager};
use crate::render::backends::vulkan::sync::FrameSyncRing;
use crate::render::backends::vulkan::VulkanError;
use crate::render::config::RendererConfig;
use crate::render::window::Window;
use crate::render::RenderResult;

/// Pre-initialized handles the core consumes
///
/// All of these are created before the core starts and destroyed only
/// after [`FrameLoop::shutdown`](crate::render::FrameLoop::shutdown)
/// returns. The core uses them read-only.
pub struct RenderCollaborators {
    /// Instance the device was created from
    pub instance: ash::Instance,
    /// Logical device
    pub device: ash::Device,
    /// Physical device backing the logical device
    pub physical_device: vk::PhysicalDevice,
    /// Presentation surface
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader for capability queries
    pub surface_loader: Surface,
    /// Queue receiving draw submissions
    pub graphics_queue: vk::Queue,
    /// Queue receiving present requests; may equal `graphics_queue`
    pub present_queue: vk::Queue,
    /// Family index the command pool allocates against
    pub graphics_queue_family: u32,
    /// Fixed render pass every framebuffer binds to
    pub render_pass: vk::RenderPass,
    /// Pipeline, layout, and geometry handles recorded each frame
    pub draw: DrawInputs,
}

/// Frame device over real Vulkan hardware
///
/// Field order is load-bearing: drop runs top to bottom, which releases
/// sync objects, then the command pool, then framebuffers, then the swap
/// chain, leaving the collaborator-owned render pass and pipeline for the
/// caller. This is creation order reversed.
pub struct VulkanFrameDevice {
    sync: FrameSyncRing,
    commands: CommandSubmissionPipeline,
    framebuffers: FrameBufferSet,
    swapchain: SwapchainManager,
    collaborators: RenderCollaborators,
    window: Window,
    fence_timeout_ns: u64,
    prefer_mailbox: bool,
}

impl VulkanFrameDevice {
    /// Build the core against pre-initialized collaborators
    pub fn new(
        collaborators: RenderCollaborators,
        window: Window,
        config: &RendererConfig,
    ) -> RenderResult<Self> {
        log::debug!(
            "Creating Vulkan frame device for '{}' with {} frames in flight",
            config.application_name,
            config.max_frames_in_flight
        );

        let (width, height) = window.get_framebuffer_size();
        let swapchain = SwapchainManager::new(
            &collaborators.instance,
            collaborators.device.clone(),
            collaborators.physical_device,
            collaborators.surface,
            &collaborators.surface_loader,
            vk::Extent2D { width, height },
            config.prefer_mailbox,
        )?;

        let mut framebuffers = FrameBufferSet::new();
        framebuffers.rebuild(
            &collaborators.device,
            swapchain.image_views(),
            collaborators.render_pass,
            swapchain.extent()?,
        )?;

        let commands = CommandSubmissionPipeline::new(
            collaborators.device.clone(),
            collaborators.graphics_queue_family,
            config.max_frames_in_flight,
            config.clear_color,
        )?;
        let sync = FrameSyncRing::new(&collaborators.device, config.max_frames_in_flight)?;

        Ok(Self {
            sync,
            commands,
            framebuffers,
            swapchain,
            collaborators,
            window,
            fence_timeout_ns: config.fence_timeout_ns,
            prefer_mailbox: config.prefer_mailbox,
        })
    }

    /// Borrow the window collaborator
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Mutable access to the window collaborator
    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    /// Current swap-chain format, for callers validating pipeline compatibility
    pub fn surface_format(&self) -> RenderResult<vk::SurfaceFormatKHR> {
        Ok(self.swapchain.format()?)
    }
}

impl FrameDevice for VulkanFrameDevice {
    fn slot_count(&self) -> usize {
        self.sync.slot_count()
    }

    fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    fn wait_for_slot(&mut self, slot: FrameSlot) -> RenderResult<()> {
        self.sync.wait_for_slot(slot, self.fence_timeout_ns)?;
        Ok(())
    }

    fn reset_slot(&mut self, slot: FrameSlot) -> RenderResult<()> {
        self.sync.reset_slot(slot)?;
        Ok(())
    }

    fn acquire_image(&mut self, slot: FrameSlot) -> RenderResult<Acquire> {
        let image_available = self.sync.slot(slot).image_available.handle();
        let acquired = self
            .swapchain
            .acquire_next(image_available, self.fence_timeout_ns)?;

        Ok(match acquired {
            AcquiredIndex::Ready(index) => Acquire::Image(index),
            AcquiredIndex::Suboptimal(index) => Acquire::Suboptimal(index),
            AcquiredIndex::OutOfDate => Acquire::OutOfDate,
        })
    }

    fn record_frame(&mut self, slot: FrameSlot, image_index: u32) -> RenderResult<()> {
        // Generation drift between the chain and the framebuffer set is a
        // bug in the rebuild sequencing, not a runtime condition.
        debug_assert_eq!(self.framebuffers.len(), self.swapchain.image_count());

        let framebuffer = self.framebuffers.handle(image_index as usize);
        self.commands.record(
            slot,
            framebuffer,
            self.collaborators.render_pass,
            self.swapchain.extent()?,
            &self.collaborators.draw,
        )?;
        Ok(())
    }

    fn submit_frame(&mut self, slot: FrameSlot) -> RenderResult<()> {
        self.commands.submit(
            slot,
            self.collaborators.graphics_queue,
            self.sync.slot(slot),
        )?;
        Ok(())
    }

    fn present_image(&mut self, slot: FrameSlot, image_index: u32) -> RenderResult<SurfaceStatus> {
        let render_finished = self.sync.slot(slot).render_finished.handle();
        let status = self.swapchain.present(
            self.collaborators.present_queue,
            render_finished,
            image_index,
        )?;
        Ok(status)
    }

    fn surface_extent(&self) -> (u32, u32) {
        self.window.get_framebuffer_size()
    }

    fn wait_surface_change(&mut self) {
        self.window.wait_events();
    }

    fn wait_idle(&mut self) -> RenderResult<()> {
        unsafe {
            self.collaborators
                .device
                .device_wait_idle()
                .map_err(VulkanError::Api)?;
        }
        Ok(())
    }

    fn rebuild_surface(&mut self) -> RenderResult<()> {
        // Caller (the resize coordinator) has already drained the device,
        // so nothing in flight targets the old chain.
        self.framebuffers.destroy();
        self.swapchain.destroy();

        let (width, height) = self.window.get_framebuffer_size();
        self.swapchain = SwapchainManager::new(
            &self.collaborators.instance,
            self.collaborators.device.clone(),
            self.collaborators.physical_device,
            self.collaborators.surface,
            &self.collaborators.surface_loader,
            vk::Extent2D { width, height },
            self.prefer_mailbox,
        )?;

        self.framebuffers.rebuild(
            &self.collaborators.device,
            self.swapchain.image_views(),
            self.collaborators.render_pass,
            self.swapchain.extent()?,
        )?;

        Ok(())
    }
}
