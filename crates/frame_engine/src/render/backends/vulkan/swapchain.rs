//! Vulkan swap chain management
//!
//! Owns the presentable image chain for a surface/device/extent triple:
//! the swap chain handle, its images and views, and the negotiated
//! format/extent. Images are destroyed and recreated as a batch, never
//! individually; every recreation invalidates all previously acquired
//! image indices.

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Instance};

use crate::render::api::frame_device::SurfaceStatus;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Result of acquiring an image from the chain
///
/// Mirrors [`Acquire`](crate::render::Acquire) at the raw-index level.
pub(crate) enum AcquiredIndex {
    Ready(u32),
    Suboptimal(u32),
    OutOfDate,
}

struct SwapchainResources {
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

/// Swap chain wrapper with idempotent teardown
pub struct SwapchainManager {
    device: Device,
    loader: SwapchainLoader,
    inner: Option<SwapchainResources>,
}

impl SwapchainManager {
    /// Create a swap chain against the current surface state
    ///
    /// Negotiates format, present mode, extent, and image count from the
    /// surface capabilities. Fails with [`VulkanError::SwapchainCreation`]
    /// when no compatible configuration exists, including a zero-area
    /// drawable extent.
    pub fn new(
        instance: &Instance,
        device: Device,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        window_extent: vk::Extent2D,
        prefer_mailbox: bool,
    ) -> VulkanResult<Self> {
        let loader = SwapchainLoader::new(instance, &device);

        let surface_caps = unsafe {
            surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| VulkanError::SwapchainCreation {
                    reason: format!("surface capability query failed: {e:?}"),
                })?
        };

        let surface_formats = unsafe {
            surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| VulkanError::SwapchainCreation {
                    reason: format!("surface format query failed: {e:?}"),
                })?
        };
        let format = choose_surface_format(&surface_formats).ok_or_else(|| {
            VulkanError::SwapchainCreation {
                reason: "surface reports no formats".to_string(),
            }
        })?;

        let present_modes = unsafe {
            surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| VulkanError::SwapchainCreation {
                    reason: format!("present mode query failed: {e:?}"),
                })?
        };
        let present_mode = choose_present_mode(&present_modes, prefer_mailbox);

        let extent = choose_extent(&surface_caps, window_extent);
        if extent.width == 0 || extent.height == 0 {
            return Err(VulkanError::SwapchainCreation {
                reason: "zero-area drawable extent".to_string(),
            });
        }

        let image_count = choose_image_count(&surface_caps);

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(surface_caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let swapchain = unsafe {
            loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| VulkanError::SwapchainCreation {
                    reason: format!("swap chain creation rejected: {e:?}"),
                })?
        };

        let images = unsafe {
            loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };

        let image_views: Result<Vec<_>, _> = images
            .iter()
            .map(|&image| {
                let create_info = vk::ImageViewCreateInfo::builder()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                unsafe { device.create_image_view(&create_info, None) }
            })
            .collect();
        let image_views = image_views.map_err(VulkanError::Api)?;

        log::debug!(
            "Swap chain created: {} images, {:?}, {}x{}",
            image_views.len(),
            format.format,
            extent.width,
            extent.height
        );

        Ok(Self {
            device,
            loader,
            inner: Some(SwapchainResources {
                swapchain,
                image_views,
                format,
                extent,
            }),
        })
    }

    fn resources(&self) -> VulkanResult<&SwapchainResources> {
        self.inner.as_ref().ok_or(VulkanError::InvalidOperation {
            reason: "swap chain used after destroy".to_string(),
        })
    }

    /// Acquire the next presentable image, signaling `image_available`
    ///
    /// Staleness codes are normal control flow: `ERROR_OUT_OF_DATE_KHR`
    /// means the chain is unusable and must be rebuilt before rendering,
    /// `SUBOPTIMAL_KHR` means this frame may still present but the chain
    /// should be rebuilt afterwards.
    pub(crate) fn acquire_next(
        &self,
        image_available: vk::Semaphore,
        timeout_ns: u64,
    ) -> VulkanResult<AcquiredIndex> {
        let resources = self.resources()?;

        match unsafe {
            self.loader.acquire_next_image(
                resources.swapchain,
                timeout_ns,
                image_available,
                vk::Fence::null(),
            )
        } {
            Ok((index, false)) => Ok(AcquiredIndex::Ready(index)),
            Ok((index, true)) => Ok(AcquiredIndex::Suboptimal(index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquiredIndex::OutOfDate),
            Err(vk::Result::TIMEOUT) => Err(VulkanError::Timeout {
                operation: "swap chain image acquire".to_string(),
            }),
            Err(vk::Result::ERROR_DEVICE_LOST) => Err(VulkanError::DeviceLost),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Queue `image_index` for presentation, waiting on `render_finished`
    pub(crate) fn present(
        &self,
        queue: vk::Queue,
        render_finished: vk::Semaphore,
        image_index: u32,
    ) -> VulkanResult<SurfaceStatus> {
        let resources = self.resources()?;

        let wait_semaphores = [render_finished];
        let swapchains = [resources.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.loader.queue_present(queue, &present_info) } {
            Ok(false) => Ok(SurfaceStatus::Ready),
            Ok(true) => Ok(SurfaceStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SurfaceStatus::OutOfDate),
            Err(vk::Result::ERROR_DEVICE_LOST) => Err(VulkanError::DeviceLost),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Release views and the chain handle
    ///
    /// Idempotent: safe on an already-destroyed instance, and `Drop`
    /// delegates here so an owner going out of scope cleans up exactly once.
    pub fn destroy(&mut self) {
        if let Some(resources) = self.inner.take() {
            unsafe {
                for &view in &resources.image_views {
                    self.device.destroy_image_view(view, None);
                }
                self.loader.destroy_swapchain(resources.swapchain, None);
            }
            log::debug!("Swap chain destroyed");
        }
    }

    /// Get the negotiated extent
    pub fn extent(&self) -> VulkanResult<vk::Extent2D> {
        Ok(self.resources()?.extent)
    }

    /// Get the negotiated surface format
    pub fn format(&self) -> VulkanResult<vk::SurfaceFormatKHR> {
        Ok(self.resources()?.format)
    }

    /// Get the image views, one per swap-chain image
    pub fn image_views(&self) -> &[vk::ImageView] {
        self.inner
            .as_ref()
            .map_or(&[], |r| r.image_views.as_slice())
    }

    /// Number of images in the chain; zero once destroyed
    pub fn image_count(&self) -> usize {
        self.inner.as_ref().map_or(0, |r| r.image_views.len())
    }
}

impl Drop for SwapchainManager {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Prefer B8G8R8A8_SRGB with a nonlinear SRGB color space, else the first
/// reported format
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|sf| {
            sf.format == vk::Format::B8G8R8A8_SRGB
                && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX when requested and supported; FIFO is always available
fn choose_present_mode(modes: &[vk::PresentModeKHR], prefer_mailbox: bool) -> vk::PresentModeKHR {
    if prefer_mailbox && modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Use the surface's fixed extent when it has one, otherwise clamp the
/// window's drawable size into the supported range
fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, window_extent: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: window_extent
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: window_extent
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// One more than the minimum, capped by the maximum when the surface has one
fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}
