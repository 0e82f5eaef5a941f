//! Vulkan synchronization primitives for GPU/CPU coordination
//!
//! RAII wrappers for semaphores and fences, plus the ring of per-slot
//! synchronization sets that paces frames in flight. Semaphores order work
//! on the GPU timeline (image acquisition before color output, rendering
//! before presentation); the fence is the only point where the CPU observes
//! GPU completion.

use ash::{vk, Device};

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// GPU-GPU synchronization primitive with automatic resource management
///
/// Signaled by one queue operation and waited on by another; never visible
/// to the CPU.
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new binary semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device
                .create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// CPU-observable fence with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence, optionally in the signaled state
    ///
    /// Frame fences start signaled so the very first wait on a never-used
    /// slot returns immediately.
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe {
            device
                .create_fence(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, fence })
    }

    /// Block until the fence signals, up to `timeout_ns`
    ///
    /// Expiry surfaces as [`VulkanError::Timeout`] rather than hanging the
    /// calling thread indefinitely.
    pub fn wait(&self, timeout_ns: u64, operation: &str) -> VulkanResult<()> {
        unsafe {
            match self.device.wait_for_fences(&[self.fence], true, timeout_ns) {
                Ok(()) => Ok(()),
                Err(vk::Result::TIMEOUT) => Err(VulkanError::Timeout {
                    operation: operation.to_string(),
                }),
                Err(e) => Err(VulkanError::Api(e)),
            }
        }
    }

    /// Reset the fence to unsignaled
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_fences(&[self.fence])
                .map_err(VulkanError::Api)
        }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects for one frame slot
pub struct FrameSync {
    /// Signaled when the slot's swap-chain image becomes available
    pub image_available: Semaphore,
    /// Signaled when the slot's rendering completes
    pub render_finished: Semaphore,
    /// Signaled when the slot's submission fully retires
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create one slot's synchronization objects
    pub fn new(device: Device) -> VulkanResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }
}

/// Ring of per-slot synchronization sets
///
/// Owns exactly one [`FrameSync`] per frame in flight. The ring is
/// independent of swap-chain generation: it is never rebuilt on resize,
/// only at engine teardown.
pub struct FrameSyncRing {
    slots: Vec<FrameSync>,
}

impl FrameSyncRing {
    /// Create the ring with `slot_count` synchronization sets
    pub fn new(device: &Device, slot_count: usize) -> VulkanResult<Self> {
        log::debug!("Creating frame sync ring with {} slots", slot_count);

        let mut slots = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            slots.push(FrameSync::new(device.clone())?);
        }

        Ok(Self { slots })
    }

    /// Number of slots in the ring
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Borrow one slot's synchronization set
    pub fn slot(&self, slot: usize) -> &FrameSync {
        &self.slots[slot]
    }

    /// Block until the slot's previous submission has retired
    pub fn wait_for_slot(&self, slot: usize, timeout_ns: u64) -> VulkanResult<()> {
        self.slots[slot].in_flight.wait(timeout_ns, "frame fence")
    }

    /// Clear the slot's fence
    ///
    /// Callers reset only once new work is guaranteed for the slot; a fence
    /// reset with nothing submitted to signal it would deadlock the next
    /// wait.
    pub fn reset_slot(&self, slot: usize) -> VulkanResult<()> {
        self.slots[slot].in_flight.reset()
    }
}
