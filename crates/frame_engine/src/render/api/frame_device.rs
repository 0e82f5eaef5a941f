//! Device seam for the frame protocol
//!
//! This trait covers exactly the per-frame operations the loop and the
//! resize coordinator perform. Each component receives the handles it
//! needs through its constructor rather than a shared context pointer,
//! which keeps the coupling explicit and makes the protocol testable
//! against a fake device.

use crate::render::RenderResult;

/// Rotating index selecting which sync/command-buffer set to use
///
/// Always in `[0, slot_count)`. Advanced by the frame loop after every
/// presented frame, independent of which swap-chain image was acquired.
pub type FrameSlot = usize;

/// Presentation-layer verdict on the swap chain
///
/// Both non-`Ready` values are normal control flow, never errors. The two
/// staleness signals carry different urgency: `OutOfDate` means the chain
/// is unusable and must be rebuilt before rendering, while `Suboptimal`
/// means this frame may still present but the chain should be rebuilt
/// afterwards. Drivers differ on which code they report at acquire vs.
/// present time, so both are checked at both points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// Chain matches the surface; carry on.
    Ready,
    /// Usable for this frame, but rebuild once it has presented.
    Suboptimal,
    /// Chain no longer matches the surface; rebuild now.
    OutOfDate,
}

/// Result of acquiring the next presentable image
///
/// An acquired index is only valid until the chain is rebuilt; callers must
/// discard it immediately when a rebuild happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// Image acquired and the chain is current.
    Image(u32),
    /// Image acquired, but the chain should be rebuilt after presenting.
    Suboptimal(u32),
    /// No image; the chain must be rebuilt before rendering.
    OutOfDate,
}

/// Per-frame GPU operations consumed by the frame loop
///
/// Implemented for real hardware by
/// [`VulkanFrameDevice`](crate::render::VulkanFrameDevice).
pub trait FrameDevice {
    /// Number of frame slots (frames in flight)
    fn slot_count(&self) -> usize;

    /// Number of images in the current swap chain
    ///
    /// Determined by the presentation layer; independent of `slot_count`.
    fn image_count(&self) -> usize;

    /// Block until the slot's previous submission has fully retired
    ///
    /// Must return before the slot's command buffer is reset or its
    /// image-available semaphore is reused.
    fn wait_for_slot(&mut self, slot: FrameSlot) -> RenderResult<()>;

    /// Clear the slot's fence
    ///
    /// Only called once new work is guaranteed to be submitted for the slot;
    /// a speculatively reset fence that nothing signals would deadlock the
    /// next wait.
    fn reset_slot(&mut self, slot: FrameSlot) -> RenderResult<()>;

    /// Acquire the next swap-chain image, signaling the slot's semaphore
    fn acquire_image(&mut self, slot: FrameSlot) -> RenderResult<Acquire>;

    /// Reset and re-record the slot's command buffer against `image_index`
    fn record_frame(&mut self, slot: FrameSlot, image_index: u32) -> RenderResult<()>;

    /// Submit the slot's recorded buffer to the graphics queue
    ///
    /// Waits on the slot's image-available semaphore before color output and
    /// signals its render-finished semaphore plus fence on completion.
    fn submit_frame(&mut self, slot: FrameSlot) -> RenderResult<()>;

    /// Queue the image for presentation, waiting on render-finished
    fn present_image(&mut self, slot: FrameSlot, image_index: u32) -> RenderResult<SurfaceStatus>;

    /// Current drawable size in pixels; (0, 0) while minimized
    fn surface_extent(&self) -> (u32, u32);

    /// Block until the window system reports a surface change
    ///
    /// Condition wait used while the surface has zero area; returns when new
    /// window events arrive rather than spinning on the size query.
    fn wait_surface_change(&mut self);

    /// Block until all queued GPU work has drained
    fn wait_idle(&mut self) -> RenderResult<()>;

    /// Tear down and recreate the surface-dependent resources
    ///
    /// Destroys framebuffers then the swap chain, and recreates both against
    /// the current surface extent. The render pass, pipeline, command pool,
    /// and sync ring are untouched. Callers guarantee the device is idle.
    fn rebuild_surface(&mut self) -> RenderResult<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable fake device for protocol tests

    use std::collections::VecDeque;

    use super::{Acquire, FrameDevice, FrameSlot, SurfaceStatus};
    use crate::render::{RenderError, RenderResult};

    /// One recorded call against the fake device
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Call {
        Wait(FrameSlot),
        Reset(FrameSlot),
        Acquire(FrameSlot),
        Record(FrameSlot, u32),
        Submit(FrameSlot),
        Present(FrameSlot, u32),
        WaitIdle,
        WaitSurfaceChange,
        Rebuild,
    }

    /// Fake device that replays scripted statuses and logs every call
    pub struct FakeFrameDevice {
        pub slot_count: usize,
        pub image_count: usize,
        pub extent: (u32, u32),
        /// Extents applied one at a time by `wait_surface_change`
        pub extent_script: VecDeque<(u32, u32)>,
        /// Acquire results consumed in order; `Ready` with rotating indices after
        pub acquire_script: VecDeque<Acquire>,
        /// Present statuses consumed in order; `Ready` after
        pub present_script: VecDeque<SurfaceStatus>,
        /// Submit results consumed in order; `Ok` after
        pub submit_script: VecDeque<RenderResult<()>>,
        /// Image count installed by the next rebuild
        pub rebuild_image_count: Option<usize>,
        /// Error returned by the next rebuild
        pub rebuild_error: Option<RenderError>,
        pub calls: Vec<Call>,
        next_image: u32,
    }

    impl FakeFrameDevice {
        pub fn new(slot_count: usize, image_count: usize) -> Self {
            Self {
                slot_count,
                image_count,
                extent: (800, 600),
                extent_script: VecDeque::new(),
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                submit_script: VecDeque::new(),
                rebuild_image_count: None,
                rebuild_error: None,
                calls: Vec::new(),
                next_image: 0,
            }
        }

        pub fn count(&self, matcher: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| matcher(c)).count()
        }
    }

    impl FrameDevice for FakeFrameDevice {
        fn slot_count(&self) -> usize {
            self.slot_count
        }

        fn image_count(&self) -> usize {
            self.image_count
        }

        fn wait_for_slot(&mut self, slot: FrameSlot) -> RenderResult<()> {
            self.calls.push(Call::Wait(slot));
            Ok(())
        }

        fn reset_slot(&mut self, slot: FrameSlot) -> RenderResult<()> {
            self.calls.push(Call::Reset(slot));
            Ok(())
        }

        fn acquire_image(&mut self, slot: FrameSlot) -> RenderResult<Acquire> {
            self.calls.push(Call::Acquire(slot));
            if let Some(scripted) = self.acquire_script.pop_front() {
                return Ok(scripted);
            }
            let index = self.next_image;
            self.next_image = (self.next_image + 1) % self.image_count as u32;
            Ok(Acquire::Image(index))
        }

        fn record_frame(&mut self, slot: FrameSlot, image_index: u32) -> RenderResult<()> {
            self.calls.push(Call::Record(slot, image_index));
            Ok(())
        }

        fn submit_frame(&mut self, slot: FrameSlot) -> RenderResult<()> {
            self.calls.push(Call::Submit(slot));
            self.submit_script.pop_front().unwrap_or(Ok(()))
        }

        fn present_image(&mut self, slot: FrameSlot, image_index: u32) -> RenderResult<SurfaceStatus> {
            self.calls.push(Call::Present(slot, image_index));
            Ok(self.present_script.pop_front().unwrap_or(SurfaceStatus::Ready))
        }

        fn surface_extent(&self) -> (u32, u32) {
            self.extent
        }

        fn wait_surface_change(&mut self) {
            self.calls.push(Call::WaitSurfaceChange);
            if let Some(extent) = self.extent_script.pop_front() {
                self.extent = extent;
            }
        }

        fn wait_idle(&mut self) -> RenderResult<()> {
            self.calls.push(Call::WaitIdle);
            Ok(())
        }

        fn rebuild_surface(&mut self) -> RenderResult<()> {
            self.calls.push(Call::Rebuild);
            if let Some(err) = self.rebuild_error.take() {
                return Err(err);
            }
            if let Some(count) = self.rebuild_image_count.take() {
                self.image_count = count;
            }
            self.next_image = 0;
            Ok(())
        }
    }
}
