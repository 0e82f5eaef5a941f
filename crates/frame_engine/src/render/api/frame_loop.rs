//! Steady-state frame driver
//!
//! Composes the frame device and the resize coordinator into the per-frame
//! cycle: wait for the slot, acquire an image, record and submit, present,
//! advance. Surface staleness reported by acquire or present is routed
//! through the coordinator and never escapes as an error.

use crate::render::api::frame_device::{Acquire, FrameDevice, FrameSlot, SurfaceStatus};
use crate::render::api::resize::ResizeCoordinator;
use crate::render::RenderResult;

/// Drives one acquire/record/submit/present cycle per call
///
/// A single logical thread calls into the loop; all GPU concurrency is
/// mediated by the device's semaphores and fences. At most `slot_count`
/// command buffers are ever outstanding on the graphics queue.
pub struct FrameLoop<D: FrameDevice> {
    device: D,
    resize: ResizeCoordinator,
    current_slot: FrameSlot,
}

impl<D: FrameDevice> FrameLoop<D> {
    /// Create a frame loop over an initialized device
    pub fn new(device: D) -> Self {
        Self {
            device,
            resize: ResizeCoordinator::new(),
            current_slot: 0,
        }
    }

    /// Access the underlying device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the underlying device
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Slot the next frame will use
    pub fn current_slot(&self) -> FrameSlot {
        self.current_slot
    }

    /// Caller hook for window-system resize notifications
    ///
    /// Feeds the same rebuild trigger as a stale acquire/present status, so
    /// a notification and a stale frame in the same cycle rebuild once.
    pub fn on_surface_resized(&mut self) {
        self.resize.request_rebuild();
    }

    /// Execute one full frame cycle
    ///
    /// Returns normally when the frame presented, or when it was skipped for
    /// a swap-chain rebuild (the slot is not advanced in that case, since
    /// its fence was never reset). Any returned error is fatal.
    pub fn run_frame(&mut self) -> RenderResult<()> {
        let slot = self.current_slot;

        // The slot's previous submission must retire before its command
        // buffer or image-available semaphore can be touched again.
        self.device.wait_for_slot(slot)?;

        if self.resize.is_pending() {
            self.resize.rebuild(&mut self.device)?;
        }

        let (image_index, mut rebuild_after_present) = match self.device.acquire_image(slot)? {
            Acquire::Image(index) => (index, false),
            Acquire::Suboptimal(index) => (index, true),
            Acquire::OutOfDate => {
                // The index is unusable and nothing was submitted this
                // cycle; rebuild now and try again next frame with the
                // same slot.
                log::warn!("Swap chain out of date at acquire, rebuilding");
                self.resize.request_rebuild();
                self.resize.rebuild(&mut self.device)?;
                return Ok(());
            }
        };

        // New work is now guaranteed for this slot, so the fence may be
        // cleared without risking a wait nothing will signal.
        self.device.reset_slot(slot)?;
        self.device.record_frame(slot, image_index)?;
        self.device.submit_frame(slot)?;

        match self.device.present_image(slot, image_index)? {
            SurfaceStatus::Ready => {}
            SurfaceStatus::Suboptimal | SurfaceStatus::OutOfDate => {
                log::warn!("Swap chain stale at present, rebuilding");
                rebuild_after_present = true;
            }
        }

        if rebuild_after_present {
            self.resize.request_rebuild();
            self.resize.rebuild(&mut self.device)?;
        }

        self.current_slot = (slot + 1) % self.device.slot_count();
        Ok(())
    }

    /// Drain the GPU and release all core-owned resources
    ///
    /// Consumes the loop; the device's resources are released by scope in
    /// strict reverse-acquisition order. Must run before the collaborators
    /// handed to the device are destroyed.
    pub fn shutdown(mut self) -> RenderResult<()> {
        log::debug!("Frame loop shutting down, draining device");
        self.device.wait_idle()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::frame_device::testing::{Call, FakeFrameDevice};
    use crate::render::RenderError;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn slots_waited(device: &FakeFrameDevice) -> Vec<FrameSlot> {
        device
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Wait(slot) => Some(*slot),
                _ => None,
            })
            .collect()
    }

    /// Ten frames, two slots, three images: ten full cycles with fence
    /// waits alternating 0,1,0,1,...
    #[test]
    fn steady_state_alternates_slots() {
        init_logs();
        let mut frame_loop = FrameLoop::new(FakeFrameDevice::new(2, 3));

        for _ in 0..10 {
            frame_loop.run_frame().unwrap();
        }

        let device = frame_loop.device();
        assert_eq!(slots_waited(device), vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(device.count(|c| matches!(c, Call::Acquire(_))), 10);
        assert_eq!(device.count(|c| matches!(c, Call::Submit(_))), 10);
        assert_eq!(device.count(|c| matches!(c, Call::Present(..))), 10);
        assert_eq!(device.count(|c| *c == Call::Rebuild), 0);
    }

    /// The fence is always waited on before the slot's buffer is reset or
    /// re-recorded.
    #[test]
    fn wait_precedes_reset_and_record() {
        init_logs();
        let mut frame_loop = FrameLoop::new(FakeFrameDevice::new(2, 3));
        for _ in 0..6 {
            frame_loop.run_frame().unwrap();
        }

        let calls = &frame_loop.device().calls;
        for (i, call) in calls.iter().enumerate() {
            if let Call::Reset(slot) = call {
                let waited_before = calls[..i]
                    .iter()
                    .rev()
                    .any(|c| *c == Call::Wait(*slot));
                assert!(waited_before, "slot {slot} reset without a prior wait");
            }
        }
    }

    /// Out-of-date at acquire on frame 5: no submit or present that cycle,
    /// one full rebuild, and the next frame proceeds normally against a
    /// possibly different image count.
    #[test]
    fn out_of_date_acquire_skips_frame_and_rebuilds() {
        init_logs();
        let mut device = FakeFrameDevice::new(2, 3);
        device.acquire_script = [
            Acquire::Image(0),
            Acquire::Image(1),
            Acquire::Image(2),
            Acquire::Image(0),
            Acquire::OutOfDate,
        ]
        .into();
        device.rebuild_image_count = Some(2);
        let mut frame_loop = FrameLoop::new(device);

        for _ in 0..7 {
            frame_loop.run_frame().unwrap();
        }

        let device = frame_loop.device();
        // Frame 5 acquired but never submitted or presented.
        assert_eq!(device.count(|c| matches!(c, Call::Acquire(_))), 7);
        assert_eq!(device.count(|c| matches!(c, Call::Submit(_))), 6);
        assert_eq!(device.count(|c| matches!(c, Call::Present(..))), 6);
        assert_eq!(device.count(|c| *c == Call::Rebuild), 1);
        assert_eq!(device.image_count(), 2);

        // The skipped cycle did not reset the slot fence.
        assert_eq!(device.count(|c| matches!(c, Call::Reset(_))), 6);
    }

    /// A suboptimal acquire still renders the frame and rebuilds afterwards.
    #[test]
    fn suboptimal_acquire_renders_then_rebuilds() {
        init_logs();
        let mut device = FakeFrameDevice::new(2, 3);
        device.acquire_script = [Acquire::Suboptimal(1)].into();
        let mut frame_loop = FrameLoop::new(device);

        frame_loop.run_frame().unwrap();

        let device = frame_loop.device();
        let present_at = device
            .calls
            .iter()
            .position(|c| matches!(c, Call::Present(..)))
            .expect("frame should present");
        let rebuild_at = device
            .calls
            .iter()
            .position(|c| *c == Call::Rebuild)
            .expect("rebuild should follow");
        assert!(present_at < rebuild_at);
    }

    /// A stale status at present triggers exactly one deferred rebuild.
    #[test]
    fn stale_present_rebuilds_after_frame() {
        init_logs();
        let mut device = FakeFrameDevice::new(2, 3);
        device.present_script = [SurfaceStatus::OutOfDate].into();
        let mut frame_loop = FrameLoop::new(device);

        frame_loop.run_frame().unwrap();
        frame_loop.run_frame().unwrap();

        let device = frame_loop.device();
        assert_eq!(device.count(|c| *c == Call::Rebuild), 1);
        assert_eq!(device.count(|c| matches!(c, Call::Present(..))), 2);
    }

    /// A resize notification and a stale present in the same cycle rebuild
    /// once, not twice.
    #[test]
    fn concurrent_triggers_rebuild_once() {
        init_logs();
        let mut device = FakeFrameDevice::new(2, 3);
        device.present_script = [SurfaceStatus::Suboptimal].into();
        let mut frame_loop = FrameLoop::new(device);

        frame_loop.on_surface_resized();
        frame_loop.run_frame().unwrap();

        // The pending rebuild ran before acquire; the stale present queued
        // and ran a second rebuild within the same call, but each trigger
        // pair collapsed to a single rebuild.
        assert_eq!(frame_loop.device().count(|c| *c == Call::Rebuild), 2);

        let mut device = FakeFrameDevice::new(2, 3);
        device.present_script = [SurfaceStatus::Ready].into();
        let mut frame_loop = FrameLoop::new(device);
        frame_loop.on_surface_resized();
        frame_loop.on_surface_resized();
        frame_loop.run_frame().unwrap();
        assert_eq!(frame_loop.device().count(|c| *c == Call::Rebuild), 1);
    }

    /// Minimized surface: the rebuild blocks on window events and never
    /// attempts recreation while the extent is zero.
    #[test]
    fn minimized_surface_defers_rebuild() {
        init_logs();
        let mut device = FakeFrameDevice::new(2, 3);
        device.extent = (0, 0);
        device.extent_script = [(0, 0), (640, 480)].into();
        let mut frame_loop = FrameLoop::new(device);

        frame_loop.on_surface_resized();
        frame_loop.run_frame().unwrap();

        let device = frame_loop.device();
        assert_eq!(device.count(|c| *c == Call::WaitSurfaceChange), 2);
        let rebuild_at = device.calls.iter().position(|c| *c == Call::Rebuild).unwrap();
        let last_wait = device
            .calls
            .iter()
            .rposition(|c| *c == Call::WaitSurfaceChange)
            .unwrap();
        assert!(last_wait < rebuild_at);
    }

    /// Device loss during submit is fatal: `run_frame` errors and nothing
    /// presents.
    #[test]
    fn device_lost_on_submit_is_fatal() {
        init_logs();
        let mut device = FakeFrameDevice::new(2, 3);
        device.submit_script = [Ok(()), Ok(()), Err(RenderError::DeviceLost)].into();
        let mut frame_loop = FrameLoop::new(device);

        frame_loop.run_frame().unwrap();
        frame_loop.run_frame().unwrap();
        let err = frame_loop.run_frame().unwrap_err();
        assert!(matches!(err, RenderError::DeviceLost));

        let device = frame_loop.device();
        assert_eq!(device.count(|c| matches!(c, Call::Present(..))), 2);
    }

    /// After a rebuild shrinks the chain, every image index recorded or
    /// presented afterwards fits the new generation's bounds.
    #[test]
    fn rebuilt_chain_indices_stay_in_bounds() {
        init_logs();
        let mut device = FakeFrameDevice::new(2, 4);
        device.acquire_script = [Acquire::OutOfDate].into();
        device.rebuild_image_count = Some(2);
        let mut frame_loop = FrameLoop::new(device);

        for _ in 0..6 {
            frame_loop.run_frame().unwrap();
        }

        let device = frame_loop.device();
        assert_eq!(device.image_count(), 2);
        let rebuild_at = device.calls.iter().position(|c| *c == Call::Rebuild).unwrap();
        for call in &device.calls[rebuild_at..] {
            if let Call::Record(_, image) | Call::Present(_, image) = call {
                assert!(
                    (*image as usize) < 2,
                    "index {image} outlived the chain it was acquired from"
                );
            }
        }
    }

    /// Shutdown drains the device exactly once.
    #[test]
    fn shutdown_waits_for_idle() {
        init_logs();
        let mut frame_loop = FrameLoop::new(FakeFrameDevice::new(2, 3));
        frame_loop.run_frame().unwrap();
        // The loop is consumed; the device (and with it every GPU resource)
        // is released when shutdown returns.
        frame_loop.shutdown().unwrap();
    }
}
