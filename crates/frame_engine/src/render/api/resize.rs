//! Swap-chain rebuild coordination
//!
//! State machine that tears down and rebuilds the surface-dependent
//! resources in place when the presentation target goes stale. Render
//! pass, pipeline, command pool, and the sync ring are deliberately left
//! alone: they are format/extent-agnostic in this design, and excluding
//! them keeps a resize from re-triggering pipeline compilation.

use crate::render::api::frame_device::FrameDevice;
use crate::render::RenderResult;

/// Coordinator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeState {
    /// Normal operation.
    Stable,
    /// A rebuild has been requested and will run before the next frame renders.
    Pending,
    /// Teardown/recreation in progress.
    Rebuilding,
}

/// Tears down and rebuilds the swap chain and framebuffers in place
///
/// Two independent triggers funnel into the same `Pending` transition: a
/// stale status from acquire/present, and an external window-resize
/// notification. Funneling both through one flag avoids double-rebuild
/// races when they fire in the same frame.
pub struct ResizeCoordinator {
    state: ResizeState,
}

impl ResizeCoordinator {
    /// Create a coordinator in the `Stable` state
    pub fn new() -> Self {
        Self {
            state: ResizeState::Stable,
        }
    }

    /// Current state
    pub fn state(&self) -> ResizeState {
        self.state
    }

    /// Request a rebuild before the next rendered frame
    ///
    /// Idempotent: a second trigger while one is already pending is a no-op.
    pub fn request_rebuild(&mut self) {
        if self.state == ResizeState::Stable {
            self.state = ResizeState::Pending;
        }
    }

    /// Whether a rebuild is due
    pub fn is_pending(&self) -> bool {
        self.state == ResizeState::Pending
    }

    /// Run the teardown/recreation sequence
    ///
    /// 1. Wait until the drawable has nonzero area (a minimized window's
    ///    surface is not renderable). The wait is driven by window events
    ///    rather than a tight poll.
    /// 2. Drain all in-flight GPU work. The idle wait is the sole
    ///    mutual-exclusion mechanism here: no frame submission exists while
    ///    shared surface state is mutated.
    /// 3. Destroy and recreate framebuffers and swap chain, in that order,
    ///    against the existing render pass.
    ///
    /// Recreation failure is fatal and propagates; there is no retry.
    pub fn rebuild<D: FrameDevice>(&mut self, device: &mut D) -> RenderResult<()> {
        self.state = ResizeState::Rebuilding;
        log::debug!("Rebuilding swap chain resources...");

        loop {
            let (width, height) = device.surface_extent();
            if width > 0 && height > 0 {
                break;
            }
            log::debug!("Surface has zero area, waiting for window events");
            device.wait_surface_change();
        }

        device.wait_idle()?;
        device.rebuild_surface()?;

        self.state = ResizeState::Stable;
        log::debug!(
            "Swap chain rebuilt with {} images",
            device.image_count()
        );
        Ok(())
    }
}

impl Default for ResizeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::frame_device::testing::{Call, FakeFrameDevice};
    use crate::render::RenderError;

    #[test]
    fn starts_stable() {
        let coordinator = ResizeCoordinator::new();
        assert_eq!(coordinator.state(), ResizeState::Stable);
        assert!(!coordinator.is_pending());
    }

    #[test]
    fn both_triggers_funnel_into_one_pending() {
        let mut coordinator = ResizeCoordinator::new();
        // A stale present status and a window notification in the same frame.
        coordinator.request_rebuild();
        coordinator.request_rebuild();
        assert_eq!(coordinator.state(), ResizeState::Pending);

        let mut device = FakeFrameDevice::new(2, 3);
        coordinator.rebuild(&mut device).unwrap();
        assert_eq!(device.count(|c| *c == Call::Rebuild), 1);
        assert_eq!(coordinator.state(), ResizeState::Stable);
    }

    #[test]
    fn round_trip_returns_to_stable() {
        let mut coordinator = ResizeCoordinator::new();
        let mut device = FakeFrameDevice::new(2, 3);

        coordinator.request_rebuild();
        assert_eq!(coordinator.state(), ResizeState::Pending);
        coordinator.rebuild(&mut device).unwrap();
        assert_eq!(coordinator.state(), ResizeState::Stable);

        // Drain-first discipline: device idle before any teardown.
        assert_eq!(device.calls, vec![Call::WaitIdle, Call::Rebuild]);
    }

    #[test]
    fn zero_area_surface_blocks_recreation() {
        let mut coordinator = ResizeCoordinator::new();
        let mut device = FakeFrameDevice::new(2, 3);
        device.extent = (0, 0);
        device.extent_script = [(0, 0), (0, 0), (1280, 720)].into();

        coordinator.request_rebuild();
        coordinator.rebuild(&mut device).unwrap();

        // Three condition waits before the extent became nonzero, and no
        // teardown happened while the surface was zero-area.
        assert_eq!(device.count(|c| *c == Call::WaitSurfaceChange), 3);
        let first_wait_idle = device.calls.iter().position(|c| *c == Call::WaitIdle).unwrap();
        let last_surface_wait = device
            .calls
            .iter()
            .rposition(|c| *c == Call::WaitSurfaceChange)
            .unwrap();
        assert!(last_surface_wait < first_wait_idle);
        assert_eq!(coordinator.state(), ResizeState::Stable);
    }

    #[test]
    fn recreation_failure_is_fatal() {
        let mut coordinator = ResizeCoordinator::new();
        let mut device = FakeFrameDevice::new(2, 3);
        device.rebuild_error = Some(RenderError::SwapchainCreation("surface gone".into()));

        coordinator.request_rebuild();
        let err = coordinator.rebuild(&mut device).unwrap_err();
        assert!(matches!(err, RenderError::SwapchainCreation(_)));
        // Not stable: the coordinator never pretends the chain is usable.
        assert_eq!(coordinator.state(), ResizeState::Rebuilding);
    }

    #[test]
    fn rebuild_updates_image_count() {
        let mut coordinator = ResizeCoordinator::new();
        let mut device = FakeFrameDevice::new(2, 3);
        device.rebuild_image_count = Some(4);

        coordinator.request_rebuild();
        coordinator.rebuild(&mut device).unwrap();
        assert_eq!(device.image_count(), 4);
    }
}
