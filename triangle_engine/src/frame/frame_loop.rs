/// Per-frame submission protocol
///
/// Drives one frame at a time through
/// `Idle -> Waiting -> Acquiring -> Recording -> Submitted -> Presenting -> Idle`
/// over a [`FrameRing`] of device slots. The slot fence is the only CPU-side
/// backpressure: a slot is re-recorded only after its previous submission
/// has been observed complete.

use crate::error::{Error, Result};
use crate::frame::FrameRing;
use crate::render::{
    AcquireOutcome, DeviceSlot, DrawStrategy, Extent2D, FrameContext, FrameDevice,
    PresentOutcome, PresentationEngine,
};
use crate::{engine_debug, engine_info, engine_warn};

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Fence wait timeout in nanoseconds. A hung GPU is fatal, so never time out.
pub const FENCE_TIMEOUT: u64 = u64::MAX;

/// Image acquire timeout in nanoseconds
pub const ACQUIRE_TIMEOUT: u64 = u64::MAX;

const SOURCE: &str = "triangle::FrameLoop";

/// Protocol step the loop is in (or failed in)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Waiting,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
}

/// What happened to one `render_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was submitted and presented
    Presented,
    /// Nothing was submitted (zero extent or close requested)
    Skipped,
    /// The image chain was stale; it is reconfigured on the next call
    Stale,
}

/// Frame loop over a device, a presentation engine and a draw strategy
pub struct FrameLoop<D, P, S>
where
    D: FrameDevice,
    P: PresentationEngine<Semaphore = D::Semaphore>,
    S: DrawStrategy<D, P>,
{
    device: D,
    presentation: P,
    strategy: S,
    ring: FrameRing<DeviceSlot<D>>,
    state: FrameState,
    requested: Extent2D,
    vsync: bool,
    needs_reconfigure: bool,
    close_requested: bool,
    released: bool,
}

impl<D, P, S> FrameLoop<D, P, S>
where
    D: FrameDevice,
    P: PresentationEngine<Semaphore = D::Semaphore>,
    S: DrawStrategy<D, P>,
{
    /// Configure the image chain, create the slot ring and prepare the strategy
    ///
    /// A zero `width` or `height` is accepted; the chain is then configured on
    /// the first frame with a non-zero size.
    pub fn new(device: D, mut presentation: P, strategy: S, width: u32, height: u32, vsync: bool) -> Result<Self> {
        let requested = Extent2D::new(width, height);
        let mut needs_reconfigure = true;
        if !requested.is_zero() {
            let extent = presentation.configure(width, height, vsync)?;
            needs_reconfigure = extent.is_zero();
        }

        let mut slots = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            match device.create_slot() {
                Ok(slot) => slots.push(slot),
                Err(e) => {
                    for slot in slots {
                        device.destroy_slot(slot);
                    }
                    presentation.teardown();
                    return Err(e);
                }
            }
        }
        let ring = FrameRing::new(slots)?;

        let mut frame_loop = Self {
            device,
            presentation,
            strategy,
            ring,
            state: FrameState::Idle,
            requested,
            vsync,
            needs_reconfigure,
            close_requested: false,
            released: false,
        };

        // On failure, Drop releases whatever the strategy managed to create
        let slot_count = frame_loop.ring.len();
        frame_loop.strategy.prepare(&frame_loop.device, &frame_loop.presentation, slot_count)?;

        engine_info!(SOURCE, "Frame loop ready: {} frames in flight, extent {}x{}",
            slot_count, frame_loop.presentation.extent().width, frame_loop.presentation.extent().height);
        Ok(frame_loop)
    }

    /// Run one pass of the submission protocol
    pub fn render_frame(&mut self) -> Result<FrameStatus> {
        if self.released {
            return Err(Error::InvalidState("Frame loop has been shut down".to_string()));
        }
        if self.close_requested || self.requested.is_zero() {
            return Ok(FrameStatus::Skipped);
        }
        if self.needs_reconfigure {
            let extent = self.reconfigure()?;
            if extent.is_zero() {
                return Ok(FrameStatus::Skipped);
            }
        }

        let slot = *self.ring.current();
        let slot_index = self.ring.current_index();
        let frame_index = self.ring.frame_index();

        // Waiting
        self.state = FrameState::Waiting;
        self.device.wait_for_fence(slot.fence, FENCE_TIMEOUT)?;

        // Acquiring
        self.state = FrameState::Acquiring;
        let (image_index, suboptimal) = match self.presentation.acquire_next(slot.image_available, ACQUIRE_TIMEOUT)? {
            AcquireOutcome::Acquired { image_index, suboptimal } => (image_index, suboptimal),
            AcquireOutcome::Stale => {
                engine_debug!(SOURCE, "Image chain stale at acquire (frame {})", frame_index);
                self.needs_reconfigure = true;
                self.state = FrameState::Idle;
                return Ok(FrameStatus::Stale);
            }
        };
        // The fence stays signaled until an image is in hand, so a stale
        // acquire never leaves behind a fence nothing will signal
        self.device.reset_fence(slot.fence)?;

        // Recording
        self.state = FrameState::Recording;
        self.device.begin_commands(slot.command_buffer)?;
        let frame = FrameContext {
            slot_index,
            frame_index,
            image_index,
            extent: self.presentation.extent(),
            command_buffer: slot.command_buffer,
            target: self.presentation.target(image_index)?,
        };
        self.strategy.record_draw(&self.device, &frame)?;
        self.device.end_commands(slot.command_buffer)?;

        // Submitted
        self.state = FrameState::Submitted;
        self.device.submit(slot.command_buffer, slot.image_available, slot.render_finished, slot.fence)?;

        // Presenting
        self.state = FrameState::Presenting;
        let presented = self.presentation.present(image_index, slot.render_finished)?;

        self.ring.advance();
        self.state = FrameState::Idle;

        match presented {
            PresentOutcome::Presented if !suboptimal => Ok(FrameStatus::Presented),
            PresentOutcome::Presented => {
                engine_debug!(SOURCE, "Image chain suboptimal (frame {})", frame_index);
                self.needs_reconfigure = true;
                Ok(FrameStatus::Presented)
            }
            PresentOutcome::Stale => {
                engine_debug!(SOURCE, "Image chain stale at present (frame {})", frame_index);
                self.needs_reconfigure = true;
                Ok(FrameStatus::Stale)
            }
        }
    }

    /// Record a new surface size; the chain is rebuilt before the next acquire
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.requested = Extent2D::new(width, height);
        self.needs_reconfigure = true;
    }

    /// Stop rendering. Call [`shutdown`](Self::shutdown) to release resources.
    pub fn on_close_requested(&mut self) {
        self.close_requested = true;
    }

    /// Wait for the device to go idle, then release strategy resources,
    /// slots and the image chain. Runs at most once.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.close_requested = true;
        self.device.wait_idle()?;

        self.strategy.destroy(&self.device);
        for slot in self.ring.drain() {
            self.device.destroy_slot(slot);
        }
        self.presentation.teardown();
        self.released = true;
        self.state = FrameState::Idle;

        engine_info!(SOURCE, "Frame loop shut down after {} frames", self.ring.frame_index());
        Ok(())
    }

    fn reconfigure(&mut self) -> Result<Extent2D> {
        // No in-flight frame may still reference the old chain
        self.device.wait_idle()?;
        let extent = self.presentation.configure(self.requested.width, self.requested.height, self.vsync)?;
        if extent.is_zero() {
            engine_debug!(SOURCE, "Surface reports a zero extent, deferring reconfigure");
            return Ok(extent);
        }
        self.needs_reconfigure = false;
        if extent != self.requested {
            engine_debug!(SOURCE, "Requested {}x{}, surface chose {}x{}",
                self.requested.width, self.requested.height, extent.width, extent.height);
        }
        engine_debug!(SOURCE, "Image chain configured: {} images, {}x{}",
            self.presentation.image_count(), extent.width, extent.height);
        Ok(extent)
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Frames submitted so far
    pub fn frame_index(&self) -> u64 {
        self.ring.frame_index()
    }

    /// Size last requested by the window
    pub fn requested_extent(&self) -> Extent2D {
        self.requested
    }

    pub fn needs_reconfigure(&self) -> bool {
        self.needs_reconfigure
    }

    pub fn is_close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn is_shut_down(&self) -> bool {
        self.released
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }
}

impl<D, P, S> Drop for FrameLoop<D, P, S>
where
    D: FrameDevice,
    P: PresentationEngine<Semaphore = D::Semaphore>,
    S: DrawStrategy<D, P>,
{
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            engine_warn!(SOURCE, "Shutdown during drop failed: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "frame_loop_tests.rs"]
mod tests;
