/// Draw strategy trait - what gets recorded into each frame

use crate::error::Result;
use crate::render::{Extent2D, FrameDevice, PresentationEngine};

/// Everything a strategy needs to record one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<C, T> {
    /// Ring slot in use; selects per-slot uniform memory and descriptors
    pub slot_index: usize,
    /// Monotonic frame counter
    pub frame_index: u64,
    /// Acquired chain image
    pub image_index: u32,
    /// Extent of the current chain (viewport and scissor)
    pub extent: Extent2D,
    /// Command buffer being recorded
    pub command_buffer: C,
    /// Image to render into
    pub target: T,
}

/// Frame context for a device/presentation pair
pub type DeviceFrameContext<D, P> =
    FrameContext<<D as FrameDevice>::CommandBuffer, <P as PresentationEngine>::Target>;

/// Per-sample customization injected into the frame loop
pub trait DrawStrategy<D: FrameDevice, P: PresentationEngine> {
    /// Adjust the device feature set before the logical device is created
    fn configure_features(&self, _features: &mut D::Features) -> Result<()> {
        Ok(())
    }

    /// Create GPU resources; `slot_count` per-frame copies are needed
    fn prepare(&mut self, device: &D, presentation: &P, slot_count: usize) -> Result<()>;

    /// Write this slot's per-frame data and record the draw
    ///
    /// Called between `begin_commands` and `end_commands`, after the slot's
    /// fence has been observed signaled.
    fn record_draw(&mut self, device: &D, frame: &DeviceFrameContext<D, P>) -> Result<()>;

    /// Release GPU resources. The device is idle.
    fn destroy(&mut self, device: &D);
}
