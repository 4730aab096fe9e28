/// Presentation engine trait - the chain of presentable images

use crate::error::Result;

/// Size of a presentable image in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (minimized window)
    pub const fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, 1.0 for a zero height
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Result of asking the presentation engine for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image has been reserved. It is safe to write once the ready
    /// signal passed to `acquire_next` fires on the GPU.
    Acquired {
        image_index: u32,
        /// The chain still works but no longer matches the surface exactly
        suboptimal: bool,
    },
    /// The chain no longer matches the surface; reconfigure before rendering
    Stale,
}

/// Result of queueing an image for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// The chain no longer matches the surface; reconfigure on the next frame
    Stale,
}

/// Presentation engine
///
/// Negotiates an image chain with the display system and hands back images
/// ready to render into. Owns the chain and its views; the surface itself is
/// only referenced.
pub trait PresentationEngine {
    /// GPU-side signal type (a semaphore)
    type Semaphore: Copy;

    /// What a draw needs to render into one chain image
    type Target: Copy;

    /// (Re)create the image chain for the requested size
    ///
    /// Returns the extent actually chosen, which may differ from the request.
    fn configure(&mut self, width: u32, height: u32, vsync: bool) -> Result<Extent2D>;

    /// Reserve the next image, blocking at most `timeout` nanoseconds
    ///
    /// `ready_signal` fires once the image may be written by the GPU.
    fn acquire_next(&mut self, ready_signal: Self::Semaphore, timeout: u64) -> Result<AcquireOutcome>;

    /// Queue `image_index` for display once `wait_signal` fires
    fn present(&mut self, image_index: u32, wait_signal: Self::Semaphore) -> Result<PresentOutcome>;

    /// Release all views, then the chain. Safe to call more than once.
    fn teardown(&mut self);

    /// Extent of the current chain
    fn extent(&self) -> Extent2D;

    /// Number of images in the current chain
    fn image_count(&self) -> usize;

    /// Render target for a chain image
    fn target(&self, image_index: u32) -> Result<Self::Target>;
}
