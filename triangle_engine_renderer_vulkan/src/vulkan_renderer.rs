/// VulkanRenderer - the triangle sample assembled over the frame loop
///
/// Wires GpuContext, VulkanFrameDevice, Swapchain and TriangleStrategy into
/// one `FrameLoop` and forwards window events to it.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;
use triangle_engine::triangle::{Config, Result};
use triangle_engine::triangle::frame::{FrameLoop, FrameStatus};

use crate::vulkan_context::GpuContext;
use crate::vulkan_debug::ValidationStats;
use crate::vulkan_frame_device::VulkanFrameDevice;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_triangle::TriangleStrategy;

/// Frame loop over the Vulkan backend
pub type VulkanFrameLoop = FrameLoop<VulkanFrameDevice, Swapchain, TriangleStrategy>;

pub struct VulkanRenderer {
    frame_loop: VulkanFrameLoop,
    ctx: Arc<GpuContext>,
}

impl VulkanRenderer {
    /// Bootstrap Vulkan for `window` and prepare the first chain
    ///
    /// `config.width` and `config.height` should be the window's current
    /// inner size. A zero size is accepted; frames are skipped until
    /// `on_resize` reports a usable one.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &Config) -> Result<Self> {
        let strategy = TriangleStrategy::new(&config.shader_dir);
        let ctx = GpuContext::new(window, config, &strategy)?;
        let device = VulkanFrameDevice::new(Arc::clone(&ctx))?;
        let swapchain = Swapchain::new(Arc::clone(&ctx))?;
        let frame_loop = FrameLoop::new(device, swapchain, strategy, config.width, config.height, config.vsync)?;

        Ok(Self { frame_loop, ctx })
    }

    pub fn render_frame(&mut self) -> Result<FrameStatus> {
        self.frame_loop.render_frame()
    }

    /// Model rotation in full turns for the frames that follow
    pub fn set_animation_time(&mut self, turns: f32) {
        self.frame_loop.strategy_mut().set_animation_time(turns);
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.frame_loop.on_resize(width, height);
    }

    pub fn on_close_requested(&mut self) {
        self.frame_loop.on_close_requested();
    }

    /// Wait for the GPU and release every frame resource
    pub fn shutdown(&mut self) -> Result<()> {
        self.frame_loop.shutdown()
    }

    pub fn frame_loop(&self) -> &VulkanFrameLoop {
        &self.frame_loop
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    pub fn validation_stats(&self) -> Option<ValidationStats> {
        self.ctx.validation_stats()
    }

    pub fn validation_error_ids(&self) -> Vec<(String, u32)> {
        self.ctx.validation_error_ids()
    }

    pub fn print_validation_report(&self) {
        self.ctx.print_validation_report();
    }
}
