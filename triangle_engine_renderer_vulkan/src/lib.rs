/*!
# Triangle Engine - Vulkan Backend

Vulkan implementation of the triangle engine traits.

This crate implements `PresentationEngine`, `FrameDevice` and `DrawStrategy`
using the Ash library for Vulkan bindings and gpu-allocator for memory
management, then assembles them into [`triangle::VulkanRenderer`].

Requires a Vulkan 1.3 GPU (dynamic rendering and synchronization2).
*/

// Bootstrap and shared services
mod vulkan_error;
mod vulkan_debug;
mod vulkan_context;

// Frame loop backends
mod vulkan_surface;
mod vulkan_swapchain;
mod vulkan_frame_device;

// Triangle resources
mod vulkan_shader;
mod vulkan_buffer;
mod vulkan_triangle;
mod vulkan_renderer;

pub mod triangle {
    pub use crate::vulkan_renderer::{VulkanFrameLoop, VulkanRenderer};
    pub use crate::vulkan_context::{DeviceFeatures, ExtensionTable, FeatureSet, GpuContext, GpuInfo};
    pub use crate::vulkan_frame_device::VulkanFrameDevice;
    pub use crate::vulkan_swapchain::{RenderTarget, Swapchain};
    pub use crate::vulkan_surface::{negotiate, SwapchainSettings};
    pub use crate::vulkan_triangle::{TriangleStrategy, CLEAR_COLOR};
    pub use crate::vulkan_buffer::Buffer;
    pub use crate::vulkan_shader::{load_spirv, shader_path, ShaderModule};
    pub use crate::vulkan_debug::{DebugConfig, DebugState, ValidationStats};
}
