/// Swapchain negotiation - pure selection rules over surface queries
///
/// Everything here works on the values returned by the surface queries, so
/// the rules can be exercised without a GPU.

use ash::vk;
use triangle_engine::triangle::{Error, Result};

/// Color formats tried in order before falling back to the first reported one
pub const PREFERRED_FORMATS: [vk::Format; 3] = [
    vk::Format::B8G8R8A8_UNORM,
    vk::Format::R8G8B8A8_UNORM,
    vk::Format::A8B8G8R8_UNORM_PACK32,
];

/// Composite alpha modes tried in order
pub const COMPOSITE_ALPHA_ORDER: [vk::CompositeAlphaFlagsKHR; 4] = [
    vk::CompositeAlphaFlagsKHR::OPAQUE,
    vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::INHERIT,
];

/// Parameters for one swapchain creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainSettings {
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
}

/// First reported format found in [`PREFERRED_FORMATS`], else the first reported format
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| PREFERRED_FORMATS.contains(&f.format))
        .or_else(|| formats.first())
        .copied()
}

/// FIFO with vsync. Without vsync MAILBOX, then IMMEDIATE, then FIFO.
///
/// Returns `None` when the surface reports no present modes at all.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR], vsync: bool) -> Option<vk::PresentModeKHR> {
    if modes.is_empty() {
        return None;
    }
    if vsync {
        return Some(vk::PresentModeKHR::FIFO);
    }
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        Some(vk::PresentModeKHR::MAILBOX)
    } else if modes.contains(&vk::PresentModeKHR::IMMEDIATE) {
        Some(vk::PresentModeKHR::IMMEDIATE)
    } else {
        Some(vk::PresentModeKHR::FIFO)
    }
}

/// The surface's current extent when defined, else the request clamped into the allowed range
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum (0 means no maximum)
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

pub fn choose_pre_transform(caps: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if caps.supported_transforms.contains(vk::SurfaceTransformFlagsKHR::IDENTITY) {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        caps.current_transform
    }
}

pub fn choose_composite_alpha(caps: &vk::SurfaceCapabilitiesKHR) -> vk::CompositeAlphaFlagsKHR {
    COMPOSITE_ALPHA_ORDER
        .iter()
        .copied()
        .find(|&alpha| caps.supported_composite_alpha.contains(alpha))
        .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

/// Apply every rule at once
pub fn negotiate(
    caps: &vk::SurfaceCapabilitiesKHR,
    formats: &[vk::SurfaceFormatKHR],
    present_modes: &[vk::PresentModeKHR],
    width: u32,
    height: u32,
    vsync: bool,
) -> Result<SwapchainSettings> {
    let surface_format = choose_surface_format(formats).ok_or_else(|| {
        Error::ConfigurationError("Surface reports no supported formats".to_string())
    })?;
    let present_mode = choose_present_mode(present_modes, vsync).ok_or_else(|| {
        Error::ConfigurationError("Surface reports no present modes".to_string())
    })?;

    Ok(SwapchainSettings {
        format: surface_format.format,
        color_space: surface_format.color_space,
        present_mode,
        extent: choose_extent(caps, width, height),
        image_count: choose_image_count(caps),
        pre_transform: choose_pre_transform(caps),
        composite_alpha: choose_composite_alpha(caps),
    })
}

#[cfg(test)]
#[path = "vulkan_surface_tests.rs"]
mod tests;
