/// Swapchain - Vulkan implementation of the PresentationEngine trait
///
/// Owns the swapchain and its image views. The surface belongs to the
/// GpuContext and outlives every chain created on it.

use ash::vk;
use std::sync::Arc;
use triangle_engine::triangle::{Error, Result};
use triangle_engine::triangle::render::{AcquireOutcome, Extent2D, PresentOutcome, PresentationEngine};
use triangle_engine::{engine_debug, engine_err, engine_info};

use crate::vulkan_context::GpuContext;
use crate::vulkan_error::{vk_err, SOURCE};
use crate::vulkan_surface::{self, SwapchainSettings};

/// One chain image with its view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub format: vk::Format,
}

pub struct Swapchain {
    ctx: Arc<GpuContext>,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    /// Chosen once from the surface; pipelines are built against it
    surface_format: vk::SurfaceFormatKHR,
    settings: Option<SwapchainSettings>,
    extent: Extent2D,
}

impl Swapchain {
    /// Bind to the context's surface without creating a chain yet
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let formats = unsafe {
            ctx.extensions
                .surface
                .get_physical_device_surface_formats(ctx.physical_device, ctx.surface)
        }
        .map_err(|e| vk_err("vkGetPhysicalDeviceSurfaceFormatsKHR", e))?;
        let surface_format = vulkan_surface::choose_surface_format(&formats)
            .ok_or_else(|| Error::ConfigurationError("Surface reports no supported formats".to_string()))?;
        engine_debug!(SOURCE, "Surface format {:?} / {:?}", surface_format.format, surface_format.color_space);

        Ok(Self {
            ctx,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            views: Vec::new(),
            surface_format,
            settings: None,
            extent: Extent2D::default(),
        })
    }

    /// Color format of every chain image
    pub fn color_format(&self) -> vk::Format {
        self.surface_format.format
    }

    /// Settings of the current chain, if one exists
    pub fn settings(&self) -> Option<&SwapchainSettings> {
        self.settings.as_ref()
    }

    fn query_settings(&self, width: u32, height: u32, vsync: bool) -> Result<SwapchainSettings> {
        let surface = &self.ctx.extensions.surface;
        let (physical_device, handle) = (self.ctx.physical_device, self.ctx.surface);
        unsafe {
            let caps = surface
                .get_physical_device_surface_capabilities(physical_device, handle)
                .map_err(|e| vk_err("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?;
            let formats = surface
                .get_physical_device_surface_formats(physical_device, handle)
                .map_err(|e| vk_err("vkGetPhysicalDeviceSurfaceFormatsKHR", e))?;
            let present_modes = surface
                .get_physical_device_surface_present_modes(physical_device, handle)
                .map_err(|e| vk_err("vkGetPhysicalDeviceSurfacePresentModesKHR", e))?;
            vulkan_surface::negotiate(&caps, &formats, &present_modes, width, height, vsync)
        }
    }

    fn destroy_views(&mut self) {
        for view in self.views.drain(..) {
            unsafe {
                self.ctx.device.destroy_image_view(view, None);
            }
        }
    }

    fn create_views(&mut self) -> Result<()> {
        for &image in &self.images {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.surface_format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe { self.ctx.device.create_image_view(&create_info, None) }
                .map_err(|e| vk_err("vkCreateImageView", e))?;
            self.views.push(view);
        }
        Ok(())
    }
}

impl PresentationEngine for Swapchain {
    type Semaphore = vk::Semaphore;
    type Target = RenderTarget;

    fn configure(&mut self, width: u32, height: u32, vsync: bool) -> Result<Extent2D> {
        let settings = self.query_settings(width, height, vsync)?;
        let extent = Extent2D::new(settings.extent.width, settings.extent.height);
        if extent.is_zero() {
            engine_debug!(SOURCE, "Surface extent is zero, keeping current swapchain");
            return Ok(extent);
        }
        if settings.format != self.surface_format.format {
            return Err(Error::ConfigurationError(format!(
                "Surface format changed from {:?} to {:?}",
                self.surface_format.format, settings.format
            )));
        }

        let old_swapchain = self.swapchain;
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.ctx.surface)
            .min_image_count(settings.image_count)
            .image_format(settings.format)
            .image_color_space(settings.color_space)
            .image_extent(settings.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(settings.pre_transform)
            .composite_alpha(settings.composite_alpha)
            .present_mode(settings.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let loader = &self.ctx.extensions.swapchain;
        let swapchain = unsafe { loader.create_swapchain(&create_info, None) }
            .map_err(|e| vk_err("vkCreateSwapchainKHR", e))?;

        // Retire the previous chain: views first, then the chain itself
        self.destroy_views();
        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe {
                self.ctx.extensions.swapchain.destroy_swapchain(old_swapchain, None);
            }
        }
        self.swapchain = swapchain;
        self.settings = None;
        self.extent = Extent2D::default();

        self.images = unsafe { self.ctx.extensions.swapchain.get_swapchain_images(swapchain) }
            .map_err(|e| vk_err("vkGetSwapchainImagesKHR", e))?;
        self.create_views()?;

        engine_info!(SOURCE, "Swapchain configured: {}x{}, {} images, {:?}",
            extent.width, extent.height, self.images.len(), settings.present_mode);
        self.settings = Some(settings);
        self.extent = extent;
        Ok(extent)
    }

    fn acquire_next(&mut self, ready_signal: vk::Semaphore, timeout: u64) -> Result<AcquireOutcome> {
        if self.swapchain == vk::SwapchainKHR::null() {
            return Err(engine_err!(SOURCE, "Acquire on an unconfigured swapchain"));
        }
        let result = unsafe {
            self.ctx.extensions.swapchain.acquire_next_image(
                self.swapchain,
                timeout,
                ready_signal,
                vk::Fence::null(),
            )
        };
        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Stale),
            Err(e) => Err(vk_err("vkAcquireNextImageKHR", e)),
        }
    }

    fn present(&mut self, image_index: u32, wait_signal: vk::Semaphore) -> Result<PresentOutcome> {
        let wait_semaphores = [wait_signal];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.ctx
                .extensions
                .swapchain
                .queue_present(self.ctx.graphics_queue, &present_info)
        };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            // Suboptimal after present: rebuild before the next frame
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(e) => Err(vk_err("vkQueuePresentKHR", e)),
        }
    }

    fn teardown(&mut self) {
        self.destroy_views();
        if self.swapchain != vk::SwapchainKHR::null() {
            unsafe {
                self.ctx.extensions.swapchain.destroy_swapchain(self.swapchain, None);
            }
            self.swapchain = vk::SwapchainKHR::null();
        }
        self.images.clear();
        self.settings = None;
        self.extent = Extent2D::default();
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn target(&self, image_index: u32) -> Result<RenderTarget> {
        let index = image_index as usize;
        match (self.images.get(index), self.views.get(index)) {
            (Some(&image), Some(&view)) => Ok(RenderTarget {
                image,
                view,
                format: self.surface_format.format,
            }),
            _ => Err(engine_err!(SOURCE, "Swapchain image {} out of range ({} images)",
                image_index, self.images.len())),
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.teardown();
    }
}
