/// GpuContext - Instance, device and shared GPU services
///
/// Contains everything created before the first frame:
/// - Instance, optional validation messenger and the window surface
/// - Logical device with a single graphics+present queue
/// - Extension function tables (no global function pointers)
/// - Allocator and a reusable command pool for one-shot uploads
///
/// Every other Vulkan object holds an `Arc<GpuContext>` and must be dropped
/// before the context itself.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, PoisonError};
use triangle_engine::triangle::{Config, Result};
use triangle_engine::triangle::render::DrawStrategy;
use triangle_engine::{engine_debug, engine_info, engine_warn};

use crate::vulkan_debug::{self, DebugConfig, DebugState, ValidationStats};
use crate::vulkan_error::{init_failed, vk_err, SOURCE};
use crate::vulkan_frame_device::VulkanFrameDevice;
use crate::vulkan_swapchain::Swapchain;

const VALIDATION_LAYER: &std::ffi::CStr = c"VK_LAYER_KHRONOS_validation";

/// Extension function tables, loaded once at bootstrap
pub struct ExtensionTable {
    /// VK_KHR_surface (instance level)
    pub surface: ash::khr::surface::Instance,
    /// VK_KHR_swapchain (device level)
    pub swapchain: ash::khr::swapchain::Device,
    /// VK_EXT_debug_utils, present only with validation enabled
    pub debug_utils: Option<ash::ext::debug_utils::Instance>,
}

/// Optional device features the sample knows how to enable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub dynamic_rendering: bool,
    pub synchronization2: bool,
}

impl FeatureSet {
    /// Names of the features set in `self` but not in `available`
    pub fn missing_from(&self, available: &FeatureSet) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.dynamic_rendering && !available.dynamic_rendering {
            missing.push("dynamicRendering");
        }
        if self.synchronization2 && !available.synchronization2 {
            missing.push("synchronization2");
        }
        missing
    }
}

/// Feature negotiation state handed to the draw strategy before device creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFeatures {
    /// `VkPhysicalDeviceProperties::apiVersion` of the selected GPU
    pub api_version: u32,
    /// What the GPU reports
    pub supported: FeatureSet,
    /// What the logical device will be created with
    pub enabled: FeatureSet,
}

impl DeviceFeatures {
    pub fn new(api_version: u32, supported: FeatureSet) -> Self {
        Self {
            api_version,
            supported,
            enabled: FeatureSet::default(),
        }
    }

    /// True when the GPU implements at least Vulkan `major.minor`
    pub fn supports_api(&self, major: u32, minor: u32) -> bool {
        (vk::api_version_major(self.api_version), vk::api_version_minor(self.api_version)) >= (major, minor)
    }

    /// Reject an enabled set the GPU cannot provide
    pub fn validate(&self) -> Result<()> {
        let missing = self.enabled.missing_from(&self.supported);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(init_failed(format!("Selected GPU does not support: {}", missing.join(", "))))
        }
    }
}

/// Physical device summary for `--list-gpus` and startup logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub index: usize,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
}

pub fn device_type_name(device_type: vk::PhysicalDeviceType) -> &'static str {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
        vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
        vk::PhysicalDeviceType::CPU => "CPU",
        _ => "Other",
    }
}

impl fmt::Display for GpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}, Vulkan {}.{}.{})",
            self.index,
            self.name,
            device_type_name(self.device_type),
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
        )
    }
}

/// Pick the first queue family that can both render and present
///
/// A GPU whose graphics and present support live in different families is
/// rejected.
pub fn select_queue_family(
    families: &[vk::QueueFamilyProperties],
    supports_present: impl Fn(u32) -> bool,
) -> Result<u32> {
    let graphics: Vec<u32> = families
        .iter()
        .enumerate()
        .filter(|(_, family)| family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|(index, _)| index as u32)
        .collect();

    if graphics.is_empty() {
        return Err(init_failed("No graphics queue family found"));
    }
    graphics
        .into_iter()
        .find(|&index| supports_present(index))
        .ok_or_else(|| init_failed("No queue family supports both graphics and present"))
}

/// Shared GPU context for all Vulkan resources
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is released BEFORE the device
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue, also used for presentation
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,

    /// Reusable command pool for one-shot upload operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub upload_command_pool: Mutex<vk::CommandPool>,

    pub physical_device: vk::PhysicalDevice,
    pub surface: vk::SurfaceKHR,
    pub extensions: ExtensionTable,
    pub features: DeviceFeatures,
    pub gpu: GpuInfo,

    instance: ash::Instance,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    /// Boxed so the callback's user-data pointer stays valid
    debug_state: Option<Box<DebugState>>,
    _entry: ash::Entry,
}

impl GpuContext {
    /// Create instance, surface and device for `window`
    ///
    /// `strategy` chooses the device features before the device is created.
    pub fn new<W, S>(window: &W, config: &Config, strategy: &S) -> Result<Arc<Self>>
    where
        W: HasDisplayHandle + HasWindowHandle,
        S: DrawStrategy<VulkanFrameDevice, Swapchain>,
    {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_failed(format!("Failed to load Vulkan library: {}", e)))?;

            let mut enable_validation = config.enable_validation;
            if enable_validation && !Self::validation_layer_available(&entry) {
                engine_warn!(SOURCE, "{} not present, validation disabled",
                    VALIDATION_LAYER.to_string_lossy());
                enable_validation = false;
            }

            let app_info = vk::ApplicationInfo::default()
                .application_name(c"Basic indexed triangle")
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Triangle Engine")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle()
                .map_err(|e| init_failed(format!("Failed to get display handle: {}", e)))?;
            let window_handle = window.window_handle()
                .map_err(|e| init_failed(format!("Failed to get window handle: {}", e)))?;

            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_failed(format!("Failed to get required extensions: {:?}", e)))?
                .to_vec();
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if enable_validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed(format!("Failed to create instance: {:?}", e)))?;

            // Validation messenger, its state owned by the context
            let (debug_utils, debug_messenger, debug_state) = if enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                let state = Box::new(DebugState::new(DebugConfig::from_config(config)));
                let debug_info = vulkan_debug::messenger_create_info(&state);
                let messenger = debug_utils
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| init_failed(format!("Failed to create debug messenger: {:?}", e)))?;
                (Some(debug_utils), Some(messenger), Some(state))
            } else {
                (None, None, None)
            };

            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_failed(format!("Failed to create surface: {:?}", e)))?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Physical device by index
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| init_failed(format!("Failed to enumerate physical devices: {:?}", e)))?;
            if physical_devices.is_empty() {
                return Err(init_failed("No Vulkan-capable GPU found"));
            }
            let physical_device = *physical_devices.get(config.gpu_index).ok_or_else(|| {
                init_failed(format!(
                    "GPU index {} out of range ({} available)",
                    config.gpu_index,
                    physical_devices.len()
                ))
            })?;
            let gpu = Self::gpu_info(&instance, config.gpu_index, physical_device);
            engine_info!(SOURCE, "Using GPU {}", gpu);

            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
            let graphics_queue_family = select_queue_family(&queue_families, |index| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, index, surface)
                    .unwrap_or(false)
            })?;

            // Feature negotiation
            let mut features = DeviceFeatures::new(
                gpu.api_version,
                Self::query_features(&instance, physical_device, gpu.api_version),
            );
            strategy.configure_features(&mut features)?;
            features.validate()?;
            engine_debug!(SOURCE, "Enabled device features: {:?}", features.enabled);

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .queue_priorities(&queue_priorities)];
            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            let enabled = features.enabled;
            let mut features13 = vk::PhysicalDeviceVulkan13Features::default()
                .dynamic_rendering(enabled.dynamic_rendering)
                .synchronization2(enabled.synchronization2);

            let mut device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names);
            if features.supports_api(1, 3) {
                device_create_info = device_create_info.push_next(&mut features13);
            }

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_failed(format!("Failed to create device: {:?}", e)))?;
            let graphics_queue = device.get_device_queue(graphics_queue_family, 0);

            let extensions = ExtensionTable {
                surface: surface_loader,
                swapchain: ash::khr::swapchain::Device::new(&instance, &device),
                debug_utils,
            };

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_failed(format!("Failed to create allocator: {:?}", e)))?;

            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let upload_command_pool = device
                .create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| init_failed(format!("Failed to create upload command pool: {:?}", e)))?;

            Ok(Arc::new(Self {
                device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                graphics_queue,
                graphics_queue_family,
                upload_command_pool: Mutex::new(upload_command_pool),
                physical_device,
                surface,
                extensions,
                features,
                gpu,
                instance,
                debug_messenger,
                debug_state,
                _entry: entry,
            }))
        }
    }

    /// Enumerate physical devices through a short-lived instance
    pub fn list_gpus() -> Result<Vec<GpuInfo>> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_failed(format!("Failed to load Vulkan library: {}", e)))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(c"Basic indexed triangle")
                .api_version(vk::API_VERSION_1_3);
            let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);
            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed(format!("Failed to create instance: {:?}", e)))?;

            let gpus = instance
                .enumerate_physical_devices()
                .map(|devices| {
                    devices
                        .iter()
                        .enumerate()
                        .map(|(index, &physical_device)| Self::gpu_info(&instance, index, physical_device))
                        .collect()
                })
                .map_err(|e| vk_err("vkEnumeratePhysicalDevices", e));

            instance.destroy_instance(None);
            gpus
        }
    }

    /// Record and run a command buffer, blocking until the GPU has finished it
    pub fn submit_one_shot(&self, record: impl FnOnce(vk::CommandBuffer)) -> Result<()> {
        let pool = self.upload_command_pool.lock().unwrap_or_else(PoisonError::into_inner);
        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| vk_err("vkAllocateCommandBuffers", e))?[0];

            let fence = match self.device.create_fence(&vk::FenceCreateInfo::default(), None) {
                Ok(fence) => fence,
                Err(e) => {
                    self.device.free_command_buffers(*pool, &[command_buffer]);
                    return Err(vk_err("vkCreateFence", e));
                }
            };

            let result = self.run_one_shot(command_buffer, fence, record);

            self.device.destroy_fence(fence, None);
            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }

    unsafe fn run_one_shot(
        &self,
        command_buffer: vk::CommandBuffer,
        fence: vk::Fence,
        record: impl FnOnce(vk::CommandBuffer),
    ) -> Result<()> {
        unsafe {
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| vk_err("vkBeginCommandBuffer", e))?;

            record(command_buffer);

            self.device
                .end_command_buffer(command_buffer)
                .map_err(|e| vk_err("vkEndCommandBuffer", e))?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], fence)
                .map_err(|e| vk_err("vkQueueSubmit", e))?;
            self.device
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| vk_err("vkWaitForFences", e))
        }
    }

    /// Validation message counts, when validation and statistics are enabled
    pub fn validation_stats(&self) -> Option<ValidationStats> {
        self.debug_state
            .as_ref()
            .filter(|state| state.config().enable_stats)
            .map(|state| state.stats())
    }

    /// Validation error IDs seen so far; empty when validation or stats are off
    pub fn validation_error_ids(&self) -> Vec<(String, u32)> {
        self.debug_state
            .as_ref()
            .filter(|state| state.config().enable_stats)
            .map(|state| state.error_ids())
            .unwrap_or_default()
    }

    pub fn print_validation_report(&self) {
        if let Some(state) = self.debug_state.as_ref().filter(|state| state.config().enable_stats) {
            state.print_report();
        }
    }

    fn validation_layer_available(entry: &ash::Entry) -> bool {
        unsafe { entry.enumerate_instance_layer_properties() }
            .map(|layers| {
                layers
                    .iter()
                    .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER))
            })
            .unwrap_or(false)
    }

    fn gpu_info(instance: &ash::Instance, index: usize, physical_device: vk::PhysicalDevice) -> GpuInfo {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "Unknown GPU".to_string());
        GpuInfo {
            index,
            name,
            device_type: properties.device_type,
            api_version: properties.api_version,
        }
    }

    fn query_features(instance: &ash::Instance, physical_device: vk::PhysicalDevice, api_version: u32) -> FeatureSet {
        unsafe {
            let mut supported = FeatureSet::default();
            if DeviceFeatures::new(api_version, supported).supports_api(1, 3) {
                let mut features13 = vk::PhysicalDeviceVulkan13Features::default();
                {
                    let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut features13);
                    instance.get_physical_device_features2(physical_device, &mut features2);
                }
                supported.dynamic_rendering = features13.dynamic_rendering == vk::TRUE;
                supported.synchronization2 = features13.synchronization2 == vk::TRUE;
            }
            supported
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Upload pool
            let pool = *self.upload_command_pool.get_mut().unwrap_or_else(PoisonError::into_inner);
            self.device.destroy_command_pool(pool, None);

            // 2. Allocator: free VkDeviceMemory pages BEFORE destroying device
            ManuallyDrop::drop(&mut self.allocator);

            // 3. Device, then surface
            self.device.destroy_device(None);
            self.extensions.surface.destroy_surface(self.surface, None);

            // 4. Messenger BEFORE instance; the state it points at outlives it
            if let (Some(debug_utils), Some(messenger)) = (&self.extensions.debug_utils, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_context_tests.rs"]
mod tests;
