/// VulkanFrameDevice - Vulkan implementation of the FrameDevice trait
///
/// Owns the command pool the per-slot command buffers come from. Slots
/// themselves are owned by the frame ring and handed back through
/// `destroy_slot`.

use ash::vk;
use std::sync::Arc;
use triangle_engine::triangle::Result;
use triangle_engine::triangle::render::{DeviceSlot, FrameDevice, FrameSlot};

use crate::vulkan_context::{DeviceFeatures, GpuContext};
use crate::vulkan_error::vk_err;

pub struct VulkanFrameDevice {
    ctx: Arc<GpuContext>,
    /// RESET_COMMAND_BUFFER so each slot buffer can be re-recorded on its own
    command_pool: vk::CommandPool,
}

impl VulkanFrameDevice {
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(ctx.graphics_queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = unsafe { ctx.device.create_command_pool(&pool_info, None) }
            .map_err(|e| vk_err("vkCreateCommandPool", e))?;
        Ok(Self { ctx, command_pool })
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    pub fn device(&self) -> &ash::Device {
        &self.ctx.device
    }
}

impl FrameDevice for VulkanFrameDevice {
    type Fence = vk::Fence;
    type Semaphore = vk::Semaphore;
    type CommandBuffer = vk::CommandBuffer;
    type Features = DeviceFeatures;

    fn create_slot(&self) -> Result<DeviceSlot<Self>> {
        let device = &self.ctx.device;
        unsafe {
            let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            let fence = device
                .create_fence(&fence_info, None)
                .map_err(|e| vk_err("vkCreateFence", e))?;

            let semaphore_info = vk::SemaphoreCreateInfo::default();
            let image_available = match device.create_semaphore(&semaphore_info, None) {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    device.destroy_fence(fence, None);
                    return Err(vk_err("vkCreateSemaphore", e));
                }
            };
            let render_finished = match device.create_semaphore(&semaphore_info, None) {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    device.destroy_semaphore(image_available, None);
                    device.destroy_fence(fence, None);
                    return Err(vk_err("vkCreateSemaphore", e));
                }
            };

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = match device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) => buffers[0],
                Err(e) => {
                    device.destroy_semaphore(render_finished, None);
                    device.destroy_semaphore(image_available, None);
                    device.destroy_fence(fence, None);
                    return Err(vk_err("vkAllocateCommandBuffers", e));
                }
            };

            Ok(FrameSlot {
                fence,
                image_available,
                render_finished,
                command_buffer,
            })
        }
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> Result<()> {
        unsafe { self.ctx.device.wait_for_fences(&[fence], true, timeout) }
            .map_err(|e| vk_err("vkWaitForFences", e))
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe { self.ctx.device.reset_fences(&[fence]) }
            .map_err(|e| vk_err("vkResetFences", e))
    }

    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        let device = &self.ctx.device;
        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| vk_err("vkResetCommandBuffer", e))?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| vk_err("vkBeginCommandBuffer", e))
        }
    }

    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        unsafe { self.ctx.device.end_command_buffer(command_buffer) }
            .map_err(|e| vk_err("vkEndCommandBuffer", e))
    }

    fn submit(
        &self,
        command_buffer: vk::CommandBuffer,
        wait: vk::Semaphore,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()> {
        let wait_semaphores = [wait];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [signal];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], fence)
        }
        .map_err(|e| vk_err("vkQueueSubmit", e))
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.ctx.device.device_wait_idle() }
            .map_err(|e| vk_err("vkDeviceWaitIdle", e))
    }

    fn destroy_slot(&self, slot: DeviceSlot<Self>) {
        let device = &self.ctx.device;
        unsafe {
            device.free_command_buffers(self.command_pool, &[slot.command_buffer]);
            device.destroy_semaphore(slot.render_finished, None);
            device.destroy_semaphore(slot.image_available, None);
            device.destroy_fence(slot.fence, None);
        }
    }
}

impl Drop for VulkanFrameDevice {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
