/// Buffer - GPU buffer with its allocation

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use std::sync::{Arc, PoisonError};
use triangle_engine::engine_err;
use triangle_engine::triangle::Result;

use crate::vulkan_context::GpuContext;
use crate::vulkan_error::{init_failed, vk_err, SOURCE};

/// True when CPU writes are visible to the GPU without explicit flushes
pub fn is_host_coherent(flags: vk::MemoryPropertyFlags) -> bool {
    flags.contains(vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT)
}

/// Vulkan buffer and its memory
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
}

impl Buffer {
    /// Create a buffer bound to fresh memory in `location`
    pub fn new(
        ctx: Arc<GpuContext>,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<Self> {
        let create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { ctx.device.create_buffer(&create_info, None) }
            .map_err(|e| vk_err("vkCreateBuffer", e))?;

        // From here on Drop releases whatever has been created
        let mut this = Self {
            ctx,
            buffer,
            allocation: None,
            size,
        };

        let requirements = unsafe { this.ctx.device.get_buffer_memory_requirements(buffer) };
        let allocation = this
            .ctx
            .allocator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                init_failed(format!(
                    "Out of GPU memory for buffer \"{}\" ({} bytes): {}",
                    name, requirements.size, e
                ))
            })?;

        let bind = unsafe {
            this.ctx
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        };
        this.allocation = Some(allocation);
        bind.map_err(|e| vk_err("vkBindBufferMemory", e))?;

        Ok(this)
    }

    /// Host-visible uniform buffer; rejected unless the memory is coherent
    pub fn uniform(ctx: Arc<GpuContext>, size: u64, name: &str) -> Result<Self> {
        let buffer = Self::new(ctx, size, vk::BufferUsageFlags::UNIFORM_BUFFER, MemoryLocation::CpuToGpu, name)?;
        let properties = buffer.memory_properties();
        if !is_host_coherent(properties) {
            return Err(init_failed(format!(
                "Uniform buffer \"{}\" landed in non-coherent memory ({:?})",
                name, properties
            )));
        }
        Ok(buffer)
    }

    /// Device-local buffer filled through a staging copy
    pub fn device_local_with_data(
        ctx: Arc<GpuContext>,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<Self> {
        let size = data.len() as u64;
        let mut staging = Self::new(
            Arc::clone(&ctx),
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "staging",
        )?;
        staging.write(0, data)?;

        let buffer = Self::new(
            Arc::clone(&ctx),
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
            name,
        )?;

        let region = vk::BufferCopy::default().size(size);
        ctx.submit_one_shot(|command_buffer| unsafe {
            ctx.device.cmd_copy_buffer(command_buffer, staging.buffer, buffer.buffer, &[region]);
        })?;

        Ok(buffer)
    }

    /// Copy `data` into mapped memory at `offset`
    ///
    /// The caller guarantees the GPU is not reading this range.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u64;
        if end > self.size {
            return Err(engine_err!(SOURCE, "Buffer write of {} bytes at {} exceeds size {}",
                data.len(), offset, self.size));
        }
        let mapped = self
            .allocation
            .as_mut()
            .and_then(|allocation| allocation.mapped_slice_mut())
            .ok_or_else(|| engine_err!(SOURCE, "Buffer is not CPU-accessible"))?;
        mapped[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn memory_properties(&self) -> vk::MemoryPropertyFlags {
        self.allocation
            .as_ref()
            .map(|allocation| allocation.memory_properties())
            .unwrap_or_else(vk::MemoryPropertyFlags::empty)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
