/// TriangleStrategy - draw strategy for the basic indexed triangle
///
/// One device-local vertex buffer and index buffer shared by all frames,
/// plus one host-coherent uniform buffer and descriptor set per frame slot.
/// Rendering uses dynamic rendering and synchronization2 barriers, so no
/// render pass or framebuffer objects exist.

use ash::vk;
use std::path::PathBuf;
use std::sync::Arc;
use triangle_engine::engine_err;
use triangle_engine::triangle::Result;
use triangle_engine::triangle::render::{
    DeviceFrameContext, DrawStrategy, ShaderData, Vertex, TRIANGLE_INDICES, TRIANGLE_VERTICES,
};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::{DeviceFeatures, GpuContext};
use crate::vulkan_error::{init_failed, vk_err, SOURCE};
use crate::vulkan_frame_device::VulkanFrameDevice;
use crate::vulkan_shader::ShaderModule;
use crate::vulkan_swapchain::{RenderTarget, Swapchain};

/// Dark blue background
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.2, 1.0];

const UNIFORM_SIZE: u64 = std::mem::size_of::<ShaderData>() as u64;

/// GPU objects created by `prepare`; null handles until created
#[derive(Default)]
struct TriangleResources {
    vertex_buffer: Option<Buffer>,
    index_buffer: Option<Buffer>,
    uniform_buffers: Vec<Buffer>,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set_layout: vk::DescriptorSetLayout,
    descriptor_sets: Vec<vk::DescriptorSet>,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

pub struct TriangleStrategy {
    shader_dir: PathBuf,
    resources: Option<TriangleResources>,
    /// Model rotation in full turns, written into each frame's uniforms
    animation_time: f32,
}

impl TriangleStrategy {
    /// `shader_dir` holds `triangle.vert.spv` and `triangle.frag.spv`
    pub fn new(shader_dir: impl Into<PathBuf>) -> Self {
        Self {
            shader_dir: shader_dir.into(),
            resources: None,
            animation_time: 0.0,
        }
    }

    pub fn set_animation_time(&mut self, turns: f32) {
        self.animation_time = turns;
    }

    pub fn animation_time(&self) -> f32 {
        self.animation_time
    }

    pub fn is_prepared(&self) -> bool {
        self.resources.as_ref().is_some_and(|r| r.pipeline != vk::Pipeline::null())
    }

    fn create_resources(
        &self,
        ctx: &Arc<GpuContext>,
        resources: &mut TriangleResources,
        slot_count: usize,
        color_format: vk::Format,
    ) -> Result<()> {
        Self::create_geometry(ctx, resources)?;
        Self::create_descriptors(ctx, resources, slot_count)?;
        self.create_pipeline(ctx, resources, color_format)
    }

    fn create_geometry(ctx: &Arc<GpuContext>, resources: &mut TriangleResources) -> Result<()> {
        resources.vertex_buffer = Some(Buffer::device_local_with_data(
            Arc::clone(ctx),
            bytemuck::cast_slice(&TRIANGLE_VERTICES),
            vk::BufferUsageFlags::VERTEX_BUFFER,
            "triangle vertices",
        )?);
        resources.index_buffer = Some(Buffer::device_local_with_data(
            Arc::clone(ctx),
            bytemuck::cast_slice(&TRIANGLE_INDICES),
            vk::BufferUsageFlags::INDEX_BUFFER,
            "triangle indices",
        )?);
        Ok(())
    }

    fn create_descriptors(ctx: &Arc<GpuContext>, resources: &mut TriangleResources, slot_count: usize) -> Result<()> {
        let device = &ctx.device;
        for _ in 0..slot_count {
            resources.uniform_buffers.push(Buffer::uniform(Arc::clone(ctx), UNIFORM_SIZE, "shader data")?);
        }

        unsafe {
            // Binding 0: uniform buffer read by the vertex shader
            let bindings = [vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX)];
            let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            resources.descriptor_set_layout = device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| vk_err("vkCreateDescriptorSetLayout", e))?;

            let pool_sizes = [vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(slot_count as u32)];
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .pool_sizes(&pool_sizes)
                .max_sets(slot_count as u32);
            resources.descriptor_pool = device
                .create_descriptor_pool(&pool_info, None)
                .map_err(|e| vk_err("vkCreateDescriptorPool", e))?;

            let layouts = vec![resources.descriptor_set_layout; slot_count];
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(resources.descriptor_pool)
                .set_layouts(&layouts);
            resources.descriptor_sets = device
                .allocate_descriptor_sets(&allocate_info)
                .map_err(|e| vk_err("vkAllocateDescriptorSets", e))?;

            for (set, buffer) in resources.descriptor_sets.iter().zip(&resources.uniform_buffers) {
                let buffer_info = [vk::DescriptorBufferInfo::default()
                    .buffer(buffer.handle())
                    .offset(0)
                    .range(UNIFORM_SIZE)];
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_info);
                device.update_descriptor_sets(&[write], &[]);
            }

            let set_layouts = [resources.descriptor_set_layout];
            let pipeline_layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
            resources.pipeline_layout = device
                .create_pipeline_layout(&pipeline_layout_info, None)
                .map_err(|e| vk_err("vkCreatePipelineLayout", e))?;
        }
        Ok(())
    }

    fn create_pipeline(&self, ctx: &GpuContext, resources: &mut TriangleResources, color_format: vk::Format) -> Result<()> {
        let vertex_shader = ShaderModule::load(&ctx.device, &self.shader_dir, "triangle.vert", vk::ShaderStageFlags::VERTEX)?;
        let fragment_shader = ShaderModule::load(&ctx.device, &self.shader_dir, "triangle.frag", vk::ShaderStageFlags::FRAGMENT)?;
        let stages = [vertex_shader.stage_info(), fragment_shader.stage_info()];

        // Vertex layout: position at location 0, color at location 1
        let vertex_bindings = [vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(Vertex::STRIDE)
            .input_rate(vk::VertexInputRate::VERTEX)];
        let vertex_attributes = [
            vk::VertexInputAttributeDescription::default()
                .location(0)
                .binding(0)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(0),
            vk::VertexInputAttributeDescription::default()
                .location(1)
                .binding(0)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(Vertex::COLOR_OFFSET),
        ];
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

        // Viewport and scissor are dynamic
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let color_formats = [color_format];
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(resources.pipeline_layout)
            .push_next(&mut rendering_info);

        let pipelines = unsafe {
            ctx.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        }
        .map_err(|(_, e)| vk_err("vkCreateGraphicsPipelines", e))?;
        resources.pipeline = pipelines[0];

        // Shader modules are released here, the pipeline keeps what it needs
        Ok(())
    }
}

fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// UNDEFINED -> COLOR_ATTACHMENT_OPTIMAL, ordered after the acquire wait
fn to_attachment_barrier(target: &RenderTarget) -> vk::ImageMemoryBarrier2<'static> {
    vk::ImageMemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags2::NONE)
        .dst_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .image(target.image)
        .subresource_range(color_range())
}

/// COLOR_ATTACHMENT_OPTIMAL -> PRESENT_SRC_KHR
fn to_present_barrier(target: &RenderTarget) -> vk::ImageMemoryBarrier2<'static> {
    vk::ImageMemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
        .dst_stage_mask(vk::PipelineStageFlags2::BOTTOM_OF_PIPE)
        .dst_access_mask(vk::AccessFlags2::NONE)
        .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .image(target.image)
        .subresource_range(color_range())
}

impl DrawStrategy<VulkanFrameDevice, Swapchain> for TriangleStrategy {
    fn configure_features(&self, features: &mut DeviceFeatures) -> Result<()> {
        if !features.supports_api(1, 3) {
            return Err(init_failed("Selected GPU does not support Vulkan 1.3"));
        }
        features.enabled.dynamic_rendering = true;
        features.enabled.synchronization2 = true;
        Ok(())
    }

    fn prepare(&mut self, device: &VulkanFrameDevice, presentation: &Swapchain, slot_count: usize) -> Result<()> {
        let ctx = Arc::clone(device.context());
        let mut resources = TriangleResources::default();

        // Stored even on failure so `destroy` releases partial work
        let result = self.create_resources(&ctx, &mut resources, slot_count, presentation.color_format());
        self.resources = Some(resources);
        result
    }

    fn record_draw(&mut self, device: &VulkanFrameDevice, frame: &DeviceFrameContext<VulkanFrameDevice, Swapchain>) -> Result<()> {
        let resources = self
            .resources
            .as_mut()
            .ok_or_else(|| engine_err!(SOURCE, "Triangle resources not prepared"))?;
        let (Some(vertex_buffer), Some(index_buffer)) = (&resources.vertex_buffer, &resources.index_buffer) else {
            return Err(engine_err!(SOURCE, "Triangle geometry not uploaded"));
        };
        let (vertex_buffer, index_buffer) = (vertex_buffer.handle(), index_buffer.handle());
        let descriptor_set = *resources
            .descriptor_sets
            .get(frame.slot_index)
            .ok_or_else(|| engine_err!(SOURCE, "No descriptor set for frame slot {}", frame.slot_index))?;

        // The slot fence has been waited on, the GPU no longer reads this buffer
        let shader_data = ShaderData::animated(frame.extent.aspect_ratio(), self.animation_time);
        resources
            .uniform_buffers
            .get_mut(frame.slot_index)
            .ok_or_else(|| engine_err!(SOURCE, "No uniform buffer for frame slot {}", frame.slot_index))?
            .write(0, shader_data.as_bytes())?;

        let d = device.device();
        let command_buffer = frame.command_buffer;
        let extent = vk::Extent2D {
            width: frame.extent.width,
            height: frame.extent.height,
        };
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };

        unsafe {
            let barriers = [to_attachment_barrier(&frame.target)];
            d.cmd_pipeline_barrier2(command_buffer, &vk::DependencyInfo::default().image_memory_barriers(&barriers));

            let color_attachments = [vk::RenderingAttachmentInfo::default()
                .image_view(frame.target.view)
                .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .clear_value(vk::ClearValue {
                    color: vk::ClearColorValue { float32: CLEAR_COLOR },
                })];
            let rendering_info = vk::RenderingInfo::default()
                .render_area(render_area)
                .layer_count(1)
                .color_attachments(&color_attachments);
            d.cmd_begin_rendering(command_buffer, &rendering_info);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            d.cmd_set_viewport(command_buffer, 0, &[viewport]);
            d.cmd_set_scissor(command_buffer, 0, &[render_area]);

            d.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                resources.pipeline_layout,
                0,
                &[descriptor_set],
                &[],
            );
            d.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, resources.pipeline);
            d.cmd_bind_vertex_buffers(command_buffer, 0, &[vertex_buffer], &[0]);
            d.cmd_bind_index_buffer(command_buffer, index_buffer, 0, vk::IndexType::UINT32);
            d.cmd_draw_indexed(command_buffer, TRIANGLE_INDICES.len() as u32, 1, 0, 0, 0);

            d.cmd_end_rendering(command_buffer);

            let barriers = [to_present_barrier(&frame.target)];
            d.cmd_pipeline_barrier2(command_buffer, &vk::DependencyInfo::default().image_memory_barriers(&barriers));
        }
        Ok(())
    }

    fn destroy(&mut self, device: &VulkanFrameDevice) {
        let Some(resources) = self.resources.take() else {
            return;
        };
        let d = device.device();
        // Null handles are ignored by the destroy calls
        unsafe {
            d.destroy_pipeline(resources.pipeline, None);
            d.destroy_pipeline_layout(resources.pipeline_layout, None);
            d.destroy_descriptor_pool(resources.descriptor_pool, None);
            d.destroy_descriptor_set_layout(resources.descriptor_set_layout, None);
        }
        // Buffers free their memory on drop
        drop(resources);
    }
}
