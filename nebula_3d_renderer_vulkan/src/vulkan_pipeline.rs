/// Pipeline & pass builder - render pass, shaders, graphics pipeline
///
/// The render pass and pipeline are built once against the swapchain's
/// surface format and survive swapchain recreation; viewport and scissor
/// are dynamic state so only the framebuffers change on resize.

use std::path::Path;
use std::sync::Arc;

use ash::vk;

use nebula_3d_renderer::nebula3d::asset::Vertex;
use nebula_3d_renderer::nebula3d::{Error, Result};
use nebula_3d_renderer::{nebula_debug, nebula_err, nebula_error};

use crate::vulkan_context::VulkanContext;

/// SPIR-V shader paths, resolved relative to the working directory.
pub(crate) const VERTEX_SHADER_PATH: &str = "shader/shader.vert.spv";
pub(crate) const FRAGMENT_SHADER_PATH: &str = "shader/shader.frag.spv";

/// Vertex buffer binding: one binding, per-vertex rate, `Vertex` stride.
pub(crate) fn vertex_binding_description() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription::default()
        .binding(0)
        .stride(Vertex::STRIDE)
        .input_rate(vk::VertexInputRate::VERTEX)
}

/// Vertex attributes: position (vec3), uv (vec2), normal (vec3), offsets
/// derived from the `Vertex` layout.
pub(crate) fn vertex_attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
    [
        vk::VertexInputAttributeDescription::default()
            .location(0)
            .binding(0)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(0),
        vk::VertexInputAttributeDescription::default()
            .location(1)
            .binding(0)
            .format(vk::Format::R32G32_SFLOAT)
            .offset(Vertex::UV_OFFSET),
        vk::VertexInputAttributeDescription::default()
            .location(2)
            .binding(0)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(Vertex::NORMAL_OFFSET),
    ]
}

/// Create the single fixed render pass: color cleared and stored for
/// presentation, depth cleared and discarded, one subpass with an external
/// dependency covering color output and early depth tests.
pub(crate) fn create_render_pass(
    device: &ash::Device,
    color_format: vk::Format,
    depth_format: vk::Format,
) -> Result<vk::RenderPass> {
    let attachments = [
        vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
        vk::AttachmentDescription::default()
            .format(depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
    ];

    let color_refs = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
    let depth_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)
        .depth_stencil_attachment(&depth_ref)];

    let dependencies = [vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )];

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    unsafe {
        device
            .create_render_pass(&render_pass_info, None)
            .map_err(|e| {
                nebula_error!("nebula3d::vulkan", "Failed to create render pass: {:?}", e);
                Error::InitializationFailed(format!("Failed to create render pass: {:?}", e))
            })
    }
}

/// Load a SPIR-V file and wrap it in a shader module.
///
/// A missing or malformed shader file is fatal: there is no fallback
/// pipeline to render with.
fn load_shader_module<P: AsRef<Path>>(device: &ash::Device, path: P) -> Result<vk::ShaderModule> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        nebula_error!("nebula3d::vulkan", "Failed to read shader {}: {}", path.display(), e);
        Error::InitializationFailed(format!("Failed to read shader {}: {}", path.display(), e))
    })?;

    if bytes.len() % 4 != 0 {
        return Err(Error::InvalidResource(format!(
            "Shader {} is not valid SPIR-V (size {} not a multiple of 4)",
            path.display(),
            bytes.len()
        )));
    }
    let code: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
    unsafe {
        device.create_shader_module(&create_info, None).map_err(|e| {
            nebula_err!(
                "nebula3d::vulkan",
                "Failed to create shader module from {}: {:?}",
                path.display(),
                e
            )
        })
    }
}

/// The graphics pipeline and the layouts it is built from.
pub(crate) struct GraphicsPipeline {
    ctx: Arc<VulkanContext>,
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub pipeline_layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
}

impl GraphicsPipeline {
    /// Build the one pipeline the renderer uses: `Vertex` input layout,
    /// triangle list, dynamic viewport/scissor, back-face culling with CCW
    /// front faces, LESS depth test with write, no blending.
    pub fn new(ctx: Arc<VulkanContext>, render_pass: vk::RenderPass) -> Result<Self> {
        let device = &ctx.device;

        // Binding 0: per-frame transform UBO (vertex stage)
        // Binding 1: mesh texture sampler (fragment stage)
        let bindings = [
            vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX),
            vk::DescriptorSetLayoutBinding::default()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        ];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let descriptor_set_layout = unsafe {
            device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| {
                    nebula_err!(
                        "nebula3d::vulkan",
                        "Failed to create descriptor set layout: {:?}",
                        e
                    )
                })?
        };

        let set_layouts = [descriptor_set_layout];
        let pipeline_layout_info =
            vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        let pipeline_layout = unsafe {
            device
                .create_pipeline_layout(&pipeline_layout_info, None)
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to create pipeline layout: {:?}", e)
                })?
        };

        let vertex_module = load_shader_module(device, VERTEX_SHADER_PATH)?;
        let fragment_module = load_shader_module(device, FRAGMENT_SHADER_PATH)?;

        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(c"main"),
        ];

        let binding_descriptions = [vertex_binding_description()];
        let attribute_descriptions = vertex_attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

        // Actual viewport/scissor are set each frame
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .attachments(&color_blend_attachments);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(pipeline_layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipeline_result = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };

        // Shader modules are only needed during pipeline creation
        unsafe {
            device.destroy_shader_module(vertex_module, None);
            device.destroy_shader_module(fragment_module, None);
        }

        let pipeline = match pipeline_result {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe {
                    device.destroy_pipeline_layout(pipeline_layout, None);
                    device.destroy_descriptor_set_layout(descriptor_set_layout, None);
                }
                nebula_error!("nebula3d::vulkan", "Failed to create graphics pipeline: {:?}", e);
                return Err(Error::InitializationFailed(format!(
                    "Failed to create graphics pipeline: {:?}",
                    e
                )));
            }
        };

        nebula_debug!("nebula3d::vulkan", "Graphics pipeline created");

        Ok(Self {
            ctx,
            descriptor_set_layout,
            pipeline_layout,
            pipeline,
        })
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx
                .device
                .destroy_pipeline_layout(self.pipeline_layout, None);
            self.ctx
                .device
                .destroy_descriptor_set_layout(self.descriptor_set_layout, None);
        }
    }
}
