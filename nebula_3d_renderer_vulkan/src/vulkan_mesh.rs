/// GPU-resident meshes - vertex/index buffers, texture, descriptor sets
///
/// Every mesh carries a sampled texture so one pipeline serves the whole
/// scene; untextured meshes get a 1x1 white fallback instead of a second
/// pipeline variant.

use std::sync::Arc;

use ash::vk;

use nebula_3d_renderer::nebula3d::asset::{ImageData, Mesh};
use nebula_3d_renderer::nebula3d::{Error, Result};
use nebula_3d_renderer::{nebula_debug, nebula_err};

use crate::vulkan_context::VulkanContext;
use crate::vulkan_frame::{TransformUniform, UniformBuffers};
use crate::vulkan_transfer::{self, GpuBuffer, GpuImage};

/// Requested sampler anisotropy, clamped to the device limit.
const SAMPLER_ANISOTROPY: f32 = 16.0;

/// Arguments for the one indexed draw a mesh records:
/// (index_count, instance_count, first_index, vertex_offset, first_instance).
pub(crate) fn draw_params(index_count: u32) -> (u32, u32, u32, i32, u32) {
    (index_count, 1, 0, 0, 0)
}

/// A mesh resident on the GPU.
pub struct GpuMesh {
    ctx: Arc<VulkanContext>,
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    index_count: u32,
    texture: GpuImage,
    sampler: vk::Sampler,
    /// One set per swapchain image, allocated by `create_descriptor_sets`
    descriptor_sets: Vec<vk::DescriptorSet>,
}

impl GpuMesh {
    /// Upload a decoded mesh: vertex and index buffers become device-local,
    /// the texture (or the white fallback) becomes a sampled image.
    pub fn upload(ctx: &Arc<VulkanContext>, mesh: &Mesh) -> Result<Self> {
        if mesh.vertices().is_empty() || mesh.indices().is_empty() {
            return Err(Error::InvalidResource(
                "Mesh has no geometry to upload".to_string(),
            ));
        }

        let vertex_buffer = vulkan_transfer::upload_buffer(
            ctx,
            mesh.vertices(),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = vulkan_transfer::upload_buffer(
            ctx,
            mesh.indices(),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        let fallback;
        let image_data = match mesh.texture() {
            Some(texture) => texture,
            None => {
                fallback = ImageData::solid([255, 255, 255, 255]);
                &fallback
            }
        };
        let texture = vulkan_transfer::upload_image(ctx, image_data)?;
        let sampler = create_sampler(ctx)?;

        nebula_debug!(
            "nebula3d::vulkan",
            "Mesh uploaded ({} vertices, {} indices, {}x{} {:?} texture)",
            mesh.vertex_count(),
            mesh.index_count(),
            texture.extent().width,
            texture.extent().height,
            texture.format()
        );

        Ok(Self {
            ctx: Arc::clone(ctx),
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            texture,
            sampler,
            descriptor_sets: Vec::new(),
        })
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Allocate and write one descriptor set per swapchain image, pairing
    /// the image's transform UBO with this mesh's texture sampler.
    pub(crate) fn create_descriptor_sets(
        &mut self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        uniforms: &UniformBuffers,
    ) -> Result<()> {
        let count = uniforms.count();
        let layouts = vec![layout; count];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);

        let sets = unsafe {
            self.ctx
                .device
                .allocate_descriptor_sets(&allocate_info)
                .map_err(|e| {
                    nebula_err!(
                        "nebula3d::vulkan",
                        "Failed to allocate descriptor sets: {:?}",
                        e
                    )
                })?
        };

        for (i, &set) in sets.iter().enumerate() {
            let buffer_info = [vk::DescriptorBufferInfo::default()
                .buffer(uniforms.buffer(i as u32).handle())
                .offset(0)
                .range(std::mem::size_of::<TransformUniform>() as u64)];
            let image_info = [vk::DescriptorImageInfo::default()
                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .image_view(self.texture.view())
                .sampler(self.sampler)];

            let writes = [
                vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_info),
                vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(1)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(&image_info),
            ];

            unsafe {
                self.ctx.device.update_descriptor_sets(&writes, &[]);
            }
        }

        self.descriptor_sets = sets;
        Ok(())
    }

    /// Record this mesh's draw into `command_buffer`: bind the image's
    /// descriptor set, the vertex and index buffers, and issue one indexed
    /// draw covering the whole index buffer.
    pub(crate) fn record_draw(
        &self,
        command_buffer: vk::CommandBuffer,
        pipeline_layout: vk::PipelineLayout,
        image_index: u32,
    ) {
        let device = &self.ctx.device;
        unsafe {
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline_layout,
                0,
                &[self.descriptor_sets[image_index as usize]],
                &[],
            );
            device.cmd_bind_vertex_buffers(
                command_buffer,
                0,
                &[self.vertex_buffer.handle()],
                &[0],
            );
            device.cmd_bind_index_buffer(
                command_buffer,
                self.index_buffer.handle(),
                0,
                vk::IndexType::UINT32,
            );

            let (index_count, instance_count, first_index, vertex_offset, first_instance) =
                draw_params(self.index_count);
            device.cmd_draw_indexed(
                command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }
}

impl Drop for GpuMesh {
    fn drop(&mut self) {
        // Descriptor sets are reclaimed with their pool; buffers and the
        // texture free themselves
        unsafe {
            self.ctx.device.destroy_sampler(self.sampler, None);
        }
    }
}

/// Linear-filtered repeating sampler with anisotropy, matching what the
/// loaded OBJ textures expect.
fn create_sampler(ctx: &Arc<VulkanContext>) -> Result<vk::Sampler> {
    let max_anisotropy = SAMPLER_ANISOTROPY.min(ctx.limits.max_sampler_anisotropy);

    let sampler_info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .anisotropy_enable(true)
        .max_anisotropy(max_anisotropy)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .compare_op(vk::CompareOp::ALWAYS);

    unsafe {
        ctx.device
            .create_sampler(&sampler_info, None)
            .map_err(|e| nebula_err!("nebula3d::vulkan", "Failed to create sampler: {:?}", e))
    }
}
