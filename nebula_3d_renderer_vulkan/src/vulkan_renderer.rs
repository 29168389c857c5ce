/// VulkanRenderer - top-level renderer and frame scheduler
///
/// Wires the device context, render pass, swapchain, pipeline, uniform
/// buffers and frame slots together, and drives the per-frame loop:
/// wait -> acquire -> update -> record -> submit -> present -> advance.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use nebula_3d_renderer::nebula3d::asset::Model;
use nebula_3d_renderer::nebula3d::{Config, Result};
use nebula_3d_renderer::{nebula_bail, nebula_err, nebula_info};

use crate::vulkan_context::VulkanContext;
use crate::vulkan_frame::{self, FrameSlots, UniformBuffers};
use crate::vulkan_mesh::GpuMesh;
use crate::vulkan_pipeline::{self, GraphicsPipeline};
use crate::vulkan_swapchain::{choose_surface_format, SwapchainState};
use crate::vulkan_transfer::DEPTH_FORMAT;

/// Whether the per-image resources (command buffers, uniform buffers,
/// descriptor sets) no longer match the swapchain image count. A recreated
/// swapchain may legally come back with a different count than the one it
/// replaced.
pub(crate) fn per_image_resources_stale(image_count: usize, resource_count: usize) -> bool {
    image_count != resource_count
}

pub struct VulkanRenderer {
    meshes: Vec<GpuMesh>,

    uniforms: UniformBuffers,
    slots: FrameSlots,
    swapchain: SwapchainState,
    pipeline: GraphicsPipeline,
    render_pass: vk::RenderPass,

    descriptor_pool: vk::DescriptorPool,
    command_pool: vk::CommandPool,
    /// One re-recordable command buffer per swapchain image
    command_buffers: Vec<vk::CommandBuffer>,

    clear_color: [f32; 4],
    start_time: Instant,

    /// Last known nonzero framebuffer size
    window_size: (u32, u32),
    /// Set by `resize`, consumed after the next present
    resize_requested: bool,

    ctx: Arc<VulkanContext>,
}

impl VulkanRenderer {
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: Config,
    ) -> Result<Self> {
        let ctx = VulkanContext::new(window, &config)?;

        // The render pass is built against the surface format the swapchain
        // will pick, and survives every recreation
        let support = ctx.swapchain_support()?;
        let surface_format = choose_surface_format(&support.formats);
        let render_pass =
            vulkan_pipeline::create_render_pass(&ctx.device, surface_format.format, DEPTH_FORMAT)?;

        let swapchain = SwapchainState::new(
            Arc::clone(&ctx),
            render_pass,
            config.window_width,
            config.window_height,
        )?;
        let pipeline = GraphicsPipeline::new(Arc::clone(&ctx), render_pass)?;
        let uniforms = UniformBuffers::new(&ctx, swapchain.image_count())?;
        let slots = FrameSlots::new(Arc::clone(&ctx))?;

        let (command_pool, command_buffers) =
            Self::create_command_buffers(&ctx, swapchain.image_count())?;
        let descriptor_pool = Self::create_descriptor_pool(&ctx)?;

        nebula_info!(
            "nebula3d::vulkan",
            "Renderer initialized ({}x{}, {} swapchain images)",
            swapchain.extent().width,
            swapchain.extent().height,
            swapchain.image_count()
        );

        Ok(Self {
            meshes: Vec::new(),
            uniforms,
            slots,
            swapchain,
            pipeline,
            render_pass,
            descriptor_pool,
            command_pool,
            command_buffers,
            clear_color: config.clear_color,
            start_time: Instant::now(),
            window_size: (config.window_width, config.window_height),
            resize_requested: false,
            ctx,
        })
    }

    fn create_command_buffers(
        ctx: &Arc<VulkanContext>,
        count: usize,
    ) -> Result<(vk::CommandPool, Vec<vk::CommandBuffer>)> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(ctx.graphics_queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        unsafe {
            let pool = ctx.device.create_command_pool(&pool_info, None).map_err(|e| {
                nebula_err!("nebula3d::vulkan", "Failed to create command pool: {:?}", e)
            })?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(count as u32);

            let buffers = ctx
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| {
                    ctx.device.destroy_command_pool(pool, None);
                    nebula_err!(
                        "nebula3d::vulkan",
                        "Failed to allocate command buffers: {:?}",
                        e
                    )
                })?;

            Ok((pool, buffers))
        }
    }

    fn create_descriptor_pool(ctx: &Arc<VulkanContext>) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 256,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 256,
            },
        ];
        let info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(256);

        unsafe {
            ctx.device.create_descriptor_pool(&info, None).map_err(|e| {
                nebula_err!("nebula3d::vulkan", "Failed to create descriptor pool: {:?}", e)
            })
        }
    }

    /// Run the transfer engine for every mesh of the model and build its
    /// descriptor sets. Called outside the frame loop.
    pub fn upload_model(&mut self, model: &Model) -> Result<()> {
        for mesh in model.meshes() {
            let mut gpu_mesh = GpuMesh::upload(&self.ctx, mesh)?;
            gpu_mesh.create_descriptor_sets(
                self.descriptor_pool,
                self.pipeline.descriptor_set_layout,
                &self.uniforms,
            )?;
            self.meshes.push(gpu_mesh);
        }
        nebula_info!(
            "nebula3d::vulkan",
            "Model uploaded ({} meshes resident)",
            self.meshes.len()
        );
        Ok(())
    }

    /// Render and present one frame.
    ///
    /// An out-of-date swapchain at acquire time skips the frame entirely:
    /// recreate, no submit, no present, and the slot fence stays signalled
    /// so the next wait cannot deadlock.
    pub fn draw_frame(&mut self) -> Result<()> {
        self.slots.wait_current()?;

        let image_index = match self
            .swapchain
            .acquire_next_image(self.slots.current().image_available)
        {
            Ok(index) => index,
            Err(e) if e.is_recoverable() => {
                self.recreate_swapchain()?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let extent = self.swapchain.extent();
        let aspect = extent.width as f32 / extent.height as f32;
        let elapsed = self.start_time.elapsed().as_secs_f32();
        self.uniforms
            .update(image_index, &vulkan_frame::compute_uniform(elapsed, aspect))?;

        // A submit is now guaranteed, so the fence may be reset
        self.slots.reset_current()?;

        self.record_commands(image_index)?;

        let slot = self.slots.current();
        let wait_semaphores = [slot.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.command_buffers[image_index as usize]];
        let signal_semaphores = [slot.render_finished];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], slot.in_flight)
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to submit frame commands: {:?}", e)
                })?;
        }

        match self.swapchain.present(image_index, slot.render_finished) {
            Ok(()) => {
                if self.resize_requested {
                    self.recreate_swapchain()?;
                }
            }
            Err(e) if e.is_recoverable() => {
                self.recreate_swapchain()?;
            }
            Err(e) => return Err(e),
        }

        self.slots.advance();
        Ok(())
    }

    fn record_commands(&self, image_index: u32) -> Result<()> {
        if image_index as usize >= self.command_buffers.len() {
            nebula_bail!(
                "nebula3d::vulkan",
                "record_commands: image index {} out of range (count: {})",
                image_index,
                self.command_buffers.len()
            );
        }

        let device = &self.ctx.device;
        let command_buffer = self.command_buffers[image_index as usize];
        let extent = self.swapchain.extent();

        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to reset command buffer: {:?}", e)
                })?;

            let begin_info = vk::CommandBufferBeginInfo::default();
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to begin command buffer: {:?}", e)
                })?;

            let clear_values = [
                vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: self.clear_color,
                    },
                },
                vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: 1.0,
                        stencil: 0,
                    },
                },
            ];

            let render_pass_begin = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass)
                .framebuffer(self.swapchain.framebuffer(image_index))
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.pipeline,
            );

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            let scissor = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            };
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[scissor]);

            for mesh in &self.meshes {
                mesh.record_draw(command_buffer, self.pipeline.pipeline_layout, image_index);
            }

            device.cmd_end_render_pass(command_buffer);
            device.end_command_buffer(command_buffer).map_err(|e| {
                nebula_err!("nebula3d::vulkan", "Failed to end command buffer: {:?}", e)
            })?;
        }

        Ok(())
    }

    fn recreate_swapchain(&mut self) -> Result<()> {
        let (width, height) = self.window_size;
        // Zero-size surfaces cannot back a swapchain; the caller pauses
        // redraws until a nonzero resize arrives
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.swapchain.recreate(width, height)?;
        self.resize_requested = false;

        // The new swapchain is not obliged to keep the old image count;
        // every per-image array must track it or indexing by the acquired
        // image index goes out of bounds.
        if per_image_resources_stale(self.swapchain.image_count(), self.command_buffers.len()) {
            self.rebuild_per_image_resources()?;
        }
        Ok(())
    }

    /// Resize the command buffers, uniform buffers and descriptor sets to the
    /// current swapchain image count. The device is idle here: `recreate`
    /// drained it before tearing the old swapchain down.
    fn rebuild_per_image_resources(&mut self) -> Result<()> {
        let count = self.swapchain.image_count();
        nebula_info!(
            "nebula3d::vulkan",
            "Swapchain image count changed ({} -> {}), rebuilding per-image resources",
            self.command_buffers.len(),
            count
        );

        unsafe {
            self.ctx
                .device
                .free_command_buffers(self.command_pool, &self.command_buffers);

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(count as u32);
            self.command_buffers = self
                .ctx
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| {
                    nebula_err!(
                        "nebula3d::vulkan",
                        "Failed to allocate command buffers: {:?}",
                        e
                    )
                })?;
        }

        self.uniforms = UniformBuffers::new(&self.ctx, count)?;

        // Descriptor sets are allocated without the individual-free flag, so
        // the pool is reset wholesale and every mesh reallocates its sets
        // against the new uniform buffers.
        unsafe {
            self.ctx
                .device
                .reset_descriptor_pool(self.descriptor_pool, vk::DescriptorPoolResetFlags::empty())
                .map_err(|e| {
                    nebula_err!(
                        "nebula3d::vulkan",
                        "Failed to reset descriptor pool: {:?}",
                        e
                    )
                })?;
        }
        for mesh in &mut self.meshes {
            mesh.create_descriptor_sets(
                self.descriptor_pool,
                self.pipeline.descriptor_set_layout,
                &self.uniforms,
            )?;
        }

        debug_assert_eq!(self.command_buffers.len(), self.uniforms.count());
        Ok(())
    }

    /// Record a new framebuffer size. Zero sizes are ignored; the swapchain
    /// is actually recreated after the next present.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.window_size = (width, height);
        self.resize_requested = true;
    }

    /// Block until the GPU finishes all submitted work. Called before
    /// shutdown so resources are not destroyed mid-frame.
    pub fn wait_idle(&self) -> Result<()> {
        self.ctx.wait_idle()
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
            self.ctx
                .device
                .destroy_descriptor_pool(self.descriptor_pool, None);
            self.ctx.device.destroy_command_pool(self.command_pool, None);
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
