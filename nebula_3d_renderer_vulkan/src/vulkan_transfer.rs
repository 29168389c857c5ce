/// Resource transfer engine - staged uploads of buffers and images
///
/// All device-local resources are filled through a host-visible staging
/// buffer and a one-shot command buffer on the graphics queue. Uploads are
/// fully synchronous: the queue is drained before the staging buffer is
/// destroyed, and nothing here runs inside the frame loop.

use std::sync::{Arc, PoisonError};

use ash::vk;
use bytemuck::Pod;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;

use nebula_3d_renderer::nebula3d::asset::ImageData;
use nebula_3d_renderer::nebula3d::{Error, Result};
use nebula_3d_renderer::{nebula_bail, nebula_err, nebula_trace};

use crate::vulkan_context::VulkanContext;

/// Texture format used for all sampled images.
pub(crate) const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Depth attachment format.
pub(crate) const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Return an allocation to the shared allocator. Used by the resource drops
/// and by the constructor error paths, so a half-built resource never leaks
/// its memory.
fn free_allocation(ctx: &VulkanContext, allocation: Allocation) {
    // Don't panic if the lock is poisoned - the memory must still be freed
    let mut allocator = ctx.allocator.lock().unwrap_or_else(PoisonError::into_inner);
    allocator.free(allocation).ok();
}

/// A GPU buffer owning its handle and memory allocation.
///
/// The handle and the allocation are released together on drop, through the
/// shared context that created them.
pub struct GpuBuffer {
    ctx: Arc<VulkanContext>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
}

impl GpuBuffer {
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Copy `data` into a host-visible buffer at `offset`.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| Error::BackendError("Buffer has no allocation".to_string()))?;
        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?
            .as_ptr() as *mut u8;

        if offset + data.len() as u64 > self.size {
            nebula_bail!(
                "nebula3d::vulkan",
                "Write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                self.size
            );
        }

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped_ptr.offset(offset as isize),
                data.len(),
            );
        }
        Ok(())
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                free_allocation(&self.ctx, allocation);
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

/// A GPU image owning its handle, view, and memory allocation.
pub struct GpuImage {
    ctx: Arc<VulkanContext>,
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl GpuImage {
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
            if let Some(allocation) = self.allocation.take() {
                free_allocation(&self.ctx, allocation);
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}

/// Access masks and pipeline stages for an image layout transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransitionMasks {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Map an (old, new) layout pair to its barrier masks and stages.
///
/// The renderer performs exactly three transitions; any other pair is a
/// programming error and is rejected rather than guessed at.
pub(crate) fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Result<TransitionMasks> {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Ok(TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        }),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            })
        }
        (old, new) => Err(Error::UnsupportedLayoutTransition(format!(
            "{:?} -> {:?}",
            old, new
        ))),
    }
}

/// Record an image layout transition barrier into `command_buffer`.
fn transition_image_layout(
    ctx: &VulkanContext,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Result<()> {
    let masks = transition_masks(old_layout, new_layout)?;

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(masks.src_access)
        .dst_access_mask(masks.dst_access);

    unsafe {
        ctx.device.cmd_pipeline_barrier(
            command_buffer,
            masks.src_stage,
            masks.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
    Ok(())
}

/// Create a buffer and bind freshly allocated memory to it.
fn create_buffer(
    ctx: &Arc<VulkanContext>,
    size: u64,
    usage: vk::BufferUsageFlags,
    location: MemoryLocation,
    name: &str,
) -> Result<GpuBuffer> {
    let buffer_info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    unsafe {
        let buffer = ctx.device.create_buffer(&buffer_info, None).map_err(|e| {
            nebula_err!("nebula3d::vulkan", "Failed to create buffer '{}': {:?}", name, e)
        })?;
        let requirements = ctx.device.get_buffer_memory_requirements(buffer);

        let allocation = {
            let mut allocator = ctx.allocator.lock().unwrap_or_else(PoisonError::into_inner);
            allocator
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    ctx.device.destroy_buffer(buffer, None);
                    match e {
                        gpu_allocator::AllocationError::OutOfMemory => Error::OutOfMemory,
                        other => Error::BackendError(format!(
                            "Failed to allocate memory for '{}': {:?}",
                            name, other
                        )),
                    }
                })?
        };

        if let Err(e) = ctx
            .device
            .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        {
            free_allocation(ctx, allocation);
            ctx.device.destroy_buffer(buffer, None);
            return Err(nebula_err!(
                "nebula3d::vulkan",
                "Failed to bind buffer memory: {:?}",
                e
            ));
        }

        Ok(GpuBuffer {
            ctx: Arc::clone(ctx),
            buffer,
            allocation: Some(allocation),
            size,
        })
    }
}

/// Create a host-visible, persistently mapped buffer (uniforms, staging).
pub(crate) fn create_host_buffer(
    ctx: &Arc<VulkanContext>,
    size: u64,
    usage: vk::BufferUsageFlags,
    name: &str,
) -> Result<GpuBuffer> {
    create_buffer(ctx, size, usage, MemoryLocation::CpuToGpu, name)
}

/// Upload a slice of POD data into a device-local buffer.
///
/// Staging buffer write, one-shot copy, queue drain, staging destroyed
/// before return.
pub fn upload_buffer<T: Pod>(
    ctx: &Arc<VulkanContext>,
    data: &[T],
    usage: vk::BufferUsageFlags,
) -> Result<GpuBuffer> {
    let bytes: &[u8] = bytemuck::cast_slice(data);
    if bytes.is_empty() {
        return Err(Error::InvalidResource(
            "Cannot upload an empty buffer".to_string(),
        ));
    }
    let size = bytes.len() as u64;

    let staging = create_host_buffer(ctx, size, vk::BufferUsageFlags::TRANSFER_SRC, "staging")?;
    staging.write(0, bytes)?;

    let dst = create_buffer(
        ctx,
        size,
        vk::BufferUsageFlags::TRANSFER_DST | usage,
        MemoryLocation::GpuOnly,
        "device-local buffer",
    )?;

    let command_buffer = ctx.begin_one_shot_commands()?;
    unsafe {
        let region = vk::BufferCopy::default().size(size);
        ctx.device
            .cmd_copy_buffer(command_buffer, staging.handle(), dst.handle(), &[region]);
    }
    ctx.end_one_shot_commands(command_buffer)?;

    nebula_trace!("nebula3d::vulkan", "Uploaded buffer ({} bytes)", size);
    Ok(dst)
}

/// Upload decoded RGBA8 pixels into a device-local sampled image.
///
/// UNDEFINED -> TRANSFER_DST before the copy, TRANSFER_DST -> SHADER_READ_ONLY
/// after it; the returned image is ready for sampling.
pub fn upload_image(ctx: &Arc<VulkanContext>, data: &ImageData) -> Result<GpuImage> {
    let size = data.byte_size();
    if size == 0 {
        return Err(Error::InvalidResource(
            "Cannot upload an empty image".to_string(),
        ));
    }

    let staging = create_host_buffer(ctx, size, vk::BufferUsageFlags::TRANSFER_SRC, "staging")?;
    staging.write(0, data.pixels())?;

    let extent = vk::Extent2D {
        width: data.width(),
        height: data.height(),
    };
    let image = create_image(
        ctx,
        extent,
        TEXTURE_FORMAT,
        vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        vk::ImageAspectFlags::COLOR,
        "texture",
    )?;

    let command_buffer = ctx.begin_one_shot_commands()?;
    transition_image_layout(
        ctx,
        command_buffer,
        image.image,
        vk::ImageAspectFlags::COLOR,
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    )?;

    unsafe {
        let region = vk::BufferImageCopy::default()
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            });
        ctx.device.cmd_copy_buffer_to_image(
            command_buffer,
            staging.handle(),
            image.image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );
    }

    transition_image_layout(
        ctx,
        command_buffer,
        image.image,
        vk::ImageAspectFlags::COLOR,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    )?;
    ctx.end_one_shot_commands(command_buffer)?;

    nebula_trace!(
        "nebula3d::vulkan",
        "Uploaded image ({}x{}, {} bytes)",
        extent.width,
        extent.height,
        size
    );
    Ok(image)
}

/// Create the shared depth attachment for the swapchain extent.
pub(crate) fn create_depth_image(
    ctx: &Arc<VulkanContext>,
    extent: vk::Extent2D,
) -> Result<GpuImage> {
    let image = create_image(
        ctx,
        extent,
        DEPTH_FORMAT,
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        vk::ImageAspectFlags::DEPTH,
        "depth attachment",
    )?;

    let command_buffer = ctx.begin_one_shot_commands()?;
    transition_image_layout(
        ctx,
        command_buffer,
        image.image,
        vk::ImageAspectFlags::DEPTH,
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    )?;
    ctx.end_one_shot_commands(command_buffer)?;

    Ok(image)
}

/// Create a 2D image with bound device-local memory and a view.
fn create_image(
    ctx: &Arc<VulkanContext>,
    extent: vk::Extent2D,
    format: vk::Format,
    usage: vk::ImageUsageFlags,
    aspect_mask: vk::ImageAspectFlags,
    name: &str,
) -> Result<GpuImage> {
    let image_info = vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .format(format)
        .extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        })
        .mip_levels(1)
        .array_layers(1)
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(vk::ImageLayout::UNDEFINED);

    unsafe {
        let image = ctx.device.create_image(&image_info, None).map_err(|e| {
            nebula_err!("nebula3d::vulkan", "Failed to create image '{}': {:?}", name, e)
        })?;
        let requirements = ctx.device.get_image_memory_requirements(image);

        let allocation = {
            let mut allocator = ctx.allocator.lock().unwrap_or_else(PoisonError::into_inner);
            allocator
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    ctx.device.destroy_image(image, None);
                    match e {
                        gpu_allocator::AllocationError::OutOfMemory => Error::OutOfMemory,
                        other => Error::BackendError(format!(
                            "Failed to allocate memory for '{}': {:?}",
                            name, other
                        )),
                    }
                })?
        };

        if let Err(e) = ctx
            .device
            .bind_image_memory(image, allocation.memory(), allocation.offset())
        {
            free_allocation(ctx, allocation);
            ctx.device.destroy_image(image, None);
            return Err(nebula_err!(
                "nebula3d::vulkan",
                "Failed to bind image memory: {:?}",
                e
            ));
        }

        let view = match ctx.create_image_view(image, format, aspect_mask) {
            Ok(view) => view,
            Err(e) => {
                free_allocation(ctx, allocation);
                ctx.device.destroy_image(image, None);
                return Err(e);
            }
        };

        Ok(GpuImage {
            ctx: Arc::clone(ctx),
            image,
            view,
            allocation: Some(allocation),
            format,
            extent,
        })
    }
}
