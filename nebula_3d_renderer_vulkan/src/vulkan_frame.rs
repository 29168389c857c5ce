/// Frame scheduler support - frame slots, sync primitives, transform UBO
///
/// The CPU records at most `MAX_FRAMES_IN_FLIGHT` frames ahead of the GPU.
/// Each slot owns the semaphores and fence for one in-flight frame; the ring
/// index advances modulo the slot count and is untouched by swapchain
/// recreation.

use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use nebula_3d_renderer::nebula3d::{Error, Result};
use nebula_3d_renderer::nebula_err;

use crate::vulkan_context::VulkanContext;
use crate::vulkan_transfer::{self, GpuBuffer};

/// Number of frames the CPU may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Ring arithmetic for the slot index.
pub(crate) fn next_slot(current: usize) -> usize {
    (current + 1) % MAX_FRAMES_IN_FLIGHT
}

/// Per-frame transform matrices, laid out to match the vertex shader UBO.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct TransformUniform {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

/// Compute the frame's transforms: the model spins about Z a quarter turn
/// per second of wall-clock time, viewed from a fixed eye, projected with
/// the Y axis flipped for Vulkan clip space.
pub(crate) fn compute_uniform(elapsed_secs: f32, aspect: f32) -> TransformUniform {
    let model = Mat4::from_rotation_z(elapsed_secs * std::f32::consts::FRAC_PI_2);
    let view = Mat4::look_at_rh(Vec3::new(2.0, 2.0, 2.0), Vec3::ZERO, Vec3::Z);
    let mut proj = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 10.0);
    proj.y_axis.y *= -1.0;

    TransformUniform { model, view, proj }
}

/// Synchronization primitives for one in-flight frame.
pub(crate) struct FrameSlot {
    /// Signalled when the acquired swapchain image is ready to render into
    pub image_available: vk::Semaphore,
    /// Signalled when rendering commands finish, waited on by present
    pub render_finished: vk::Semaphore,
    /// Signalled when the GPU finishes the slot's frame; created signalled
    /// so the first wait passes
    pub in_flight: vk::Fence,
}

/// The fixed ring of frame slots.
pub(crate) struct FrameSlots {
    ctx: Arc<VulkanContext>,
    slots: Vec<FrameSlot>,
    current: usize,
}

impl FrameSlots {
    pub fn new(ctx: Arc<VulkanContext>) -> Result<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        let mut slots = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            unsafe {
                let image_available = ctx
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .map_err(|e| {
                        Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                    })?;
                let render_finished = ctx
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .map_err(|e| {
                        Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                    })?;
                let in_flight = ctx.device.create_fence(&fence_info, None).map_err(|e| {
                    Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
                })?;

                slots.push(FrameSlot {
                    image_available,
                    render_finished,
                    in_flight,
                });
            }
        }

        Ok(Self {
            ctx,
            slots,
            current: 0,
        })
    }

    pub fn current(&self) -> &FrameSlot {
        &self.slots[self.current]
    }

    /// Block until the GPU finishes the frame last recorded in this slot.
    pub fn wait_current(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .wait_for_fences(&[self.current().in_flight], true, u64::MAX)
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to wait for frame fence: {:?}", e)
                })
        }
    }

    /// Reset the slot fence. Only called once a submit is guaranteed to
    /// follow, so the next wait cannot deadlock on a skipped frame.
    pub fn reset_current(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .reset_fences(&[self.current().in_flight])
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to reset frame fence: {:?}", e)
                })
        }
    }

    pub fn advance(&mut self) {
        self.current = next_slot(self.current);
    }
}

impl Drop for FrameSlots {
    fn drop(&mut self) {
        unsafe {
            for slot in &self.slots {
                self.ctx.device.destroy_semaphore(slot.image_available, None);
                self.ctx.device.destroy_semaphore(slot.render_finished, None);
                self.ctx.device.destroy_fence(slot.in_flight, None);
            }
        }
    }
}

/// One persistently mapped uniform buffer per swapchain image.
///
/// Buffers are keyed by the acquired image index, not the slot index: the
/// image's previous frame has fully retired by the time acquire returns it,
/// so rewriting its buffer cannot race the GPU.
pub(crate) struct UniformBuffers {
    buffers: Vec<GpuBuffer>,
}

impl UniformBuffers {
    pub fn new(ctx: &Arc<VulkanContext>, image_count: usize) -> Result<Self> {
        let size = std::mem::size_of::<TransformUniform>() as u64;
        let mut buffers = Vec::with_capacity(image_count);
        for _ in 0..image_count {
            buffers.push(vulkan_transfer::create_host_buffer(
                ctx,
                size,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                "transform uniform",
            )?);
        }
        Ok(Self { buffers })
    }

    pub fn buffer(&self, image_index: u32) -> &GpuBuffer {
        &self.buffers[image_index as usize]
    }

    pub fn update(&self, image_index: u32, uniform: &TransformUniform) -> Result<()> {
        self.buffer(image_index).write(0, bytemuck::bytes_of(uniform))
    }

    pub fn count(&self) -> usize {
        self.buffers.len()
    }
}
