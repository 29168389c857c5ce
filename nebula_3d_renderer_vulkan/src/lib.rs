/*!
# Nebula 3D Renderer - Vulkan Backend

Vulkan implementation of the Nebula 3D renderer.

This crate provides the GPU side of the renderer using the Ash library for
Vulkan bindings and gpu-allocator for memory management: device and queue
setup, staged resource uploads, swapchain management, the fixed render pass
and graphics pipeline, and the double-buffered frame loop.

Enable the `vulkan-validation` cargo feature to compile in validation layer
support; `Config::enable_validation` then decides at runtime whether the
layers are actually loaded.
*/

mod vulkan_context;
mod vulkan_frame;
mod vulkan_mesh;
mod vulkan_pipeline;
mod vulkan_renderer;
mod vulkan_swapchain;
mod vulkan_transfer;

#[cfg(feature = "vulkan-validation")]
mod debug;

#[cfg(test)]
mod vulkan_frame_tests;
#[cfg(test)]
mod vulkan_mesh_tests;
#[cfg(test)]
mod vulkan_renderer_tests;
#[cfg(test)]
mod vulkan_swapchain_tests;
#[cfg(test)]
mod vulkan_transfer_tests;

pub use vulkan_context::VulkanContext;
pub use vulkan_frame::MAX_FRAMES_IN_FLIGHT;
pub use vulkan_mesh::GpuMesh;
pub use vulkan_renderer::VulkanRenderer;
pub use vulkan_transfer::{GpuBuffer, GpuImage};
