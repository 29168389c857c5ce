/// Swapchain manager - presentation images, depth buffer, framebuffers
///
/// Owns everything that depends on the window surface extent: the swapchain
/// and its images, per-image color views, the shared depth attachment, and
/// one framebuffer per image against the fixed render pass. Recreation on
/// resize destroys and rebuilds exactly this set; the render pass and
/// pipeline live outside and are preserved.

use std::sync::Arc;

use ash::vk;

use nebula_3d_renderer::nebula3d::{Error, Result};
use nebula_3d_renderer::{nebula_err, nebula_error, nebula_info};

use crate::vulkan_context::VulkanContext;
use crate::vulkan_transfer::{self, GpuImage};

/// Pick the surface format: B8G8R8A8_UNORM with sRGB nonlinear color space
/// when offered, otherwise the first format listed.
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_UNORM
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(formats[0])
}

/// Pick the present mode: MAILBOX over IMMEDIATE over FIFO. FIFO is the
/// only mode Vulkan guarantees, so it is the fallback.
pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else if modes.contains(&vk::PresentModeKHR::IMMEDIATE) {
        vk::PresentModeKHR::IMMEDIATE
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Pick the swap extent: the surface's current extent when the platform
/// defines one, otherwise the framebuffer size clamped into the allowed
/// min/max image extent.
pub(crate) fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Pick the image count: one more than the minimum, capped by the maximum
/// when the surface has one (max == 0 means unbounded).
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// The swapchain and every resource sized to its extent.
///
/// Invariant: `image_views` and `framebuffers` always have exactly one entry
/// per swapchain image.
pub(crate) struct SwapchainState {
    ctx: Arc<VulkanContext>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,

    format: vk::Format,
    extent: vk::Extent2D,

    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    depth_image: Option<GpuImage>,
    framebuffers: Vec<vk::Framebuffer>,

    render_pass: vk::RenderPass,
}

impl SwapchainState {
    pub fn new(
        ctx: Arc<VulkanContext>,
        render_pass: vk::RenderPass,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(ctx.instance(), &ctx.device);

        let mut state = Self {
            ctx,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            format: vk::Format::UNDEFINED,
            extent: vk::Extent2D::default(),
            images: Vec::new(),
            image_views: Vec::new(),
            depth_image: None,
            framebuffers: Vec::new(),
            render_pass,
        };
        state.create(width, height)?;
        Ok(state)
    }

    /// Surface format of the swapchain images (fixed at first creation).
    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn framebuffer(&self, image_index: u32) -> vk::Framebuffer {
        self.framebuffers[image_index as usize]
    }

    /// Acquire the next presentable image, signalling `semaphore` when it is
    /// ready. Out-of-date surfaces map to the recoverable error.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<u32> {
        unsafe {
            match self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            ) {
                Ok((image_index, _is_suboptimal)) => Ok(image_index),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SwapchainOutOfDate),
                Err(e) => Err(nebula_err!(
                    "nebula3d::vulkan",
                    "Failed to acquire next swapchain image: {:?}",
                    e
                )),
            }
        }
    }

    /// Queue the image for presentation after `wait_semaphore` signals.
    /// Both out-of-date and suboptimal surfaces map to the recoverable error
    /// so the caller recreates before the next frame.
    pub fn present(&self, image_index: u32, wait_semaphore: vk::Semaphore) -> Result<()> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            match self
                .swapchain_loader
                .queue_present(self.ctx.present_queue, &present_info)
            {
                Ok(false) => Ok(()),
                Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) => Err(Error::SwapchainOutOfDate),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SwapchainOutOfDate),
                Err(e) => Err(nebula_err!(
                    "nebula3d::vulkan",
                    "Failed to present swapchain image: {:?}",
                    e
                )),
            }
        }
    }

    /// Destroy and rebuild everything extent-dependent at the new size.
    pub fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.ctx.wait_idle()?;
        self.destroy_resources();
        self.create(width, height)?;
        nebula_info!(
            "nebula3d::vulkan",
            "Swapchain recreated at {}x{}",
            self.extent.width,
            self.extent.height
        );
        Ok(())
    }

    fn create(&mut self, width: u32, height: u32) -> Result<()> {
        let support = self.ctx.swapchain_support()?;

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, width, height);
        let image_count = choose_image_count(&support.capabilities);

        // Images are shared between queues only when graphics and present
        // live on different families
        let family_indices = [
            self.ctx.graphics_queue_family,
            self.ctx.present_queue_family,
        ];
        let (sharing_mode, queue_family_indices): (vk::SharingMode, &[u32]) =
            if self.ctx.graphics_queue_family != self.ctx.present_queue_family {
                (vk::SharingMode::CONCURRENT, &family_indices)
            } else {
                (vk::SharingMode::EXCLUSIVE, &[])
            };

        let old_swapchain = self.swapchain;
        let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.ctx.surface())
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(queue_family_indices)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        unsafe {
            let swapchain = self
                .swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| {
                    nebula_error!("nebula3d::vulkan", "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;

            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.format = surface_format.format;
            self.extent = extent;

            self.images = self
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to get swapchain images: {:?}", e)
                })?;
        }

        for &image in &self.images {
            let view = self.ctx.create_image_view(
                image,
                self.format,
                vk::ImageAspectFlags::COLOR,
            )?;
            self.image_views.push(view);
        }

        // One depth attachment shared by all framebuffers; frames render
        // one at a time so no per-image depth is needed
        let depth_image = vulkan_transfer::create_depth_image(&self.ctx, extent)?;

        for &view in &self.image_views {
            let attachments = [view, depth_image.view()];
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(self.render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = unsafe {
                self.ctx
                    .device
                    .create_framebuffer(&framebuffer_info, None)
                    .map_err(|e| {
                        nebula_err!("nebula3d::vulkan", "Failed to create framebuffer: {:?}", e)
                    })?
            };
            self.framebuffers.push(framebuffer);
        }
        self.depth_image = Some(depth_image);

        debug_assert_eq!(self.image_views.len(), self.images.len());
        debug_assert_eq!(self.framebuffers.len(), self.images.len());

        Ok(())
    }

    /// Destroy everything extent-dependent, keeping the swapchain handle for
    /// use as `old_swapchain` during recreation.
    fn destroy_resources(&mut self) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                self.ctx.device.destroy_framebuffer(framebuffer, None);
            }
            self.framebuffers.clear();

            self.depth_image = None;

            for &view in &self.image_views {
                self.ctx.device.destroy_image_view(view, None);
            }
            self.image_views.clear();
            self.images.clear();
        }
    }
}

impl Drop for SwapchainState {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
            self.destroy_resources();
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
        }
    }
}
