/// VulkanContext - Device context shared by all GPU resources
///
/// Owns the Vulkan instance, surface, physical/logical device, queues,
/// GPU memory allocator and the upload command pool. Every GPU resource
/// holds an `Arc<VulkanContext>` so handles and their memory are always
/// released through the context that created them.

use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, PoisonError};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use nebula_3d_renderer::nebula3d::{Config, Error, Result};
use nebula_3d_renderer::{nebula_err, nebula_error, nebula_info};

/// Queue family indices discovered during physical device selection.
///
/// Graphics and present capabilities may live on different families; both
/// must be found for a device to be usable.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }
}

/// Surface capabilities snapshot used for swapchain creation.
pub(crate) struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// Shared device context.
///
/// Construction performs the full bring-up in order: entry load, instance
/// (plus validation layer and debug messenger when enabled), surface,
/// physical device selection, logical device and queues, allocator, upload
/// command pool. `Drop` tears everything down in reverse.
pub struct VulkanContext {
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub device: ash::Device,

    /// Physical device limits (sampler anisotropy cap, etc.)
    pub limits: vk::PhysicalDeviceLimits,

    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    /// Graphics queue for command submission
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,
    /// Present queue (may be the same as graphics)
    pub present_queue: vk::Queue,
    pub present_queue_family: u32,

    /// GPU memory allocator (shared, requires mutex for &self access).
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed.
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Reusable command pool for one-shot upload operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    upload_command_pool: Mutex<vk::CommandPool>,

    #[cfg(feature = "vulkan-validation")]
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanContext {
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &Config,
    ) -> Result<Arc<Self>> {
        let enable_validation = cfg!(feature = "vulkan-validation") && config.enable_validation;

        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                nebula_error!("nebula3d::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            // Application Info
            let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
                Error::InitializationFailed(format!("Invalid application name: {}", e))
            })?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Nebula3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            // Required instance extensions for the window surface
            let display_handle = window.display_handle().map_err(|e| {
                nebula_error!("nebula3d::vulkan", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let mut extension_names =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| {
                        nebula_error!(
                            "nebula3d::vulkan",
                            "Failed to get required extensions: {}",
                            e
                        );
                        Error::InitializationFailed(format!(
                            "Failed to get required extensions: {}",
                            e
                        ))
                    })?
                    .to_vec();

            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                nebula_error!("nebula3d::vulkan", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            // Debug messenger (validation builds only)
            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) = if enable_validation {
                let (loader, messenger) = crate::debug::create_debug_messenger(&entry, &instance)?;
                (Some(loader), Some(messenger))
            } else {
                (None, None)
            };

            // Window surface
            let window_handle = window.window_handle().map_err(|e| {
                nebula_error!("nebula3d::vulkan", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                nebula_error!("nebula3d::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Pick the first physical device that can render to the surface
            let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
                nebula_error!("nebula3d::vulkan", "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!(
                    "Failed to enumerate physical devices: {:?}",
                    e
                ))
            })?;

            if physical_devices.is_empty() {
                nebula_error!("nebula3d::vulkan", "No Vulkan-capable GPU found");
                return Err(Error::InitializationFailed(
                    "No Vulkan-capable GPU found".to_string(),
                ));
            }

            let mut selected = None;
            for physical_device in physical_devices {
                if let Some(indices) =
                    Self::check_device(&instance, &surface_loader, surface, physical_device)?
                {
                    selected = Some((physical_device, indices));
                    break;
                }
            }

            let (physical_device, indices) = selected.ok_or_else(|| {
                nebula_error!(
                    "nebula3d::vulkan",
                    "No GPU with swapchain support and suitable queue families found"
                );
                Error::InitializationFailed("No suitable GPU found".to_string())
            })?;

            let properties = instance.get_physical_device_properties(physical_device);
            nebula_info!(
                "nebula3d::vulkan",
                "Selected GPU: {:?}",
                properties.device_name_as_c_str().unwrap_or(c"<unknown>")
            );

            // is_complete() held during selection
            let graphics_family = indices.graphics.ok_or_else(|| {
                Error::InitializationFailed("No graphics queue family found".to_string())
            })?;
            let present_family = indices.present.ok_or_else(|| {
                Error::InitializationFailed("No present queue family found".to_string())
            })?;

            // Logical device with one queue per unique family
            let queue_priorities = [1.0];
            let queue_create_infos: Vec<_> = if graphics_family == present_family {
                vec![vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_family)
                    .queue_priorities(&queue_priorities)]
            } else {
                vec![
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(graphics_family)
                        .queue_priorities(&queue_priorities),
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_family)
                        .queue_priorities(&queue_priorities),
                ]
            };

            let device_extension_names = vec![ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    nebula_error!("nebula3d::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family, 0);
            let present_queue = device.get_device_queue(present_family, 0);

            // GPU memory allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                nebula_error!("nebula3d::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            // Upload command pool (TRANSIENT + RESET for reusable one-shot uploads)
            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family)
                .flags(
                    vk::CommandPoolCreateFlags::TRANSIENT
                        | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                );

            let upload_command_pool = device
                .create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| {
                    nebula_error!(
                        "nebula3d::vulkan",
                        "Failed to create upload command pool: {:?}",
                        e
                    );
                    Error::InitializationFailed(format!(
                        "Failed to create upload command pool: {:?}",
                        e
                    ))
                })?;

            Ok(Arc::new(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                limits: properties.limits,
                surface,
                surface_loader,
                graphics_queue,
                graphics_queue_family: graphics_family,
                present_queue,
                present_queue_family: present_family,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                upload_command_pool: Mutex::new(upload_command_pool),
                #[cfg(feature = "vulkan-validation")]
                debug_utils_loader,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
            }))
        }
    }

    /// Check a physical device for swapchain support, usable surface formats
    /// and complete queue families. Returns the queue family indices when the
    /// device is suitable.
    unsafe fn check_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Option<QueueFamilyIndices>> {
        let extensions = instance
            .enumerate_device_extension_properties(physical_device)
            .map_err(|e| {
                nebula_err!("nebula3d::vulkan", "Failed to query device extensions: {:?}", e)
            })?;
        let has_swapchain = extensions.iter().any(|ext| {
            ext.extension_name_as_c_str()
                .map(|name| name == ash::khr::swapchain::NAME)
                .unwrap_or(false)
        });
        if !has_swapchain {
            return Ok(None);
        }

        let formats = surface_loader
            .get_physical_device_surface_formats(physical_device, surface)
            .unwrap_or_default();
        let present_modes = surface_loader
            .get_physical_device_surface_present_modes(physical_device, surface)
            .unwrap_or_default();
        if formats.is_empty() || present_modes.is_empty() {
            return Ok(None);
        }

        let indices = Self::find_queue_families(instance, surface_loader, surface, physical_device);
        if indices.is_complete() {
            Ok(Some(indices))
        } else {
            Ok(None)
        }
    }

    /// Find the first graphics-capable and first present-capable queue family
    /// indices, stopping as soon as both are known.
    unsafe fn find_queue_families(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> QueueFamilyIndices {
        let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

        let mut indices = QueueFamilyIndices::default();
        for (i, family) in queue_families.iter().enumerate() {
            let i = i as u32;
            if indices.graphics.is_none()
                && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            {
                indices.graphics = Some(i);
            }
            if indices.present.is_none() {
                let supported = surface_loader
                    .get_physical_device_surface_support(physical_device, i, surface)
                    .unwrap_or(false);
                if supported {
                    indices.present = Some(i);
                }
            }
            if indices.is_complete() {
                break;
            }
        }
        indices
    }

    /// Query the current surface capabilities, formats, and present modes.
    /// Called at swapchain creation and on every recreation.
    pub(crate) fn swapchain_support(&self) -> Result<SwapchainSupport> {
        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| {
                    nebula_err!(
                        "nebula3d::vulkan",
                        "Failed to get surface capabilities: {:?}",
                        e
                    )
                })?;
            let formats = self
                .surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to get surface formats: {:?}", e)
                })?;
            let present_modes = self
                .surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, self.surface)
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to get present modes: {:?}", e)
                })?;

            Ok(SwapchainSupport {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    pub(crate) fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub(crate) fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Create a 2D image view over a single mip level and array layer.
    pub(crate) fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe {
            self.device
                .create_image_view(&create_info, None)
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to create image view: {:?}", e)
                })
        }
    }

    /// Begin a one-shot command buffer from the upload pool.
    ///
    /// Pair with [`end_one_shot_commands`](Self::end_one_shot_commands); the
    /// buffer records exactly once and is freed after submission.
    pub(crate) fn begin_one_shot_commands(&self) -> Result<vk::CommandBuffer> {
        let pool = *self
            .upload_command_pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        unsafe {
            let command_buffer = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| {
                    nebula_err!(
                        "nebula3d::vulkan",
                        "Failed to allocate upload command buffer: {:?}",
                        e
                    )
                })?[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| {
                    nebula_err!(
                        "nebula3d::vulkan",
                        "Failed to begin upload command buffer: {:?}",
                        e
                    )
                })?;

            Ok(command_buffer)
        }
    }

    /// Submit a one-shot command buffer, block until the queue drains, and
    /// free the buffer. Synchronous by design: uploads run outside the frame
    /// loop and the staging buffer is released as soon as this returns.
    pub(crate) fn end_one_shot_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.device.end_command_buffer(command_buffer).map_err(|e| {
                nebula_err!("nebula3d::vulkan", "Failed to end upload command buffer: {:?}", e)
            })?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

            self.device
                .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| {
                    nebula_err!("nebula3d::vulkan", "Failed to submit upload commands: {:?}", e)
                })?;
            self.device.queue_wait_idle(self.graphics_queue).map_err(|e| {
                nebula_err!("nebula3d::vulkan", "Failed to wait for upload completion: {:?}", e)
            })?;

            let pool = *self
                .upload_command_pool
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.device.free_command_buffers(pool, &command_buffers);

            Ok(())
        }
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle().map_err(|e| {
                nebula_err!("nebula3d::vulkan", "Failed to wait for device idle: {:?}", e)
            })
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            let pool = *self
                .upload_command_pool
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner);
            self.device.destroy_command_pool(pool, None);

            // Allocator must release its memory blocks before the device goes away
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            #[cfg(feature = "vulkan-validation")]
            if let (Some(loader), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger)
            {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::QueueFamilyIndices;

    #[test]
    fn test_queue_family_indices_complete() {
        let indices = QueueFamilyIndices {
            graphics: Some(0),
            present: Some(2),
        };
        assert!(indices.is_complete());
    }

    #[test]
    fn test_queue_family_indices_incomplete() {
        assert!(!QueueFamilyIndices::default().is_complete());
        assert!(!QueueFamilyIndices {
            graphics: Some(0),
            present: None
        }
        .is_complete());
        assert!(!QueueFamilyIndices {
            graphics: None,
            present: Some(1)
        }
        .is_complete());
    }
}
