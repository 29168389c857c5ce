/// Vulkan debug messenger - validation layer message routing
///
/// Compiled only with the `vulkan-validation` feature. Messages from the
/// Khronos validation layer are routed through the engine logging system,
/// with the message id highlighted for readability.

use std::ffi::CStr;

use ash::vk;
use colored::Colorize;

use nebula_3d_renderer::nebula3d::{Error, Result};
use nebula_3d_renderer::{nebula_debug, nebula_error, nebula_trace, nebula_warn};

/// Create the debug messenger reporting errors, warnings, and performance
/// issues from the validation layer.
pub(crate) fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let loader = ash::ext::debug_utils::Instance::new(entry, instance);

    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let messenger = unsafe {
        loader
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| {
                nebula_error!("nebula3d::vulkan", "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?
    };

    Ok((loader, messenger))
}

/// Callback invoked by the validation layer for every message.
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() {
        return vk::FALSE;
    }
    let data = &*callback_data;

    let message_id = if data.p_message_id_name.is_null() {
        String::new()
    } else {
        let name = CStr::from_ptr(data.p_message_id_name).to_string_lossy();
        format!("[{}] ", name.yellow())
    };
    let message = if data.p_message.is_null() {
        "<no message>".to_string()
    } else {
        CStr::from_ptr(data.p_message).to_string_lossy().into_owned()
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            nebula_error!("nebula3d::validation", "{}{}", message_id, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            nebula_warn!("nebula3d::validation", "{}{}", message_id, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            nebula_debug!(
                "nebula3d::validation",
                "{:?} {}{}",
                message_type,
                message_id,
                message
            );
        }
        _ => {
            nebula_trace!(
                "nebula3d::validation",
                "{:?} {}{}",
                message_type,
                message_id,
                message
            );
        }
    }

    // Debug callbacks must return VK_FALSE
    vk::FALSE
}
