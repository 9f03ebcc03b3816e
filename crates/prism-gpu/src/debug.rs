//! Validation message routing.

use std::borrow::Cow;
use std::ffi::{c_void, CStr};

use ash::vk;
use tracing::{debug, error, info, warn};

use crate::backend::GpuBackend;
use crate::error::{GpuError, Result};

/// Messenger create info filtered to warnings and errors.
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
}

/// Register the debug messenger on the current instance.
pub fn register_messenger<B: GpuBackend + ?Sized>(
    backend: &mut B,
) -> Result<vk::DebugUtilsMessengerEXT> {
    if !backend.debug_messenger_supported() {
        return Err(GpuError::ExtensionUnavailable(
            "VK_EXT_debug_utils entry points could not be resolved".to_string(),
        ));
    }

    let messenger = backend
        .create_debug_messenger(&messenger_create_info())
        .map_err(|e| GpuError::ExtensionUnavailable(format!("debug messenger: {e}")))?;

    info!("Debug messenger registered");
    Ok(messenger)
}

/// Routes validation messages into the log and never aborts the triggering call.
///
/// # Safety
/// Called by the Vulkan loader; `callback_data` is either null or valid for
/// the duration of the call.
pub unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    // SAFETY: the loader hands us either null or a live callback record.
    let message = unsafe { callback_message(callback_data) };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!("[{message_type:?}] {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!("[{message_type:?}] {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        info!("[{message_type:?}] {message}");
    } else {
        debug!("[{message_type:?}] {message}");
    }

    vk::FALSE
}

unsafe fn callback_message<'a>(
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'a>,
) -> Cow<'a, str> {
    // SAFETY: forwarded from the callback contract.
    let Some(data) = (unsafe { callback_data.as_ref() }) else {
        return Cow::Borrowed("<no callback data>");
    };
    if data.p_message.is_null() {
        return Cow::Borrowed("<empty message>");
    }
    // SAFETY: non-null p_message is a NUL-terminated string owned by the loader.
    unsafe { CStr::from_ptr(data.p_message) }.to_string_lossy()
}
