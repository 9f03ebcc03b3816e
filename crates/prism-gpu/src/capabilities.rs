//! GPU capability detection.
//!
//! Read-only enumeration of everything device selection and swapchain
//! negotiation decide on. Nothing here creates or mutates API state.

use std::collections::HashSet;

use ash::vk;

use crate::backend::GpuBackend;
use crate::error::Result;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub const fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// The subset of physical device properties the bootstrap looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub vendor_id: u32,
    pub api_version: u32,
    pub driver_version: u32,
    /// `limits.maxImageDimension2D`.
    pub max_image_dimension_2d: u32,
}

impl Default for DeviceProperties {
    fn default() -> Self {
        Self {
            name: String::new(),
            device_type: vk::PhysicalDeviceType::OTHER,
            vendor_id: 0,
            api_version: vk::API_VERSION_1_0,
            driver_version: 0,
            max_image_dimension_2d: 0,
        }
    }
}

impl DeviceProperties {
    pub const fn vendor(&self) -> GpuVendor {
        GpuVendor::from_vendor_id(self.vendor_id)
    }

    pub fn is_discrete(&self) -> bool {
        self.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
    }
}

/// One queue family together with its present support on the bound surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyInfo {
    pub index: u32,
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
    pub present_support: bool,
}

impl QueueFamilyInfo {
    pub fn supports_graphics(&self) -> bool {
        self.queue_count > 0 && self.flags.contains(vk::QueueFlags::GRAPHICS)
    }

    pub const fn supports_present(&self) -> bool {
        self.present_support
    }
}

/// Surface capabilities, formats and present modes for a device/surface pair.
#[derive(Debug, Clone, Default)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// A device can present to the surface only if both sets are non-empty.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Everything known about one physical device relative to a surface.
#[derive(Debug, Clone)]
pub struct DeviceReport {
    pub handle: vk::PhysicalDevice,
    pub properties: DeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub queue_families: Vec<QueueFamilyInfo>,
    pub extensions: HashSet<String>,
    pub swapchain_support: SwapchainSupport,
}

impl DeviceReport {
    /// Check that every name in `required` is among the device extensions.
    pub fn supports_extensions(&self, required: &[String]) -> bool {
        required.iter().all(|name| self.extensions.contains(name))
    }

    /// Get a human-readable summary of the device.
    pub fn summary(&self) -> String {
        let api = self.properties.api_version;
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{} - max 2D image {}",
            self.properties.name,
            self.properties.vendor(),
            self.properties.device_type,
            vk::api_version_major(api),
            vk::api_version_minor(api),
            vk::api_version_patch(api),
            self.properties.max_image_dimension_2d,
        )
    }
}

/// Enumerate queue families and their present support on `surface`.
pub fn query_queue_families<B: GpuBackend + ?Sized>(
    backend: &B,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<Vec<QueueFamilyInfo>> {
    backend
        .queue_families(physical_device)
        .iter()
        .zip(0u32..)
        .map(|(family, index)| {
            Ok(QueueFamilyInfo {
                index,
                flags: family.queue_flags,
                queue_count: family.queue_count,
                present_support: backend.surface_support(physical_device, index, surface)?,
            })
        })
        .collect()
}

/// Query surface capabilities, formats and present modes.
pub fn query_swapchain_support<B: GpuBackend + ?Sized>(
    backend: &B,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<SwapchainSupport> {
    Ok(SwapchainSupport {
        capabilities: backend.surface_capabilities(physical_device, surface)?,
        formats: backend.surface_formats(physical_device, surface)?,
        present_modes: backend.present_modes(physical_device, surface)?,
    })
}

/// Build a full [`DeviceReport`] for one physical device.
pub fn query_device<B: GpuBackend + ?Sized>(
    backend: &B,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<DeviceReport> {
    Ok(DeviceReport {
        handle: physical_device,
        properties: backend.device_properties(physical_device),
        features: backend.device_features(physical_device),
        queue_families: query_queue_families(backend, physical_device, surface)?,
        extensions: backend
            .device_extensions(physical_device)?
            .into_iter()
            .collect(),
        swapchain_support: query_swapchain_support(backend, physical_device, surface)?,
    })
}
