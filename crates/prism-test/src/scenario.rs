//! Scripted physical devices.

use ash::vk;
use prism_gpu::config::swapchain_extension_name;
use prism_gpu::DeviceProperties;

/// One queue family as the mock reports it.
#[derive(Debug, Clone, Copy)]
pub struct MockQueueFamily {
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
    pub present: bool,
}

/// A physical device and its surface support.
///
/// The default device passes every check: discrete, geometry shaders, one
/// family with graphics and present, the swapchain extension, a single
/// "any format" entry and FIFO only.
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub properties: DeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub queue_families: Vec<MockQueueFamily>,
    pub extensions: Vec<String>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Surface queries fail with `ERROR_SURFACE_LOST_KHR`.
    pub surface_lost: bool,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::discrete("Mock Discrete GPU")
    }
}

impl MockDevice {
    pub fn discrete(name: &str) -> Self {
        Self {
            properties: DeviceProperties {
                name: name.to_string(),
                device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
                vendor_id: 0x10DE,
                api_version: vk::API_VERSION_1_3,
                driver_version: 1,
                max_image_dimension_2d: 16384,
            },
            features: vk::PhysicalDeviceFeatures::default().geometry_shader(true),
            queue_families: vec![MockQueueFamily {
                flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
                queue_count: 1,
                present: true,
            }],
            extensions: vec![swapchain_extension_name()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::UNDEFINED,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
            surface_lost: false,
        }
    }

    pub fn integrated(name: &str) -> Self {
        let mut device = Self::discrete(name);
        device.properties.device_type = vk::PhysicalDeviceType::INTEGRATED_GPU;
        device.properties.vendor_id = 0x8086;
        device
    }

    #[must_use]
    pub fn with_max_image_dimension(mut self, dimension: u32) -> Self {
        self.properties.max_image_dimension_2d = dimension;
        self
    }

    #[must_use]
    pub fn without_geometry_shader(mut self) -> Self {
        self.features.geometry_shader = vk::FALSE;
        self
    }

    #[must_use]
    pub fn with_queue_families(mut self, families: Vec<MockQueueFamily>) -> Self {
        self.queue_families = families;
        self
    }

    /// Graphics on family 0, presentation only on family 1.
    #[must_use]
    pub fn with_split_queues(self) -> Self {
        self.with_queue_families(vec![
            MockQueueFamily {
                flags: vk::QueueFlags::GRAPHICS,
                queue_count: 1,
                present: false,
            },
            MockQueueFamily {
                flags: vk::QueueFlags::TRANSFER,
                queue_count: 1,
                present: true,
            },
        ])
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    #[must_use]
    pub fn with_formats(mut self, formats: Vec<vk::SurfaceFormatKHR>) -> Self {
        self.formats = formats;
        self
    }

    #[must_use]
    pub fn with_present_modes(mut self, modes: Vec<vk::PresentModeKHR>) -> Self {
        self.present_modes = modes;
        self
    }

    #[must_use]
    pub fn with_image_counts(mut self, min: u32, max: u32) -> Self {
        self.capabilities.min_image_count = min;
        self.capabilities.max_image_count = max;
        self
    }

    /// Surface reports a fixed size instead of following the window.
    #[must_use]
    pub fn with_current_extent(mut self, width: u32, height: u32) -> Self {
        self.capabilities.current_extent = vk::Extent2D { width, height };
        self
    }

    #[must_use]
    pub fn with_lost_surface(mut self) -> Self {
        self.surface_lost = true;
        self
    }

    pub(crate) fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties> {
        self.queue_families
            .iter()
            .map(|family| vk::QueueFamilyProperties {
                queue_flags: family.flags,
                queue_count: family.queue_count,
                ..Default::default()
            })
            .collect()
    }
}
