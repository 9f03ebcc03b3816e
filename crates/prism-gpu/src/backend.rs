//! Backend seam between bootstrap policy and the graphics API.
//!
//! The bootstrap stages decide *what* to create; a [`GpuBackend`] performs the
//! actual API calls. Descriptors are owned plain-data records so the policy
//! that fills them can be exercised without a GPU.

use ash::prelude::VkResult;
use ash::vk;

use crate::capabilities::DeviceProperties;
use crate::surface::SurfaceTarget;

/// Parameters for instance creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDesc {
    pub app_name: String,
    pub app_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub api_version: u32,
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
    /// Set `ENUMERATE_PORTABILITY_KHR` on the create flags.
    pub portability: bool,
}

/// Parameters for logical device creation.
#[derive(Debug, Clone)]
pub struct DeviceDesc {
    /// One queue is requested from each listed family; entries are unique.
    pub queue_families: Vec<u32>,
    pub queue_priority: f32,
    pub extensions: Vec<String>,
    /// Mirrored instance layers, only honoured by old loaders.
    pub layers: Vec<String>,
    pub features: vk::PhysicalDeviceFeatures,
}

/// Parameters for swapchain creation.
#[derive(Debug, Clone)]
pub struct SwapchainDesc {
    pub surface: vk::SurfaceKHR,
    pub min_image_count: u32,
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_usage: vk::ImageUsageFlags,
    pub sharing_mode: vk::SharingMode,
    /// Empty for exclusive sharing.
    pub queue_family_indices: Vec<u32>,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub clipped: bool,
}

/// Parameters for a single image view.
#[derive(Debug, Clone, Copy)]
pub struct ImageViewDesc {
    pub image: vk::Image,
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub components: vk::ComponentMapping,
    pub subresource_range: vk::ImageSubresourceRange,
}

/// A render pass with one color attachment and one subpass writing it.
#[derive(Debug, Clone, Copy)]
pub struct RenderPassDesc {
    pub color_attachment: vk::AttachmentDescription,
    pub color_attachment_layout: vk::ImageLayout,
}

/// Fixed-function and programmable state for a graphics pipeline.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    pub vertex_module: vk::ShaderModule,
    pub fragment_module: vk::ShaderModule,
    pub topology: vk::PrimitiveTopology,
    pub viewport: vk::Viewport,
    pub scissor: vk::Rect2D,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub line_width: f32,
    pub samples: vk::SampleCountFlags,
    pub blend_enable: bool,
    pub color_write_mask: vk::ColorComponentFlags,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub subpass: u32,
}

/// Parameters for a framebuffer.
#[derive(Debug, Clone)]
pub struct FramebufferDesc {
    pub render_pass: vk::RenderPass,
    pub attachments: Vec<vk::ImageView>,
    pub extent: vk::Extent2D,
    pub layers: u32,
}

/// Graphics API operations used by the bootstrap pipeline.
///
/// Enumerations return complete sets; implementations perform the
/// count-then-fill dance internally. Handles passed back into a backend must
/// have been produced by that same backend, and every `destroy_*` call must
/// receive a handle that is still alive.
pub trait GpuBackend {
    // Instance level

    fn instance_extensions(&self) -> VkResult<Vec<String>>;
    fn instance_layers(&self) -> VkResult<Vec<String>>;
    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<vk::Instance>;
    fn destroy_instance(&mut self, instance: vk::Instance);

    /// Whether the debug-utils entry points resolved on the current instance.
    fn debug_messenger_supported(&self) -> bool;
    fn create_debug_messenger(
        &mut self,
        info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugUtilsMessengerEXT>;
    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT);

    fn create_surface(&mut self, target: &SurfaceTarget) -> VkResult<vk::SurfaceKHR>;
    fn destroy_surface(&mut self, surface: vk::SurfaceKHR);

    // Physical device queries

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn device_properties(&self, physical_device: vk::PhysicalDevice) -> DeviceProperties;
    fn device_features(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures;
    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<Vec<String>>;
    fn queue_families(&self, physical_device: vk::PhysicalDevice)
        -> Vec<vk::QueueFamilyProperties>;
    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;
    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;
    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;
    fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    // Logical device

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc,
    ) -> VkResult<vk::Device>;
    fn device_queue(&self, queue_family: u32, queue_index: u32) -> vk::Queue;
    fn wait_idle(&self) -> VkResult<()>;
    fn destroy_device(&mut self, device: vk::Device);

    // Presentation

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;
    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR);

    fn create_image_view(&mut self, desc: &ImageViewDesc) -> VkResult<vk::ImageView>;
    fn destroy_image_view(&mut self, view: vk::ImageView);

    // Render target

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> VkResult<vk::RenderPass>;
    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass);

    fn create_shader_module(&mut self, code: &[u32]) -> VkResult<vk::ShaderModule>;
    fn destroy_shader_module(&mut self, module: vk::ShaderModule);

    /// Create a pipeline layout with no descriptor sets or push constants.
    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout>;
    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout);

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc)
        -> VkResult<vk::Pipeline>;
    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline);

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> VkResult<vk::Framebuffer>;
    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer);
}
