//! Vulkan backend on top of ash.

use std::ffi::{c_char, CStr, CString};

use ash::prelude::VkResult;
use ash::vk;

use crate::backend::{
    DeviceDesc, FramebufferDesc, GpuBackend, GraphicsPipelineDesc, ImageViewDesc, InstanceDesc,
    RenderPassDesc, SwapchainDesc,
};
use crate::capabilities::DeviceProperties;
use crate::error::{GpuError, Result};
use crate::surface::SurfaceTarget;

/// Real Vulkan backend.
///
/// Holds the entry, the instance and device function tables, and the
/// extension loaders. Loaders are created alongside the object they hang off
/// and dropped when that object is destroyed.
pub struct AshBackend {
    entry: ash::Entry,
    instance: Option<ash::Instance>,
    surface_loader: Option<ash::khr::surface::Instance>,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    device: Option<ash::Device>,
    swapchain_loader: Option<ash::khr::swapchain::Device>,
}

impl AshBackend {
    /// Load the Vulkan loader library.
    pub fn load() -> Result<Self> {
        // SAFETY: the loader is kept alive by the returned entry.
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::Initialization(format!("Failed to load Vulkan: {e}")))?;
        Ok(Self::new(entry))
    }

    /// Wrap an already loaded entry.
    pub fn new(entry: ash::Entry) -> Self {
        Self {
            entry,
            instance: None,
            surface_loader: None,
            debug_utils: None,
            device: None,
            swapchain_loader: None,
        }
    }

    fn instance(&self) -> VkResult<&ash::Instance> {
        self.instance
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn surface_loader(&self) -> VkResult<&ash::khr::surface::Instance> {
        self.surface_loader
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn device(&self) -> VkResult<&ash::Device> {
        self.device
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn swapchain_loader(&self) -> VkResult<&ash::khr::swapchain::Device> {
        self.swapchain_loader
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }
}

fn to_cstrings(names: &[String], on_error: vk::Result) -> VkResult<Vec<CString>> {
    names
        .iter()
        .map(|name| CString::new(name.as_str()).map_err(|_| on_error))
        .collect()
}

fn as_ptrs(names: &[CString]) -> Vec<*const c_char> {
    names.iter().map(|name| name.as_ptr()).collect()
}

fn lossy(name: std::result::Result<&CStr, std::ffi::FromBytesUntilNulError>) -> Option<String> {
    name.ok().map(|name| name.to_string_lossy().into_owned())
}

impl GpuBackend for AshBackend {
    fn instance_extensions(&self) -> VkResult<Vec<String>> {
        // SAFETY: the entry is loaded.
        let properties = unsafe { self.entry.enumerate_instance_extension_properties(None)? };
        Ok(properties
            .iter()
            .filter_map(|p| lossy(p.extension_name_as_c_str()))
            .collect())
    }

    fn instance_layers(&self) -> VkResult<Vec<String>> {
        // SAFETY: the entry is loaded.
        let properties = unsafe { self.entry.enumerate_instance_layer_properties()? };
        Ok(properties
            .iter()
            .filter_map(|p| lossy(p.layer_name_as_c_str()))
            .collect())
    }

    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<vk::Instance> {
        let app_name = CString::new(desc.app_name.as_str())
            .map_err(|_| vk::Result::ERROR_INITIALIZATION_FAILED)?;
        let engine_name = CString::new(desc.engine_name.as_str())
            .map_err(|_| vk::Result::ERROR_INITIALIZATION_FAILED)?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(desc.app_version)
            .engine_name(&engine_name)
            .engine_version(desc.engine_version)
            .api_version(desc.api_version);

        let extensions = to_cstrings(&desc.extensions, vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
        let layers = to_cstrings(&desc.layers, vk::Result::ERROR_LAYER_NOT_PRESENT)?;
        let extension_names = as_ptrs(&extensions);
        let layer_names = as_ptrs(&layers);

        let create_flags = if desc.portability {
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names)
            .flags(create_flags);

        // SAFETY: every pointer in create_info outlives the call.
        let instance = unsafe { self.entry.create_instance(&create_info, None)? };

        // SAFETY: the instance handle is valid and the name is NUL-terminated.
        let debug_utils_resolved = unsafe {
            self.entry
                .get_instance_proc_addr(
                    instance.handle(),
                    c"vkCreateDebugUtilsMessengerEXT".as_ptr(),
                )
                .is_some()
        };

        self.surface_loader = Some(ash::khr::surface::Instance::new(&self.entry, &instance));
        self.debug_utils = debug_utils_resolved
            .then(|| ash::ext::debug_utils::Instance::new(&self.entry, &instance));

        let handle = instance.handle();
        self.instance = Some(instance);
        Ok(handle)
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        self.debug_utils = None;
        self.surface_loader = None;
        if let Some(loaded) = self.instance.take() {
            debug_assert_eq!(loaded.handle(), instance);
            // SAFETY: every child object has been destroyed by the caller.
            unsafe { loaded.destroy_instance(None) };
        }
    }

    fn debug_messenger_supported(&self) -> bool {
        self.debug_utils.is_some()
    }

    fn create_debug_messenger(
        &mut self,
        info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let debug_utils = self
            .debug_utils
            .as_ref()
            .ok_or(vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
        // SAFETY: the instance is alive while the loader exists.
        unsafe { debug_utils.create_debug_utils_messenger(info, None) }
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        if let Some(debug_utils) = &self.debug_utils {
            // SAFETY: the messenger was created from this loader.
            unsafe { debug_utils.destroy_debug_utils_messenger(messenger, None) };
        }
    }

    fn create_surface(&mut self, target: &SurfaceTarget) -> VkResult<vk::SurfaceKHR> {
        let instance = self.instance()?;
        // SAFETY: the caller keeps the window alive for the surface's lifetime.
        unsafe {
            ash_window::create_surface(&self.entry, instance, target.display, target.window, None)
        }
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        if let Ok(loader) = self.surface_loader() {
            // SAFETY: no swapchain references the surface any more.
            unsafe { loader.destroy_surface(surface, None) };
        }
    }

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        // SAFETY: the instance is valid.
        unsafe { self.instance()?.enumerate_physical_devices() }
    }

    fn device_properties(&self, physical_device: vk::PhysicalDevice) -> DeviceProperties {
        let Ok(instance) = self.instance() else {
            return DeviceProperties::default();
        };
        // SAFETY: physical_device was enumerated from this instance.
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };

        DeviceProperties {
            name: lossy(properties.device_name_as_c_str()).unwrap_or_default(),
            device_type: properties.device_type,
            vendor_id: properties.vendor_id,
            api_version: properties.api_version,
            driver_version: properties.driver_version,
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
        }
    }

    fn device_features(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        self.instance().map_or_else(
            |_| vk::PhysicalDeviceFeatures::default(),
            // SAFETY: physical_device was enumerated from this instance.
            |instance| unsafe { instance.get_physical_device_features(physical_device) },
        )
    }

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        // SAFETY: physical_device was enumerated from this instance.
        let properties =
            unsafe { self.instance()?.enumerate_device_extension_properties(physical_device)? };
        Ok(properties
            .iter()
            .filter_map(|p| lossy(p.extension_name_as_c_str()))
            .collect())
    }

    fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        self.instance().map_or_else(
            |_| Vec::new(),
            // SAFETY: physical_device was enumerated from this instance.
            |instance| unsafe {
                instance.get_physical_device_queue_family_properties(physical_device)
            },
        )
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        // SAFETY: all handles come from this backend.
        unsafe {
            self.surface_loader()?.get_physical_device_surface_support(
                physical_device,
                queue_family,
                surface,
            )
        }
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        // SAFETY: all handles come from this backend.
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_capabilities(physical_device, surface)
        }
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        // SAFETY: all handles come from this backend.
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_formats(physical_device, surface)
        }
    }

    fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        // SAFETY: all handles come from this backend.
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_present_modes(physical_device, surface)
        }
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc,
    ) -> VkResult<vk::Device> {
        let instance = self.instance()?;

        let queue_priorities = [desc.queue_priority];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = desc
            .queue_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        let extensions = to_cstrings(&desc.extensions, vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
        let layers = to_cstrings(&desc.layers, vk::Result::ERROR_LAYER_NOT_PRESENT)?;
        let extension_names = as_ptrs(&extensions);
        let layer_names = as_ptrs(&layers);

        // Device layers are ignored by current loaders but old ones need them
        #[allow(deprecated)]
        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names)
            .enabled_features(&desc.features);

        // SAFETY: every pointer in device_create_info outlives the call.
        let device = unsafe { instance.create_device(physical_device, &device_create_info, None)? };

        self.swapchain_loader = Some(ash::khr::swapchain::Device::new(instance, &device));
        let handle = device.handle();
        self.device = Some(device);
        Ok(handle)
    }

    fn device_queue(&self, queue_family: u32, queue_index: u32) -> vk::Queue {
        self.device().map_or_else(
            |_| vk::Queue::null(),
            // SAFETY: the family was requested at device creation.
            |device| unsafe { device.get_device_queue(queue_family, queue_index) },
        )
    }

    fn wait_idle(&self) -> VkResult<()> {
        // SAFETY: the device is valid.
        unsafe { self.device()?.device_wait_idle() }
    }

    fn destroy_device(&mut self, device: vk::Device) {
        self.swapchain_loader = None;
        if let Some(loaded) = self.device.take() {
            debug_assert_eq!(loaded.handle(), device);
            // SAFETY: every device child has been destroyed by the caller.
            unsafe { loaded.destroy_device(None) };
        }
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(desc.surface)
            .min_image_count(desc.min_image_count)
            .image_format(desc.surface_format.format)
            .image_color_space(desc.surface_format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(1)
            .image_usage(desc.image_usage)
            .image_sharing_mode(desc.sharing_mode)
            .queue_family_indices(&desc.queue_family_indices)
            .pre_transform(desc.pre_transform)
            .composite_alpha(desc.composite_alpha)
            .present_mode(desc.present_mode)
            .clipped(desc.clipped)
            .old_swapchain(vk::SwapchainKHR::null());

        // SAFETY: the surface and device are alive.
        unsafe { self.swapchain_loader()?.create_swapchain(&create_info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        // SAFETY: the swapchain was created by this loader.
        unsafe { self.swapchain_loader()?.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        if let Ok(loader) = self.swapchain_loader() {
            // SAFETY: its image views are gone and it is not in use.
            unsafe { loader.destroy_swapchain(swapchain, None) };
        }
    }

    fn create_image_view(&mut self, desc: &ImageViewDesc) -> VkResult<vk::ImageView> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(desc.image)
            .view_type(desc.view_type)
            .format(desc.format)
            .components(desc.components)
            .subresource_range(desc.subresource_range);

        // SAFETY: the image belongs to a live swapchain.
        unsafe { self.device()?.create_image_view(&view_info, None) }
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        if let Ok(device) = self.device() {
            // SAFETY: no framebuffer references the view any more.
            unsafe { device.destroy_image_view(view, None) };
        }
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> VkResult<vk::RenderPass> {
        let attachments = [desc.color_attachment];
        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: desc.color_attachment_layout,
        }];
        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)];

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses);

        // SAFETY: the device is valid.
        unsafe { self.device()?.create_render_pass(&render_pass_info, None) }
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        if let Ok(device) = self.device() {
            // SAFETY: pipeline and framebuffers using it are gone.
            unsafe { device.destroy_render_pass(render_pass, None) };
        }
    }

    fn create_shader_module(&mut self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        let shader_info = vk::ShaderModuleCreateInfo::default().code(code);
        // SAFETY: code is SPIR-V words decoded by the shader loader.
        unsafe { self.device()?.create_shader_module(&shader_info, None) }
    }

    fn destroy_shader_module(&mut self, module: vk::ShaderModule) {
        if let Ok(device) = self.device() {
            // SAFETY: modules are not referenced after pipeline creation.
            unsafe { device.destroy_shader_module(module, None) };
        }
    }

    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout> {
        let layout_info = vk::PipelineLayoutCreateInfo::default();
        // SAFETY: the device is valid.
        unsafe { self.device()?.create_pipeline_layout(&layout_info, None) }
    }

    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout) {
        if let Ok(device) = self.device() {
            // SAFETY: the pipeline built on it is gone.
            unsafe { device.destroy_pipeline_layout(layout, None) };
        }
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc,
    ) -> VkResult<vk::Pipeline> {
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(desc.vertex_module)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(desc.fragment_module)
                .name(c"main"),
        ];

        // No vertex buffers
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(desc.topology)
            .primitive_restart_enable(false);

        let viewports = [desc.viewport];
        let scissors = [desc.scissor];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(desc.polygon_mode)
            .cull_mode(desc.cull_mode)
            .front_face(desc.front_face)
            .depth_bias_enable(false)
            .line_width(desc.line_width);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(desc.samples)
            .sample_shading_enable(false);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(desc.blend_enable)
            .color_write_mask(desc.color_write_mask)];

        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .layout(desc.layout)
            .render_pass(desc.render_pass)
            .subpass(desc.subpass);

        // SAFETY: modules, layout and render pass are alive for the call.
        let pipelines = unsafe {
            self.device()?
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        }
        .map_err(|(_pipelines, e)| e)?;

        pipelines
            .first()
            .copied()
            .ok_or(vk::Result::ERROR_UNKNOWN)
    }

    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline) {
        if let Ok(device) = self.device() {
            // SAFETY: the device is idle.
            unsafe { device.destroy_pipeline(pipeline, None) };
        }
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> VkResult<vk::Framebuffer> {
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(desc.render_pass)
            .attachments(&desc.attachments)
            .width(desc.extent.width)
            .height(desc.extent.height)
            .layers(desc.layers);

        // SAFETY: the render pass and views are alive.
        unsafe { self.device()?.create_framebuffer(&framebuffer_info, None) }
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        if let Ok(device) = self.device() {
            // SAFETY: the device is idle.
            unsafe { device.destroy_framebuffer(framebuffer, None) };
        }
    }
}
