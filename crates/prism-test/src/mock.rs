//! In-memory graphics backend.

use std::collections::HashMap;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use prism_gpu::config::debug_utils_extension_name;
use prism_gpu::{
    DeviceDesc, DeviceProperties, FramebufferDesc, GpuBackend, GraphicsPipelineDesc,
    ImageViewDesc, InstanceDesc, RenderPassDesc, SurfaceTarget, SwapchainDesc,
    KHRONOS_VALIDATION_LAYER,
};
use tracing::trace;

use crate::log::{Call, CallLog, ResourceKind};
use crate::scenario::MockDevice;

/// Make the `occurrence`-th creation of `kind` fail (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePoint {
    pub kind: ResourceKind,
    pub occurrence: usize,
    pub error: vk::Result,
}

/// Recording backend with scripted devices.
///
/// Handles are unique non-zero integers. Physical device `i` in
/// [`MockBackend::devices`] has raw handle `i + 1`.
#[derive(Debug)]
pub struct MockBackend {
    log: CallLog,
    next_handle: u64,
    created_counts: HashMap<ResourceKind, usize>,
    failure: Option<FailurePoint>,

    pub instance_extensions: Vec<String>,
    pub instance_layers: Vec<String>,
    /// Whether debug-utils entry points "resolve" after instance creation.
    pub debug_utils: bool,
    pub devices: Vec<MockDevice>,
    /// Extra images handed out beyond the requested minimum.
    pub extra_images: u32,

    pub instance_desc: Option<InstanceDesc>,
    pub device_desc: Option<DeviceDesc>,
    pub swapchain_descs: Vec<SwapchainDesc>,
    pub pipeline_descs: Vec<GraphicsPipelineDesc>,
    pub framebuffer_descs: Vec<FramebufferDesc>,
    swapchain_images: HashMap<u64, Vec<vk::Image>>,
    instance_alive: bool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(vec![MockDevice::default()])
    }
}

impl MockBackend {
    /// Backend with a fully capable runtime and the given devices.
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            log: CallLog::new(),
            next_handle: 0,
            created_counts: HashMap::new(),
            failure: None,
            instance_extensions: vec![
                "VK_KHR_surface".to_string(),
                "VK_KHR_xlib_surface".to_string(),
                debug_utils_extension_name(),
            ],
            instance_layers: vec![KHRONOS_VALIDATION_LAYER.to_string()],
            debug_utils: true,
            devices,
            extra_images: 0,
            instance_desc: None,
            device_desc: None,
            swapchain_descs: Vec::new(),
            pipeline_descs: Vec::new(),
            framebuffer_descs: Vec::new(),
            swapchain_images: HashMap::new(),
            instance_alive: false,
        }
    }

    /// Shared handle to the call log.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    #[must_use]
    pub fn without_layers(mut self) -> Self {
        self.instance_layers.clear();
        self
    }

    #[must_use]
    pub fn without_debug_utils(mut self) -> Self {
        self.debug_utils = false;
        self
    }

    /// Fail the first creation of `kind`.
    #[must_use]
    pub fn failing(self, kind: ResourceKind) -> Self {
        self.failing_nth(kind, 0)
    }

    /// Fail the `occurrence`-th creation of `kind` (0-based).
    #[must_use]
    pub fn failing_nth(mut self, kind: ResourceKind, occurrence: usize) -> Self {
        self.failure = Some(FailurePoint {
            kind,
            occurrence,
            error: vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
        });
        self
    }

    fn next_raw(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn create<H: Handle>(&mut self, kind: ResourceKind) -> VkResult<H> {
        let count = self.created_counts.entry(kind).or_insert(0);
        let occurrence = *count;
        *count += 1;

        if let Some(failure) = self.failure {
            if failure.kind == kind && failure.occurrence == occurrence {
                trace!("Failing creation of {kind:?} #{occurrence}");
                return Err(failure.error);
            }
        }

        let raw = self.next_raw();
        self.log.push(Call::Create(kind, raw));
        trace!("Created {kind:?} {raw}");
        Ok(H::from_raw(raw))
    }

    fn destroy<H: Handle>(&self, kind: ResourceKind, handle: H) {
        let raw = handle.as_raw();
        trace!("Destroyed {kind:?} {raw}");
        self.log.push(Call::Destroy(kind, raw));
    }

    fn device(&self, physical_device: vk::PhysicalDevice) -> Option<&MockDevice> {
        let index = usize::try_from(physical_device.as_raw()).ok()?.checked_sub(1)?;
        self.devices.get(index)
    }

    fn scripted(&self, physical_device: vk::PhysicalDevice) -> VkResult<&MockDevice> {
        self.device(physical_device)
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn presentable(&self, physical_device: vk::PhysicalDevice) -> VkResult<&MockDevice> {
        let device = self.scripted(physical_device)?;
        if device.surface_lost {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        Ok(device)
    }
}

impl GpuBackend for MockBackend {
    fn instance_extensions(&self) -> VkResult<Vec<String>> {
        Ok(self.instance_extensions.clone())
    }

    fn instance_layers(&self) -> VkResult<Vec<String>> {
        Ok(self.instance_layers.clone())
    }

    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<vk::Instance> {
        if let Some(missing) = desc
            .extensions
            .iter()
            .find(|ext| !self.instance_extensions.contains(ext))
        {
            trace!("Rejecting instance with unknown extension {missing}");
            return Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT);
        }
        self.instance_desc = Some(desc.clone());
        let instance = self.create(ResourceKind::Instance)?;
        self.instance_alive = true;
        Ok(instance)
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        self.instance_alive = false;
        self.destroy(ResourceKind::Instance, instance);
    }

    fn debug_messenger_supported(&self) -> bool {
        self.instance_alive && self.debug_utils
    }

    fn create_debug_messenger(
        &mut self,
        _info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        self.create(ResourceKind::DebugMessenger)
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        self.destroy(ResourceKind::DebugMessenger, messenger);
    }

    fn create_surface(&mut self, _target: &SurfaceTarget) -> VkResult<vk::SurfaceKHR> {
        self.create(ResourceKind::Surface)
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        self.destroy(ResourceKind::Surface, surface);
    }

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        Ok((1..=self.devices.len() as u64)
            .map(vk::PhysicalDevice::from_raw)
            .collect())
    }

    fn device_properties(&self, physical_device: vk::PhysicalDevice) -> DeviceProperties {
        self.device(physical_device)
            .map(|device| device.properties.clone())
            .unwrap_or_default()
    }

    fn device_features(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        self.device(physical_device)
            .map(|device| device.features)
            .unwrap_or_default()
    }

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        Ok(self.scripted(physical_device)?.extensions.clone())
    }

    fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        self.device(physical_device)
            .map(MockDevice::queue_family_properties)
            .unwrap_or_default()
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let device = self.presentable(physical_device)?;
        Ok(usize::try_from(queue_family)
            .ok()
            .and_then(|index| device.queue_families.get(index))
            .is_some_and(|family| family.present))
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        Ok(self.presentable(physical_device)?.capabilities)
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.presentable(physical_device)?.formats.clone())
    }

    fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(self.presentable(physical_device)?.present_modes.clone())
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc,
    ) -> VkResult<vk::Device> {
        let device = self.scripted(physical_device)?;
        if desc.extensions.iter().any(|ext| !device.extensions.contains(ext)) {
            return Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT);
        }
        self.device_desc = Some(desc.clone());
        self.create(ResourceKind::Device)
    }

    fn device_queue(&self, queue_family: u32, queue_index: u32) -> vk::Queue {
        vk::Queue::from_raw(0x1000 + (u64::from(queue_family) << 8) + u64::from(queue_index))
    }

    fn wait_idle(&self) -> VkResult<()> {
        self.log.push(Call::WaitIdle);
        Ok(())
    }

    fn destroy_device(&mut self, device: vk::Device) {
        self.destroy(ResourceKind::Device, device);
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        self.swapchain_descs.push(desc.clone());
        let swapchain: vk::SwapchainKHR = self.create(ResourceKind::Swapchain)?;

        let count = desc.min_image_count + self.extra_images;
        let images: Vec<vk::Image> = (0..count)
            .map(|_| vk::Image::from_raw(self.next_raw()))
            .collect();
        self.swapchain_images.insert(swapchain.as_raw(), images);

        Ok(swapchain)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        self.swapchain_images
            .get(&swapchain.as_raw())
            .cloned()
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        self.swapchain_images.remove(&swapchain.as_raw());
        self.destroy(ResourceKind::Swapchain, swapchain);
    }

    fn create_image_view(&mut self, _desc: &ImageViewDesc) -> VkResult<vk::ImageView> {
        self.create(ResourceKind::ImageView)
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        self.destroy(ResourceKind::ImageView, view);
    }

    fn create_render_pass(&mut self, _desc: &RenderPassDesc) -> VkResult<vk::RenderPass> {
        self.create(ResourceKind::RenderPass)
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        self.destroy(ResourceKind::RenderPass, render_pass);
    }

    fn create_shader_module(&mut self, _code: &[u32]) -> VkResult<vk::ShaderModule> {
        self.create(ResourceKind::ShaderModule)
    }

    fn destroy_shader_module(&mut self, module: vk::ShaderModule) {
        self.destroy(ResourceKind::ShaderModule, module);
    }

    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout> {
        self.create(ResourceKind::PipelineLayout)
    }

    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout) {
        self.destroy(ResourceKind::PipelineLayout, layout);
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc,
    ) -> VkResult<vk::Pipeline> {
        self.pipeline_descs.push(desc.clone());
        self.create(ResourceKind::Pipeline)
    }

    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.destroy(ResourceKind::Pipeline, pipeline);
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> VkResult<vk::Framebuffer> {
        self.framebuffer_descs.push(desc.clone());
        self.create(ResourceKind::Framebuffer)
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        self.destroy(ResourceKind::Framebuffer, framebuffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_logged() {
        let mut backend = MockBackend::default();
        let a: vk::RenderPass = backend.create(ResourceKind::RenderPass).unwrap();
        let b: vk::RenderPass = backend.create(ResourceKind::RenderPass).unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.log().created_of(ResourceKind::RenderPass).len(), 2);
    }

    #[test]
    fn failure_hits_the_chosen_occurrence() {
        let mut backend = MockBackend::default().failing_nth(ResourceKind::ImageView, 1);
        assert!(backend.create::<vk::ImageView>(ResourceKind::ImageView).is_ok());
        assert!(backend.create::<vk::ImageView>(ResourceKind::ImageView).is_err());
        assert!(backend.create::<vk::ImageView>(ResourceKind::ImageView).is_ok());
        assert_eq!(backend.log().created_of(ResourceKind::ImageView).len(), 2);
    }

    #[test]
    fn physical_devices_map_to_scripted_entries() {
        let backend = MockBackend::new(vec![
            MockDevice::discrete("first"),
            MockDevice::integrated("second"),
        ]);
        let devices = backend.physical_devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(backend.device_properties(devices[1]).name, "second");
        assert_eq!(
            backend.device_properties(vk::PhysicalDevice::null()).name,
            ""
        );
    }
}
