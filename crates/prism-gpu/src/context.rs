//! Graphics context management.
//!
//! [`GraphicsContext`] owns every resource the bootstrap creates and releases
//! them in exact reverse creation order when dropped:
//!
//! framebuffers, pipeline, pipeline layout, render pass, image views,
//! swapchain, logical device, surface, debug messenger, instance.
//!
//! The same ordering applies when a bootstrap stage fails half way: the
//! partially built context is dropped and releases whatever it already holds.

use ash::vk;
use tracing::{debug, info, warn};

use crate::backend::GpuBackend;
use crate::capabilities::query_swapchain_support;
use crate::config::{ContextConfig, RequiredFeatures};
use crate::debug::register_messenger;
use crate::device::{
    create_logical_device, pick_physical_device, DeviceRequirements, LogicalDevice,
    SelectedDevice,
};
use crate::error::{GpuError, Result};
use crate::instance::create_instance;
use crate::pipeline::{GraphicsPipelineConfig, ShaderSet};
use crate::render_target::RenderTarget;
use crate::surface::{create_surface, SurfaceTarget};
use crate::swapchain::{swapchain_desc, Swapchain};

/// Main graphics context holding every bootstrapped resource.
pub struct GraphicsContext<B: GpuBackend> {
    backend: B,
    config: ContextConfig,
    pipeline_config: GraphicsPipelineConfig,
    shaders: ShaderSet,

    instance: Option<vk::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface: Option<vk::SurfaceKHR>,
    // Owned by the instance; nothing to destroy
    physical_device: Option<SelectedDevice>,
    device: Option<LogicalDevice>,
    swapchain: Option<Swapchain>,
    render_target: Option<RenderTarget>,
}

impl<B: GpuBackend> GraphicsContext<B> {
    fn empty(
        backend: B,
        config: ContextConfig,
        pipeline_config: GraphicsPipelineConfig,
        shaders: ShaderSet,
    ) -> Self {
        Self {
            backend,
            config,
            pipeline_config,
            shaders,
            instance: None,
            debug_messenger: None,
            surface: None,
            physical_device: None,
            device: None,
            swapchain: None,
            render_target: None,
        }
    }

    /// Get the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get the configuration the context was built with.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Get the instance handle.
    pub fn instance(&self) -> Option<vk::Instance> {
        self.instance
    }

    /// Get the debug messenger, if diagnostics are on.
    pub fn debug_messenger(&self) -> Option<vk::DebugUtilsMessengerEXT> {
        self.debug_messenger
    }

    /// Get the surface handle.
    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        self.surface
    }

    /// Get the selected physical device and its queue families.
    pub fn physical_device(&self) -> Option<&SelectedDevice> {
        self.physical_device.as_ref()
    }

    /// Get the logical device and its queues.
    pub fn device(&self) -> Option<&LogicalDevice> {
        self.device.as_ref()
    }

    /// Get the current swapchain. `None` after a failed recreation.
    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.swapchain.as_ref()
    }

    /// Get the current render target. `None` after a failed recreation.
    pub fn render_target(&self) -> Option<&RenderTarget> {
        self.render_target.as_ref()
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        if self.device.is_some() {
            self.backend.wait_idle()?;
        }
        Ok(())
    }

    /// Replace swapchain and render target for a new window size.
    ///
    /// Device, surface and instance are untouched. A zero-area window (for
    /// example while minimized) leaves the current state in place.
    pub fn recreate_swapchain(&mut self, window_extent: vk::Extent2D) -> Result<()> {
        if window_extent.width == 0 || window_extent.height == 0 {
            debug!("Skipping swapchain recreation for zero-area window");
            return Ok(());
        }

        self.wait_idle()?;
        self.release_presentation();
        self.build_presentation(window_extent)
    }

    fn build_presentation(&mut self, window_extent: vk::Extent2D) -> Result<()> {
        let (Some(selected), Some(surface)) = (&self.physical_device, self.surface) else {
            return Err(GpuError::InvalidState(
                "presentation requires a surface and a device".to_string(),
            ));
        };

        let support = query_swapchain_support(&self.backend, selected.handle(), surface)?;
        let desc = swapchain_desc(&support, &selected.queue_families, surface, window_extent)?;
        let swapchain = self.swapchain.insert(Swapchain::new(&mut self.backend, &desc)?);

        self.render_target = Some(RenderTarget::new(
            &mut self.backend,
            swapchain,
            &self.pipeline_config,
            &self.shaders,
        )?);

        Ok(())
    }

    fn release_presentation(&mut self) {
        if let Some(target) = self.render_target.take() {
            target.destroy(&mut self.backend);
        }
        // Swapchain images go away with the swapchain
        if let Some(swapchain) = self.swapchain.take() {
            swapchain.destroy(&mut self.backend);
        }
    }
}

impl<B: GpuBackend> Drop for GraphicsContext<B> {
    fn drop(&mut self) {
        debug!("Destroying graphics context");

        if let Err(e) = self.wait_idle() {
            warn!("Device wait before teardown failed: {e}");
        }

        self.release_presentation();

        if let Some(device) = self.device.take() {
            self.backend.destroy_device(device.device);
        }
        self.physical_device = None;
        if let Some(surface) = self.surface.take() {
            self.backend.destroy_surface(surface);
        }
        if let Some(messenger) = self.debug_messenger.take() {
            self.backend.destroy_debug_messenger(messenger);
        }
        if let Some(instance) = self.instance.take() {
            self.backend.destroy_instance(instance);
            info!("Graphics context destroyed");
        }
    }
}

/// Builder for creating a graphics context.
#[derive(Debug, Clone, Default)]
pub struct GraphicsContextBuilder {
    config: ContextConfig,
    pipeline_config: GraphicsPipelineConfig,
    shaders: ShaderSet,
}

impl GraphicsContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the application name.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = name.into();
        self
    }

    /// Set the application version.
    #[must_use]
    pub fn app_version(mut self, version: u32) -> Self {
        self.config.app_version = version;
        self
    }

    /// Set the target API version.
    #[must_use]
    pub fn api_version(mut self, version: u32) -> Self {
        self.config.api_version = version;
        self
    }

    /// Enable or disable validation layers and the debug messenger.
    #[must_use]
    pub fn validation(mut self, enable: bool) -> Self {
        self.config.diagnostics = enable;
        self
    }

    /// Instance extensions the window system needs.
    #[must_use]
    pub fn instance_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.instance_extensions = extensions;
        self
    }

    /// Layers enabled when validation is on.
    #[must_use]
    pub fn validation_layers(mut self, layers: Vec<String>) -> Self {
        self.config.validation_layers = layers;
        self
    }

    /// Device extensions a GPU must support.
    #[must_use]
    pub fn device_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.device_extensions = extensions;
        self
    }

    /// Device features a GPU must support.
    #[must_use]
    pub fn required_features(mut self, features: RequiredFeatures) -> Self {
        self.config.required_features = features;
        self
    }

    /// Fixed-function pipeline state.
    #[must_use]
    pub fn pipeline_config(mut self, config: GraphicsPipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    /// Compiled vertex and fragment shaders.
    #[must_use]
    pub fn shaders(mut self, shaders: ShaderSet) -> Self {
        self.shaders = shaders;
        self
    }

    /// Run the whole bootstrap against `backend`.
    ///
    /// Stages run strictly in order; the first failure aborts the bootstrap
    /// and releases everything created up to that point.
    pub fn build<B: GpuBackend>(
        self,
        backend: B,
        target: &SurfaceTarget,
        window_extent: vk::Extent2D,
    ) -> Result<GraphicsContext<B>> {
        let mut ctx =
            GraphicsContext::empty(backend, self.config, self.pipeline_config, self.shaders);

        ctx.instance = Some(create_instance(&mut ctx.backend, &ctx.config)?);

        if ctx.config.diagnostics {
            ctx.debug_messenger = Some(register_messenger(&mut ctx.backend)?);
        }

        let surface = create_surface(&mut ctx.backend, target)?;
        ctx.surface = Some(surface);

        let requirements = DeviceRequirements::from_config(&ctx.config);
        let selected = pick_physical_device(&ctx.backend, surface, &requirements)?;

        ctx.device = Some(create_logical_device(
            &mut ctx.backend,
            &selected,
            &ctx.config,
        )?);
        ctx.physical_device = Some(selected);

        ctx.build_presentation(window_extent)?;

        info!("Graphics context ready");
        Ok(ctx)
    }
}
