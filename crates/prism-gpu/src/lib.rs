//! Vulkan rendering-context bootstrap for Prism.
//!
//! This crate provides:
//! - Instance creation with optional validation diagnostics
//! - Surface binding for a native window
//! - Physical device scoring and selection
//! - Logical device and queue retrieval
//! - Swapchain, render pass, pipeline and framebuffer setup
//! - A [`GraphicsContext`] that tears everything down in reverse order
//!
//! All API calls go through the [`GpuBackend`] trait. [`AshBackend`] talks to
//! a real driver; tests plug in a recording backend instead.

pub mod backend;
pub mod capabilities;
pub mod config;
pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod instance;
pub mod pipeline;
pub mod render_target;
pub mod surface;
pub mod swapchain;
pub mod vulkan;

pub use backend::{
    DeviceDesc, FramebufferDesc, GpuBackend, GraphicsPipelineDesc, ImageViewDesc, InstanceDesc,
    RenderPassDesc, SwapchainDesc,
};
pub use capabilities::{
    DeviceProperties, DeviceReport, GpuVendor, QueueFamilyInfo, SwapchainSupport,
};
pub use config::{ContextConfig, RequiredFeatures, KHRONOS_VALIDATION_LAYER};
pub use context::{GraphicsContext, GraphicsContextBuilder};
pub use device::{LogicalDevice, QueueFamilyIndices, SelectedDevice};
pub use error::{GpuError, Result};
pub use pipeline::{GraphicsPipeline, GraphicsPipelineConfig, ShaderSet};
pub use render_target::RenderTarget;
pub use surface::SurfaceTarget;
pub use swapchain::Swapchain;
pub use vulkan::AshBackend;

pub use ash;
