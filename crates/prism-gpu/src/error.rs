//! GPU error types.

use ash::vk;
use thiserror::Error;

/// Errors produced while bootstrapping or tearing down a graphics context.
///
/// Every creation stage maps its own API failure onto exactly one variant so
/// callers can tell which stage of the bootstrap rejected the environment.
#[derive(Error, Debug)]
pub enum GpuError {
    /// A read-only query against the API failed.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// An instance or device extension (or its entry points) is missing.
    #[error("Extension unavailable: {0}")]
    ExtensionUnavailable(String),

    /// A requested instance layer is not installed.
    #[error("Layer unavailable: {0}")]
    LayerUnavailable(String),

    /// The API runtime could not be loaded or rejected instance creation.
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// No physical device scored above zero.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Logical device creation failed.
    #[error("Device creation failed: {0}")]
    DeviceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Image view creation failed.
    #[error("Image view creation failed: {0}")]
    ImageViewCreation(String),

    /// Render pass creation failed.
    #[error("Render pass creation failed: {0}")]
    RenderPassCreation(String),

    /// Pipeline, pipeline layout or shader module creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Framebuffer creation failed.
    #[error("Framebuffer creation failed: {0}")]
    FramebufferCreation(String),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
