//! Render pass, pipeline and framebuffers on top of a swapchain.

use ash::vk;
use tracing::info;

use crate::backend::{FramebufferDesc, GpuBackend, RenderPassDesc};
use crate::error::{GpuError, Result};
use crate::pipeline::{GraphicsPipeline, GraphicsPipelineConfig, ShaderSet};
use crate::swapchain::Swapchain;

/// Single-sample color attachment cleared on load and presented at the end.
pub fn render_pass_desc(format: vk::Format) -> RenderPassDesc {
    RenderPassDesc {
        color_attachment: vk::AttachmentDescription::default()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
        color_attachment_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }
}

/// One framebuffer wrapping exactly `view`.
pub fn framebuffer_desc(
    render_pass: vk::RenderPass,
    view: vk::ImageView,
    extent: vk::Extent2D,
) -> FramebufferDesc {
    FramebufferDesc {
        render_pass,
        attachments: vec![view],
        extent,
        layers: 1,
    }
}

/// Everything needed to record draws into the swapchain images.
///
/// `framebuffers[i]` wraps `swapchain.image_views[i]`.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub render_pass: vk::RenderPass,
    pub pipeline: GraphicsPipeline,
    pub framebuffers: Vec<vk::Framebuffer>,
}

impl RenderTarget {
    /// Build render pass, pipeline and framebuffers for `swapchain`.
    ///
    /// Partially built state is released before an error is returned.
    pub fn new<B: GpuBackend + ?Sized>(
        backend: &mut B,
        swapchain: &Swapchain,
        config: &GraphicsPipelineConfig,
        shaders: &ShaderSet,
    ) -> Result<Self> {
        let render_pass = backend
            .create_render_pass(&render_pass_desc(swapchain.format))
            .map_err(|e| GpuError::RenderPassCreation(e.to_string()))?;

        let pipeline =
            match GraphicsPipeline::new(backend, config, shaders, render_pass, swapchain.extent) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    backend.destroy_render_pass(render_pass);
                    return Err(e);
                }
            };

        let mut target = Self {
            render_pass,
            pipeline,
            framebuffers: Vec::with_capacity(swapchain.image_views.len()),
        };

        for (i, &view) in swapchain.image_views.iter().enumerate() {
            let desc = framebuffer_desc(render_pass, view, swapchain.extent);
            match backend.create_framebuffer(&desc) {
                Ok(framebuffer) => target.framebuffers.push(framebuffer),
                Err(e) => {
                    target.destroy(backend);
                    return Err(GpuError::FramebufferCreation(format!("view {i}: {e}")));
                }
            }
        }

        info!(
            "Render target created ({} framebuffers)",
            target.framebuffers.len()
        );

        Ok(target)
    }

    /// Destroy framebuffers (newest first), pipeline, layout and render pass.
    pub fn destroy<B: GpuBackend + ?Sized>(self, backend: &mut B) {
        for &framebuffer in self.framebuffers.iter().rev() {
            backend.destroy_framebuffer(framebuffer);
        }
        self.pipeline.destroy(backend);
        backend.destroy_render_pass(self.render_pass);
    }
}
