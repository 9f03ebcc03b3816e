//! Graphics pipeline creation.

use ash::vk;

use crate::backend::{GpuBackend, GraphicsPipelineDesc};
use crate::error::{GpuError, Result};

/// Compiled SPIR-V for the two programmable stages.
#[derive(Debug, Clone, Default)]
pub struct ShaderSet {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

/// Fixed-function state of the graphics pipeline.
#[derive(Debug, Clone, Copy)]
pub struct GraphicsPipelineConfig {
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub samples: vk::SampleCountFlags,
    pub blend_enable: bool,
    pub color_write_mask: vk::ColorComponentFlags,
}

impl Default for GraphicsPipelineConfig {
    fn default() -> Self {
        Self {
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::CLOCKWISE,
            samples: vk::SampleCountFlags::TYPE_1,
            blend_enable: false,
            color_write_mask: vk::ColorComponentFlags::RGBA,
        }
    }
}

impl GraphicsPipelineConfig {
    /// Full pipeline description for a framebuffer of `extent`.
    ///
    /// Viewport and scissor are baked in and cover the whole extent.
    pub fn describe(
        &self,
        extent: vk::Extent2D,
        vertex_module: vk::ShaderModule,
        fragment_module: vk::ShaderModule,
        layout: vk::PipelineLayout,
        render_pass: vk::RenderPass,
    ) -> GraphicsPipelineDesc {
        GraphicsPipelineDesc {
            vertex_module,
            fragment_module,
            topology: self.topology,
            viewport: vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            },
            scissor: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            },
            polygon_mode: self.polygon_mode,
            cull_mode: self.cull_mode,
            front_face: self.front_face,
            line_width: 1.0,
            samples: self.samples,
            blend_enable: self.blend_enable,
            color_write_mask: self.color_write_mask,
            layout,
            render_pass,
            subpass: 0,
        }
    }
}

/// Graphics pipeline wrapper.
#[derive(Debug, Clone, Copy)]
pub struct GraphicsPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Create an empty layout and the pipeline for `render_pass`.
    ///
    /// Shader modules only live for the duration of this call. If any step
    /// fails, whatever was created here is released before returning.
    pub fn new<B: GpuBackend + ?Sized>(
        backend: &mut B,
        config: &GraphicsPipelineConfig,
        shaders: &ShaderSet,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let layout = backend
            .create_pipeline_layout()
            .map_err(|e| GpuError::PipelineCreation(format!("layout: {e}")))?;

        let vert_module = match backend.create_shader_module(&shaders.vertex) {
            Ok(module) => module,
            Err(e) => {
                backend.destroy_pipeline_layout(layout);
                return Err(GpuError::PipelineCreation(format!("vertex module: {e}")));
            }
        };
        let frag_module = match backend.create_shader_module(&shaders.fragment) {
            Ok(module) => module,
            Err(e) => {
                backend.destroy_shader_module(vert_module);
                backend.destroy_pipeline_layout(layout);
                return Err(GpuError::PipelineCreation(format!("fragment module: {e}")));
            }
        };

        let desc = config.describe(extent, vert_module, frag_module, layout, render_pass);
        let pipeline = backend.create_graphics_pipeline(&desc);

        // Clean up shader modules
        backend.destroy_shader_module(frag_module);
        backend.destroy_shader_module(vert_module);

        match pipeline {
            Ok(pipeline) => Ok(Self { pipeline, layout }),
            Err(e) => {
                backend.destroy_pipeline_layout(layout);
                Err(GpuError::PipelineCreation(e.to_string()))
            }
        }
    }

    /// Destroy the pipeline, then its layout.
    ///
    /// The pipeline must not be in use.
    pub fn destroy<B: GpuBackend + ?Sized>(self, backend: &mut B) {
        backend.destroy_pipeline(self.pipeline);
        backend.destroy_pipeline_layout(self.layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_matches_fixed_function_setup() {
        let config = GraphicsPipelineConfig::default();
        assert_eq!(config.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(config.polygon_mode, vk::PolygonMode::FILL);
        assert_eq!(config.cull_mode, vk::CullModeFlags::BACK);
        assert_eq!(config.samples, vk::SampleCountFlags::TYPE_1);
        assert!(!config.blend_enable);
        assert_eq!(config.color_write_mask, vk::ColorComponentFlags::RGBA);
    }

    #[test]
    fn viewport_and_scissor_cover_extent() {
        let extent = vk::Extent2D {
            width: 1280,
            height: 720,
        };
        let desc = GraphicsPipelineConfig::default().describe(
            extent,
            vk::ShaderModule::null(),
            vk::ShaderModule::null(),
            vk::PipelineLayout::null(),
            vk::RenderPass::null(),
        );

        assert!((desc.viewport.width - 1280.0).abs() < f32::EPSILON);
        assert!((desc.viewport.height - 720.0).abs() < f32::EPSILON);
        assert!((desc.viewport.max_depth - 1.0).abs() < f32::EPSILON);
        assert_eq!(desc.scissor.offset.x, 0);
        assert_eq!(desc.scissor.extent.width, 1280);
        assert_eq!(desc.scissor.extent.height, 720);
        assert_eq!(desc.subpass, 0);
    }
}
