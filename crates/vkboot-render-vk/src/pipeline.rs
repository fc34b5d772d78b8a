// SPDX-License-Identifier: CEPL-1.0
//! Render pass, fixed-function graphics pipeline and the framebuffers that
//! tie the pass to the swapchain image views.

use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;

use ash::vk;
use tracing::{debug, info};
use vkboot_core::{read_bytes, ShaderPaths};

use crate::driver::{Driver, FramebufferPlan, GraphicsPipelinePlan, RenderPassPlan, ShaderStagePlan};
use crate::error::InitError;

pub const SHADER_ENTRY: &CStr = c"main";

pub fn render_pass_plan(color_format: vk::Format) -> RenderPassPlan {
    RenderPassPlan {
        color_format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        subpass_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }
}

pub fn create_render_pass<D: Driver>(
    driver: &mut D,
    color_format: vk::Format,
) -> Result<vk::RenderPass, InitError> {
    driver
        .create_render_pass(&render_pass_plan(color_format))
        .map_err(InitError::RenderPassCreationFailed)
}

/// Reads a compiled SPIR-V blob into aligned words.
pub fn load_shader(path: &Path) -> Result<Vec<u32>, InitError> {
    let bytes = read_bytes(path)?;
    debug!("loaded {} bytes of SPIR-V from {}", bytes.len(), path.display());
    ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|source| InitError::InvalidShaderCode {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Clone, Copy, Debug)]
pub struct ShaderModules {
    pub vertex: vk::ShaderModule,
    pub fragment: vk::ShaderModule,
}

fn create_shader_modules<D: Driver>(
    driver: &mut D,
    vertex: &[u32],
    fragment: &[u32],
) -> Result<ShaderModules, InitError> {
    let vertex = driver
        .create_shader_module(vertex)
        .map_err(InitError::ShaderModuleCreationFailed)?;
    match driver.create_shader_module(fragment) {
        Ok(fragment) => Ok(ShaderModules { vertex, fragment }),
        Err(e) => {
            driver.destroy_shader_module(vertex);
            Err(InitError::ShaderModuleCreationFailed(e))
        }
    }
}

pub fn pipeline_plan(
    extent: vk::Extent2D,
    modules: &ShaderModules,
    layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
) -> GraphicsPipelinePlan {
    GraphicsPipelinePlan {
        stages: vec![
            ShaderStagePlan {
                stage: vk::ShaderStageFlags::VERTEX,
                module: modules.vertex,
                entry_point: SHADER_ENTRY,
            },
            ShaderStagePlan {
                stage: vk::ShaderStageFlags::FRAGMENT,
                module: modules.fragment,
                entry_point: SHADER_ENTRY,
            },
        ],
        topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        primitive_restart: false,
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
        polygon_mode: vk::PolygonMode::FILL,
        cull_mode: vk::CullModeFlags::BACK,
        front_face: vk::FrontFace::CLOCKWISE,
        line_width: 1.0,
        depth_bias: false,
        samples: vk::SampleCountFlags::TYPE_1,
        color_blend: vk::PipelineColorBlendAttachmentState {
            blend_enable: vk::FALSE,
            color_write_mask: vk::ColorComponentFlags::RGBA,
            ..Default::default()
        },
        layout,
        render_pass,
        subpass: 0,
    }
}

/// Builds the pipeline layout and the pipeline.
///
/// The layout lands in `layout_slot` as soon as it exists. Shader modules
/// live only for the duration of this call, whatever its outcome.
pub fn create_graphics_pipeline<D: Driver>(
    driver: &mut D,
    shaders: &ShaderPaths,
    extent: vk::Extent2D,
    render_pass: vk::RenderPass,
    layout_slot: &mut Option<vk::PipelineLayout>,
) -> Result<vk::Pipeline, InitError> {
    let vertex = load_shader(&shaders.vertex)?;
    let fragment = load_shader(&shaders.fragment)?;
    let modules = create_shader_modules(driver, &vertex, &fragment)?;

    let result = build_pipeline(driver, &modules, extent, render_pass, layout_slot);

    driver.destroy_shader_module(modules.fragment);
    driver.destroy_shader_module(modules.vertex);
    result
}

fn build_pipeline<D: Driver>(
    driver: &mut D,
    modules: &ShaderModules,
    extent: vk::Extent2D,
    render_pass: vk::RenderPass,
    layout_slot: &mut Option<vk::PipelineLayout>,
) -> Result<vk::Pipeline, InitError> {
    let layout = driver
        .create_pipeline_layout()
        .map_err(InitError::PipelineLayoutCreationFailed)?;
    *layout_slot = Some(layout);

    let pipeline = driver
        .create_graphics_pipeline(&pipeline_plan(extent, modules, layout, render_pass))
        .map_err(InitError::PipelineCreationFailed)?;
    info!("graphics pipeline ready");
    Ok(pipeline)
}

pub fn framebuffer_plan(
    render_pass: vk::RenderPass,
    view: vk::ImageView,
    extent: vk::Extent2D,
) -> FramebufferPlan {
    FramebufferPlan {
        render_pass,
        attachments: vec![view],
        extent,
        layers: 1,
    }
}

/// One framebuffer per view, pushed into `framebuffers` as each one exists.
pub fn create_framebuffers<D: Driver>(
    driver: &mut D,
    render_pass: vk::RenderPass,
    views: &[vk::ImageView],
    extent: vk::Extent2D,
    framebuffers: &mut Vec<vk::Framebuffer>,
) -> Result<(), InitError> {
    for &view in views {
        let fb = driver
            .create_framebuffer(&framebuffer_plan(render_pass, view, extent))
            .map_err(InitError::FramebufferCreationFailed)?;
        framebuffers.push(fb);
    }
    Ok(())
}
