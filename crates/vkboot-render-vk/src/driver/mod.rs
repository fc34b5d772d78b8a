// SPDX-License-Identifier: CEPL-1.0
//! The seam between the initialization chain and the Vulkan driver.
//!
//! Probing methods are read-only. Creation methods take a plain-data plan
//! describing exactly one create call, so every decision made by the chain can
//! be inspected without a GPU. Destroy methods consume nothing but the handle.

mod ash_driver;
#[cfg(test)]
pub(crate) mod mock;

pub use ash_driver::AshDriver;

use std::ffi::CStr;

use ash::prelude::VkResult;
use ash::vk;
use vkboot_render::SurfaceTarget;

pub trait Driver {
    // Capability probing.
    fn instance_layers(&self) -> VkResult<Vec<String>>;
    fn instance_extensions(&self) -> VkResult<Vec<String>>;
    /// Instance extensions the window system needs to present to `target`.
    fn surface_extensions(&self, target: &SurfaceTarget) -> VkResult<Vec<String>>;
    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn device_name(&self, device: vk::PhysicalDevice) -> String;
    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;
    fn device_extensions(&self, device: vk::PhysicalDevice) -> VkResult<Vec<String>>;
    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;
    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;
    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;
    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    // Creation.
    fn create_instance(&mut self, plan: &InstancePlan) -> VkResult<vk::Instance>;
    fn create_surface(&mut self, target: &SurfaceTarget) -> VkResult<vk::SurfaceKHR>;
    fn create_debug_messenger(
        &mut self,
        plan: &DebugMessengerPlan,
    ) -> VkResult<vk::DebugUtilsMessengerEXT>;
    fn create_device(
        &mut self,
        physical: vk::PhysicalDevice,
        plan: &DevicePlan,
    ) -> VkResult<vk::Device>;
    fn device_queue(&self, family: u32, index: u32) -> vk::Queue;
    fn create_swapchain(&mut self, plan: &SwapchainPlan) -> VkResult<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;
    fn create_image_view(&mut self, plan: &ImageViewPlan) -> VkResult<vk::ImageView>;
    fn create_shader_module(&mut self, code: &[u32]) -> VkResult<vk::ShaderModule>;
    fn create_render_pass(&mut self, plan: &RenderPassPlan) -> VkResult<vk::RenderPass>;
    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout>;
    fn create_graphics_pipeline(&mut self, plan: &GraphicsPipelinePlan) -> VkResult<vk::Pipeline>;
    fn create_framebuffer(&mut self, plan: &FramebufferPlan) -> VkResult<vk::Framebuffer>;

    fn device_wait_idle(&self) -> VkResult<()>;

    // Destruction.
    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer);
    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline);
    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout);
    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass);
    fn destroy_shader_module(&mut self, module: vk::ShaderModule);
    fn destroy_image_view(&mut self, view: vk::ImageView);
    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR);
    fn destroy_device(&mut self, device: vk::Device);
    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT);
    fn destroy_surface(&mut self, surface: vk::SurfaceKHR);
    fn destroy_instance(&mut self, instance: vk::Instance);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstancePlan {
    pub app_name: String,
    pub engine_name: String,
    pub app_version: u32,
    pub engine_version: u32,
    pub api_version: u32,
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugMessengerPlan {
    pub severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    pub message_types: vk::DebugUtilsMessageTypeFlagsEXT,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueuePlan {
    pub family: u32,
    pub priorities: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DevicePlan {
    pub queues: Vec<QueuePlan>,
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SwapchainPlan {
    pub surface: vk::SurfaceKHR,
    pub min_image_count: u32,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub image_usage: vk::ImageUsageFlags,
    pub sharing_mode: vk::SharingMode,
    /// Empty unless `sharing_mode` is CONCURRENT.
    pub queue_family_indices: Vec<u32>,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
    pub clipped: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct ImageViewPlan {
    pub image: vk::Image,
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub components: vk::ComponentMapping,
    pub subresource_range: vk::ImageSubresourceRange,
}

#[derive(Clone, Copy, Debug)]
pub struct RenderPassPlan {
    pub color_format: vk::Format,
    pub samples: vk::SampleCountFlags,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
    pub initial_layout: vk::ImageLayout,
    pub final_layout: vk::ImageLayout,
    /// Layout of attachment 0 inside the single graphics subpass.
    pub subpass_layout: vk::ImageLayout,
}

#[derive(Clone, Copy, Debug)]
pub struct ShaderStagePlan {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
    pub entry_point: &'static CStr,
}

#[derive(Clone, Debug)]
pub struct GraphicsPipelinePlan {
    pub stages: Vec<ShaderStagePlan>,
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart: bool,
    pub viewport: vk::Viewport,
    pub scissor: vk::Rect2D,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub line_width: f32,
    pub depth_bias: bool,
    pub samples: vk::SampleCountFlags,
    pub color_blend: vk::PipelineColorBlendAttachmentState,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub subpass: u32,
}

#[derive(Clone, Debug)]
pub struct FramebufferPlan {
    pub render_pass: vk::RenderPass,
    pub attachments: Vec<vk::ImageView>,
    pub extent: vk::Extent2D,
    pub layers: u32,
}
