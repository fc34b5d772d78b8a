// SPDX-License-Identifier: CEPL-1.0
//! In-memory [`Driver`] for tests: fake sequential handles, a shared call
//! log, scripted physical devices and injectable failures.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle};
use vkboot_core::ShaderPaths;
use vkboot_render::SurfaceTarget;

use super::{
    DebugMessengerPlan, DevicePlan, Driver, FramebufferPlan, GraphicsPipelinePlan, ImageViewPlan,
    InstancePlan, RenderPassPlan, SwapchainPlan,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Step {
    Instance,
    Surface,
    DebugMessenger,
    Device,
    Swapchain,
    SwapchainImages,
    ImageView,
    ShaderModule,
    RenderPass,
    PipelineLayout,
    Pipeline,
    Framebuffer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Create(Step, u64),
    Destroy(Step, u64),
    WaitIdle,
}

#[derive(Debug, Default)]
pub(crate) struct MockLog {
    pub calls: Vec<Call>,
    pub instance_plan: Option<InstancePlan>,
    pub messenger_plan: Option<DebugMessengerPlan>,
    pub device_plan: Option<DevicePlan>,
    pub swapchain_plan: Option<SwapchainPlan>,
    pub image_view_plans: Vec<ImageViewPlan>,
    pub render_pass_plan: Option<RenderPassPlan>,
    pub pipeline_plan: Option<GraphicsPipelinePlan>,
    pub framebuffer_plans: Vec<FramebufferPlan>,
    pub surface_queries: usize,
    pub queue_family_queries: usize,
}

impl MockLog {
    pub fn created(&self, step: Step) -> Vec<u64> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                Call::Create(s, id) if s == step => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn destroyed_steps(&self) -> Vec<Step> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                Call::Destroy(s, _) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Every created handle, in creation order, paired with its destroy count.
    pub fn destroy_counts(&self) -> Vec<(Step, u64, usize)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                Call::Create(s, id) => {
                    let n = self
                        .calls
                        .iter()
                        .filter(|d| **d == Call::Destroy(s, id))
                        .count();
                    Some((s, id, n))
                }
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct MockFamily {
    pub flags: vk::QueueFlags,
    pub count: u32,
    pub present: bool,
}

impl MockFamily {
    pub fn new(flags: vk::QueueFlags, present: bool) -> Self {
        MockFamily {
            flags,
            count: 1,
            present,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct MockDevice {
    pub name: String,
    pub extensions: Vec<String>,
    pub families: Vec<MockFamily>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl MockDevice {
    /// A device that passes every suitability check with one combined family.
    pub fn capable(name: &str) -> Self {
        MockDevice {
            name: name.to_owned(),
            extensions: vec!["VK_KHR_swapchain".to_owned()],
            families: vec![MockFamily::new(
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
                true,
            )],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 800,
                    height: 600,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        }
    }
}

pub(crate) const BASE_DEVICE: u64 = 0x1000;

pub(crate) fn physical(index: usize) -> vk::PhysicalDevice {
    vk::PhysicalDevice::from_raw(BASE_DEVICE + index as u64)
}

pub(crate) fn target() -> SurfaceTarget {
    SurfaceTarget::new(
        RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
        RawWindowHandle::Xlib(XlibWindowHandle::new(1)),
    )
}

/// Writes two minimal SPIR-V blobs (magic number plus a header) under the temp dir.
pub(crate) fn shader_pair(tag: &str) -> ShaderPaths {
    let dir = std::env::temp_dir().join(format!("vkboot-vk-{}-{tag}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let words: [u32; 5] = [0x0723_0203, 0x0001_0000, 0, 1, 0];
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    let vertex = dir.join("vert.spv");
    let fragment = dir.join("frag.spv");
    std::fs::write(&vertex, &bytes).unwrap();
    std::fs::write(&fragment, &bytes).unwrap();
    ShaderPaths { vertex, fragment }
}

pub(crate) fn missing_shader(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vkboot-vk-{}-{tag}-missing.spv", std::process::id()))
}

pub(crate) struct MockDriver {
    pub layers: Vec<String>,
    pub instance_extensions: Vec<String>,
    pub surface_extensions: Vec<String>,
    pub devices: Vec<MockDevice>,
    failures: HashMap<Step, usize>,
    created: HashMap<Step, usize>,
    next_handle: u64,
    log: Rc<RefCell<MockLog>>,
}

impl MockDriver {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        MockDriver {
            layers: vec!["VK_LAYER_KHRONOS_validation".to_owned()],
            instance_extensions: vec![
                "VK_KHR_surface".to_owned(),
                "VK_KHR_xlib_surface".to_owned(),
                "VK_EXT_debug_utils".to_owned(),
            ],
            surface_extensions: vec!["VK_KHR_surface".to_owned(), "VK_KHR_xlib_surface".to_owned()],
            devices,
            failures: HashMap::new(),
            created: HashMap::new(),
            next_handle: 1,
            log: Rc::default(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(vec![MockDevice::capable("Mock GPU")])
    }

    pub fn log(&self) -> Rc<RefCell<MockLog>> {
        Rc::clone(&self.log)
    }

    /// Fail the `nth` (0-based) create call of `step`.
    pub fn fail_on_nth(mut self, step: Step, nth: usize) -> Self {
        self.failures.insert(step, nth);
        self
    }

    pub fn fail_on(self, step: Step) -> Self {
        self.fail_on_nth(step, 0)
    }

    fn device(&self, device: vk::PhysicalDevice) -> VkResult<&MockDevice> {
        device
            .as_raw()
            .checked_sub(BASE_DEVICE)
            .and_then(|i| self.devices.get(i as usize))
            .ok_or(vk::Result::ERROR_DEVICE_LOST)
    }

    fn create<H: Handle>(&mut self, step: Step) -> VkResult<H> {
        let seen = self.created.entry(step).or_insert(0);
        let nth = *seen;
        *seen += 1;
        if self.failures.get(&step) == Some(&nth) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let id = self.next_handle;
        self.next_handle += 1;
        self.log.borrow_mut().calls.push(Call::Create(step, id));
        Ok(H::from_raw(id))
    }

    fn destroy<H: Handle>(&mut self, step: Step, handle: H) {
        self.log
            .borrow_mut()
            .calls
            .push(Call::Destroy(step, handle.as_raw()));
    }
}

impl Driver for MockDriver {
    fn instance_layers(&self) -> VkResult<Vec<String>> {
        Ok(self.layers.clone())
    }

    fn instance_extensions(&self) -> VkResult<Vec<String>> {
        Ok(self.instance_extensions.clone())
    }

    fn surface_extensions(&self, _target: &SurfaceTarget) -> VkResult<Vec<String>> {
        Ok(self.surface_extensions.clone())
    }

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        Ok((0..self.devices.len()).map(physical).collect())
    }

    fn device_name(&self, device: vk::PhysicalDevice) -> String {
        self.device(device)
            .map(|d| d.name.clone())
            .unwrap_or_default()
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        self.log.borrow_mut().queue_family_queries += 1;
        self.device(device)
            .map(|d| {
                d.families
                    .iter()
                    .map(|f| vk::QueueFamilyProperties {
                        queue_flags: f.flags,
                        queue_count: f.count,
                        ..Default::default()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        Ok(self.device(device)?.extensions.clone())
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        Ok(self
            .device(device)?
            .families
            .get(family as usize)
            .is_some_and(|f| f.present))
    }

    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        self.log.borrow_mut().surface_queries += 1;
        Ok(self.device(device)?.capabilities)
    }

    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        self.log.borrow_mut().surface_queries += 1;
        Ok(self.device(device)?.formats.clone())
    }

    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        self.log.borrow_mut().surface_queries += 1;
        Ok(self.device(device)?.present_modes.clone())
    }

    fn create_instance(&mut self, plan: &InstancePlan) -> VkResult<vk::Instance> {
        let instance = self.create(Step::Instance)?;
        self.log.borrow_mut().instance_plan = Some(plan.clone());
        Ok(instance)
    }

    fn create_surface(&mut self, _target: &SurfaceTarget) -> VkResult<vk::SurfaceKHR> {
        self.create(Step::Surface)
    }

    fn create_debug_messenger(
        &mut self,
        plan: &DebugMessengerPlan,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let messenger = self.create(Step::DebugMessenger)?;
        self.log.borrow_mut().messenger_plan = Some(*plan);
        Ok(messenger)
    }

    fn create_device(
        &mut self,
        _physical: vk::PhysicalDevice,
        plan: &DevicePlan,
    ) -> VkResult<vk::Device> {
        let device = self.create(Step::Device)?;
        self.log.borrow_mut().device_plan = Some(plan.clone());
        Ok(device)
    }

    fn device_queue(&self, family: u32, index: u32) -> vk::Queue {
        vk::Queue::from_raw(0x9000 + u64::from(family) * 16 + u64::from(index))
    }

    fn create_swapchain(&mut self, plan: &SwapchainPlan) -> VkResult<vk::SwapchainKHR> {
        let swapchain = self.create(Step::Swapchain)?;
        self.log.borrow_mut().swapchain_plan = Some(plan.clone());
        Ok(swapchain)
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        if self.failures.get(&Step::SwapchainImages) == Some(&0) {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        let count = self
            .log
            .borrow()
            .swapchain_plan
            .as_ref()
            .map_or(0, |p| p.min_image_count);
        Ok((0..count)
            .map(|i| vk::Image::from_raw(0x8000 + u64::from(i)))
            .collect())
    }

    fn create_image_view(&mut self, plan: &ImageViewPlan) -> VkResult<vk::ImageView> {
        let view = self.create(Step::ImageView)?;
        self.log.borrow_mut().image_view_plans.push(*plan);
        Ok(view)
    }

    fn create_shader_module(&mut self, _code: &[u32]) -> VkResult<vk::ShaderModule> {
        self.create(Step::ShaderModule)
    }

    fn create_render_pass(&mut self, plan: &RenderPassPlan) -> VkResult<vk::RenderPass> {
        let render_pass = self.create(Step::RenderPass)?;
        self.log.borrow_mut().render_pass_plan = Some(*plan);
        Ok(render_pass)
    }

    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout> {
        self.create(Step::PipelineLayout)
    }

    fn create_graphics_pipeline(&mut self, plan: &GraphicsPipelinePlan) -> VkResult<vk::Pipeline> {
        let pipeline = self.create(Step::Pipeline)?;
        self.log.borrow_mut().pipeline_plan = Some(plan.clone());
        Ok(pipeline)
    }

    fn create_framebuffer(&mut self, plan: &FramebufferPlan) -> VkResult<vk::Framebuffer> {
        let framebuffer = self.create(Step::Framebuffer)?;
        self.log.borrow_mut().framebuffer_plans.push(plan.clone());
        Ok(framebuffer)
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        self.log.borrow_mut().calls.push(Call::WaitIdle);
        Ok(())
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        self.destroy(Step::Framebuffer, framebuffer);
    }

    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.destroy(Step::Pipeline, pipeline);
    }

    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout) {
        self.destroy(Step::PipelineLayout, layout);
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        self.destroy(Step::RenderPass, render_pass);
    }

    fn destroy_shader_module(&mut self, module: vk::ShaderModule) {
        self.destroy(Step::ShaderModule, module);
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        self.destroy(Step::ImageView, view);
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        self.destroy(Step::Swapchain, swapchain);
    }

    fn destroy_device(&mut self, device: vk::Device) {
        self.destroy(Step::Device, device);
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        self.destroy(Step::DebugMessenger, messenger);
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        self.destroy(Step::Surface, surface);
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        self.destroy(Step::Instance, instance);
    }
}
