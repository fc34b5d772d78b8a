// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_void, CStr, CString, OsStr};

use ash::ext::debug_utils;
use ash::khr::{surface, swapchain};
use ash::prelude::VkResult;
use ash::{vk, Entry};
use vkboot_render::SurfaceTarget;

use super::{
    DebugMessengerPlan, DevicePlan, Driver, FramebufferPlan, GraphicsPipelinePlan, ImageViewPlan,
    InstancePlan, RenderPassPlan, SwapchainPlan,
};
use crate::error::InitError;
use crate::instance::log_validation_message;
use crate::surface::{PlatformSurfaceBinder, SurfaceBinder};

/// [`Driver`] backed by the system Vulkan loader.
///
/// Holds the dispatch tables for the one instance and one device the chain
/// creates. Calls that need a table which does not exist yet report
/// `ERROR_INITIALIZATION_FAILED`.
pub struct AshDriver<B: SurfaceBinder = PlatformSurfaceBinder> {
    entry: Entry,
    binder: B,
    instance: Option<ash::Instance>,
    surface_loader: Option<surface::Instance>,
    debug_loader: Option<debug_utils::Instance>,
    device: Option<ash::Device>,
    swapchain_loader: Option<swapchain::Device>,
}

impl AshDriver<PlatformSurfaceBinder> {
    /// Loads the system Vulkan loader from its default location.
    pub fn load() -> Result<Self, InitError> {
        Self::with_binder(PlatformSurfaceBinder::default())
    }

    /// Loads a specific loader library, e.g. a bundled `libvulkan.so.1`.
    pub fn load_from(path: impl AsRef<OsStr>) -> Result<Self, InitError> {
        // SAFETY: see `with_binder`.
        let entry = unsafe { Entry::load_from(path)? };
        Ok(Self::from_entry(entry, PlatformSurfaceBinder::default()))
    }
}

impl<B: SurfaceBinder> AshDriver<B> {
    pub fn with_binder(binder: B) -> Result<Self, InitError> {
        // SAFETY: the loader library stays loaded for as long as `entry` lives,
        // and `entry` outlives every table derived from it.
        let entry = unsafe { Entry::load()? };
        Ok(Self::from_entry(entry, binder))
    }

    fn from_entry(entry: Entry, binder: B) -> Self {
        AshDriver {
            entry,
            binder,
            instance: None,
            surface_loader: None,
            debug_loader: None,
            device: None,
            swapchain_loader: None,
        }
    }

    fn instance(&self) -> VkResult<&ash::Instance> {
        self.instance
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn surface_loader(&self) -> VkResult<&surface::Instance> {
        self.surface_loader
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn device(&self) -> VkResult<&ash::Device> {
        self.device
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn swapchain_loader(&self) -> VkResult<&swapchain::Device> {
        self.swapchain_loader
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }
}

fn to_cstrings(names: &[String]) -> VkResult<Vec<CString>> {
    names
        .iter()
        .map(|n| CString::new(n.as_str()).map_err(|_| vk::Result::ERROR_INITIALIZATION_FAILED))
        .collect()
}

fn cstr_lossy(name: Result<&CStr, impl Sized>) -> Option<String> {
    name.ok().map(|n| n.to_string_lossy().into_owned())
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    // SAFETY: the loader passes either null or a valid callback data pointer
    // whose message is a NUL-terminated string.
    unsafe {
        if !data.is_null() && !(*data).p_message.is_null() {
            let msg = CStr::from_ptr((*data).p_message);
            log_validation_message(severity, types, &msg.to_string_lossy());
        }
    }
    vk::FALSE
}

impl<B: SurfaceBinder> Driver for AshDriver<B> {
    fn instance_layers(&self) -> VkResult<Vec<String>> {
        let layers = unsafe { self.entry.enumerate_instance_layer_properties()? };
        Ok(layers
            .iter()
            .filter_map(|l| cstr_lossy(l.layer_name_as_c_str()))
            .collect())
    }

    fn instance_extensions(&self) -> VkResult<Vec<String>> {
        let exts = unsafe { self.entry.enumerate_instance_extension_properties(None)? };
        Ok(exts
            .iter()
            .filter_map(|e| cstr_lossy(e.extension_name_as_c_str()))
            .collect())
    }

    fn surface_extensions(&self, target: &SurfaceTarget) -> VkResult<Vec<String>> {
        Ok(self
            .binder
            .required_extensions(target.display)?
            .into_iter()
            .map(|n| n.to_string_lossy().into_owned())
            .collect())
    }

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance()?.enumerate_physical_devices() }
    }

    fn device_name(&self, device: vk::PhysicalDevice) -> String {
        let Ok(instance) = self.instance() else {
            return String::new();
        };
        let props = unsafe { instance.get_physical_device_properties(device) };
        cstr_lossy(props.device_name_as_c_str()).unwrap_or_default()
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        match self.instance() {
            Ok(instance) => unsafe { instance.get_physical_device_queue_family_properties(device) },
            Err(_) => Vec::new(),
        }
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        let exts = unsafe { self.instance()?.enumerate_device_extension_properties(device)? };
        Ok(exts
            .iter()
            .filter_map(|e| cstr_lossy(e.extension_name_as_c_str()))
            .collect())
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_support(device, family, surface)
        }
    }

    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_capabilities(device, surface)
        }
    }

    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_formats(device, surface)
        }
    }

    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_present_modes(device, surface)
        }
    }

    fn create_instance(&mut self, plan: &InstancePlan) -> VkResult<vk::Instance> {
        let app_name = CString::new(plan.app_name.as_str())
            .map_err(|_| vk::Result::ERROR_INITIALIZATION_FAILED)?;
        let engine_name = CString::new(plan.engine_name.as_str())
            .map_err(|_| vk::Result::ERROR_INITIALIZATION_FAILED)?;
        let extensions = to_cstrings(&plan.extensions)?;
        let layers = to_cstrings(&plan.layers)?;
        let ext_ptrs: Vec<_> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layer_ptrs: Vec<_> = layers.iter().map(|l| l.as_ptr()).collect();

        let app_info = vk::ApplicationInfo {
            s_type: vk::StructureType::APPLICATION_INFO,
            p_application_name: app_name.as_ptr(),
            application_version: plan.app_version,
            p_engine_name: engine_name.as_ptr(),
            engine_version: plan.engine_version,
            api_version: plan.api_version,
            ..Default::default()
        };

        let create_info = vk::InstanceCreateInfo {
            s_type: vk::StructureType::INSTANCE_CREATE_INFO,
            p_application_info: &app_info,
            enabled_extension_count: ext_ptrs.len() as u32,
            pp_enabled_extension_names: ext_ptrs.as_ptr(),
            enabled_layer_count: layer_ptrs.len() as u32,
            pp_enabled_layer_names: layer_ptrs.as_ptr(),
            ..Default::default()
        };

        let instance = unsafe { self.entry.create_instance(&create_info, None)? };
        let handle = instance.handle();
        self.surface_loader = Some(surface::Instance::new(&self.entry, &instance));
        self.debug_loader = Some(debug_utils::Instance::new(&self.entry, &instance));
        self.instance = Some(instance);
        Ok(handle)
    }

    fn create_surface(&mut self, target: &SurfaceTarget) -> VkResult<vk::SurfaceKHR> {
        let instance = self.instance()?;
        unsafe { self.binder.bind_surface(&self.entry, instance, target) }
    }

    fn create_debug_messenger(
        &mut self,
        plan: &DebugMessengerPlan,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let loader = self
            .debug_loader
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        let ci = vk::DebugUtilsMessengerCreateInfoEXT {
            s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
            message_severity: plan.severity,
            message_type: plan.message_types,
            pfn_user_callback: Some(debug_callback),
            ..Default::default()
        };
        unsafe { loader.create_debug_utils_messenger(&ci, None) }
    }

    fn create_device(
        &mut self,
        physical: vk::PhysicalDevice,
        plan: &DevicePlan,
    ) -> VkResult<vk::Device> {
        let instance = self.instance()?;
        let queue_infos: Vec<_> = plan
            .queues
            .iter()
            .map(|q| vk::DeviceQueueCreateInfo {
                s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
                queue_family_index: q.family,
                queue_count: q.priorities.len() as u32,
                p_queue_priorities: q.priorities.as_ptr(),
                ..Default::default()
            })
            .collect();
        let extensions = to_cstrings(&plan.extensions)?;
        let layers = to_cstrings(&plan.layers)?;
        let ext_ptrs: Vec<_> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layer_ptrs: Vec<_> = layers.iter().map(|l| l.as_ptr()).collect();
        let features = vk::PhysicalDeviceFeatures::default();

        let dinfo = vk::DeviceCreateInfo {
            s_type: vk::StructureType::DEVICE_CREATE_INFO,
            queue_create_info_count: queue_infos.len() as u32,
            p_queue_create_infos: queue_infos.as_ptr(),
            enabled_extension_count: ext_ptrs.len() as u32,
            pp_enabled_extension_names: ext_ptrs.as_ptr(),
            enabled_layer_count: layer_ptrs.len() as u32,
            pp_enabled_layer_names: layer_ptrs.as_ptr(),
            p_enabled_features: &features,
            ..Default::default()
        };

        let device = unsafe { instance.create_device(physical, &dinfo, None)? };
        let handle = device.handle();
        self.swapchain_loader = Some(swapchain::Device::new(instance, &device));
        self.device = Some(device);
        Ok(handle)
    }

    fn device_queue(&self, family: u32, index: u32) -> vk::Queue {
        match self.device() {
            Ok(device) => unsafe { device.get_device_queue(family, index) },
            Err(_) => vk::Queue::null(),
        }
    }

    fn create_swapchain(&mut self, plan: &SwapchainPlan) -> VkResult<vk::SwapchainKHR> {
        let swap_info = vk::SwapchainCreateInfoKHR {
            s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
            surface: plan.surface,
            min_image_count: plan.min_image_count,
            image_format: plan.format.format,
            image_color_space: plan.format.color_space,
            image_extent: plan.extent,
            image_array_layers: 1,
            image_usage: plan.image_usage,
            image_sharing_mode: plan.sharing_mode,
            queue_family_index_count: plan.queue_family_indices.len() as u32,
            p_queue_family_indices: plan.queue_family_indices.as_ptr(),
            pre_transform: plan.pre_transform,
            composite_alpha: plan.composite_alpha,
            present_mode: plan.present_mode,
            clipped: if plan.clipped { vk::TRUE } else { vk::FALSE },
            old_swapchain: vk::SwapchainKHR::null(),
            ..Default::default()
        };
        unsafe { self.swapchain_loader()?.create_swapchain(&swap_info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        unsafe { self.swapchain_loader()?.get_swapchain_images(swapchain) }
    }

    fn create_image_view(&mut self, plan: &ImageViewPlan) -> VkResult<vk::ImageView> {
        let iv_info = vk::ImageViewCreateInfo {
            s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
            image: plan.image,
            view_type: plan.view_type,
            format: plan.format,
            components: plan.components,
            subresource_range: plan.subresource_range,
            ..Default::default()
        };
        unsafe { self.device()?.create_image_view(&iv_info, None) }
    }

    fn create_shader_module(&mut self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        let ci = vk::ShaderModuleCreateInfo {
            s_type: vk::StructureType::SHADER_MODULE_CREATE_INFO,
            p_code: code.as_ptr(),
            code_size: std::mem::size_of_val(code),
            ..Default::default()
        };
        unsafe { self.device()?.create_shader_module(&ci, None) }
    }

    fn create_render_pass(&mut self, plan: &RenderPassPlan) -> VkResult<vk::RenderPass> {
        let color_att = vk::AttachmentDescription {
            format: plan.color_format,
            samples: plan.samples,
            load_op: plan.load_op,
            store_op: plan.store_op,
            stencil_load_op: plan.stencil_load_op,
            stencil_store_op: plan.stencil_store_op,
            initial_layout: plan.initial_layout,
            final_layout: plan.final_layout,
            ..Default::default()
        };
        let att_ref = vk::AttachmentReference {
            attachment: 0,
            layout: plan.subpass_layout,
        };
        let subpass = vk::SubpassDescription {
            pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
            color_attachment_count: 1,
            p_color_attachments: &att_ref,
            ..Default::default()
        };
        let rp_info = vk::RenderPassCreateInfo {
            s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
            attachment_count: 1,
            p_attachments: &color_att,
            subpass_count: 1,
            p_subpasses: &subpass,
            ..Default::default()
        };
        unsafe { self.device()?.create_render_pass(&rp_info, None) }
    }

    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout> {
        let layout_info = vk::PipelineLayoutCreateInfo {
            s_type: vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO,
            ..Default::default()
        };
        unsafe { self.device()?.create_pipeline_layout(&layout_info, None) }
    }

    fn create_graphics_pipeline(&mut self, plan: &GraphicsPipelinePlan) -> VkResult<vk::Pipeline> {
        let device = self.device()?;

        let stages: Vec<_> = plan
            .stages
            .iter()
            .map(|s| vk::PipelineShaderStageCreateInfo {
                s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
                stage: s.stage,
                module: s.module,
                p_name: s.entry_point.as_ptr(),
                ..Default::default()
            })
            .collect();

        // Vertex input (none → hardcoded triangle in shader)
        let vertex_input = vk::PipelineVertexInputStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_VERTEX_INPUT_STATE_CREATE_INFO,
            ..Default::default()
        };
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO,
            topology: plan.topology,
            primitive_restart_enable: plan.primitive_restart.into(),
            ..Default::default()
        };
        let viewport_state = vk::PipelineViewportStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_VIEWPORT_STATE_CREATE_INFO,
            viewport_count: 1,
            p_viewports: &plan.viewport,
            scissor_count: 1,
            p_scissors: &plan.scissor,
            ..Default::default()
        };
        let raster = vk::PipelineRasterizationStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO,
            polygon_mode: plan.polygon_mode,
            cull_mode: plan.cull_mode,
            front_face: plan.front_face,
            line_width: plan.line_width,
            depth_bias_enable: plan.depth_bias.into(),
            ..Default::default()
        };
        let multisample = vk::PipelineMultisampleStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO,
            rasterization_samples: plan.samples,
            min_sample_shading: 1.0,
            ..Default::default()
        };
        let color_blend = vk::PipelineColorBlendStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_COLOR_BLEND_STATE_CREATE_INFO,
            attachment_count: 1,
            p_attachments: &plan.color_blend,
            ..Default::default()
        };

        let pipeline_info = vk::GraphicsPipelineCreateInfo {
            s_type: vk::StructureType::GRAPHICS_PIPELINE_CREATE_INFO,
            stage_count: stages.len() as u32,
            p_stages: stages.as_ptr(),
            p_vertex_input_state: &vertex_input,
            p_input_assembly_state: &input_assembly,
            p_viewport_state: &viewport_state,
            p_rasterization_state: &raster,
            p_multisample_state: &multisample,
            p_color_blend_state: &color_blend,
            layout: plan.layout,
            render_pass: plan.render_pass,
            subpass: plan.subpass,
            ..Default::default()
        };

        let pipelines = unsafe {
            device
                .create_graphics_pipelines(
                    vk::PipelineCache::null(),
                    std::slice::from_ref(&pipeline_info),
                    None,
                )
                .map_err(|(_, err)| err)?
        };
        pipelines
            .first()
            .copied()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn create_framebuffer(&mut self, plan: &FramebufferPlan) -> VkResult<vk::Framebuffer> {
        let fb_info = vk::FramebufferCreateInfo {
            s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
            render_pass: plan.render_pass,
            attachment_count: plan.attachments.len() as u32,
            p_attachments: plan.attachments.as_ptr(),
            width: plan.extent.width,
            height: plan.extent.height,
            layers: plan.layers,
            ..Default::default()
        };
        unsafe { self.device()?.create_framebuffer(&fb_info, None) }
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        unsafe { self.device()?.device_wait_idle() }
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        if let Ok(d) = self.device() {
            unsafe { d.destroy_framebuffer(framebuffer, None) }
        }
    }

    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline) {
        if let Ok(d) = self.device() {
            unsafe { d.destroy_pipeline(pipeline, None) }
        }
    }

    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout) {
        if let Ok(d) = self.device() {
            unsafe { d.destroy_pipeline_layout(layout, None) }
        }
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        if let Ok(d) = self.device() {
            unsafe { d.destroy_render_pass(render_pass, None) }
        }
    }

    fn destroy_shader_module(&mut self, module: vk::ShaderModule) {
        if let Ok(d) = self.device() {
            unsafe { d.destroy_shader_module(module, None) }
        }
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        if let Ok(d) = self.device() {
            unsafe { d.destroy_image_view(view, None) }
        }
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        if let Ok(loader) = self.swapchain_loader() {
            unsafe { loader.destroy_swapchain(swapchain, None) }
        }
    }

    fn destroy_device(&mut self, device: vk::Device) {
        self.swapchain_loader = None;
        if let Some(d) = self.device.take() {
            debug_assert_eq!(d.handle(), device);
            unsafe { d.destroy_device(None) }
        }
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        if let Some(loader) = &self.debug_loader {
            unsafe { loader.destroy_debug_utils_messenger(messenger, None) }
        }
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        if let Ok(loader) = self.surface_loader() {
            unsafe { loader.destroy_surface(surface, None) }
        }
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        self.surface_loader = None;
        self.debug_loader = None;
        if let Some(i) = self.instance.take() {
            debug_assert_eq!(i.handle(), instance);
            unsafe { i.destroy_instance(None) }
        }
    }
}
