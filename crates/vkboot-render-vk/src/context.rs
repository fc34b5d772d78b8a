// SPDX-License-Identifier: CEPL-1.0
//! The initialization chain as one owner.
//!
//! [`VkContext::new`] walks the chain front to back and parks every handle in
//! its slot the moment it exists. Teardown walks the slots back to front, so a
//! failure half way through releases exactly what was created before it.

use ash::vk;
use tracing::{debug, info, warn};
use vkboot_core::InitConfig;
use vkboot_render::{RenderSize, SurfaceTarget};

use crate::device::{
    create_logical_device, pick_physical_device, retrieve_queues, QueueFamilyIndices, Queues,
};
use crate::driver::Driver;
use crate::error::InitError;
use crate::instance::{create_instance, install_debug_callback};
use crate::pipeline::{create_framebuffers, create_graphics_pipeline, create_render_pass};
use crate::probe::query_swapchain_support;
use crate::swapchain::{create_image_views, create_swapchain, swapchain_images, SwapchainSettings};

pub struct VkContext<D: Driver> {
    driver: D,

    instance: Option<vk::Instance>,
    surface: Option<vk::SurfaceKHR>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,

    physical_device: Option<vk::PhysicalDevice>,
    queue_families: QueueFamilyIndices,
    device: Option<vk::Device>,
    queues: Option<Queues>,

    swapchain: Option<vk::SwapchainKHR>,
    swapchain_settings: Option<SwapchainSettings>,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,

    render_pass: Option<vk::RenderPass>,
    pipeline_layout: Option<vk::PipelineLayout>,
    pipeline: Option<vk::Pipeline>,
    framebuffers: Vec<vk::Framebuffer>,
}

impl<D: Driver> VkContext<D> {
    /// Runs the whole chain against `target`.
    ///
    /// `size` is the window's drawable size, used when the surface leaves the
    /// extent up to the application. The window behind `target` must outlive
    /// the returned context.
    pub fn new(
        driver: D,
        config: &InitConfig,
        target: &SurfaceTarget,
        size: RenderSize,
    ) -> Result<Self, InitError> {
        let mut ctx = VkContext {
            driver,
            instance: None,
            surface: None,
            debug_messenger: None,
            physical_device: None,
            queue_families: QueueFamilyIndices::default(),
            device: None,
            queues: None,
            swapchain: None,
            swapchain_settings: None,
            images: Vec::new(),
            image_views: Vec::new(),
            render_pass: None,
            pipeline_layout: None,
            pipeline: None,
            framebuffers: Vec::new(),
        };
        // On error `ctx` drops here and unwinds whatever was built.
        ctx.init(config, target, size)?;
        Ok(ctx)
    }

    fn init(
        &mut self,
        config: &InitConfig,
        target: &SurfaceTarget,
        size: RenderSize,
    ) -> Result<(), InitError> {
        let instance = create_instance(&mut self.driver, config, target)?;
        self.instance = Some(instance.handle);
        info!("instance created (validation: {})", config.enable_validation);

        let surface = self
            .driver
            .create_surface(target)
            .map_err(InitError::SurfaceCreationFailed)?;
        self.surface = Some(surface);

        if config.enable_validation {
            self.debug_messenger = Some(install_debug_callback(&mut self.driver, &instance)?);
            debug!("debug messenger installed");
        }

        let (physical, families) = pick_physical_device(&self.driver, surface)?;
        self.physical_device = Some(physical);
        self.queue_families = families;

        self.device = Some(create_logical_device(
            &mut self.driver,
            config,
            physical,
            &families,
        )?);
        self.queues = retrieve_queues(&self.driver, &families);

        let support = query_swapchain_support(&self.driver, physical, surface)?;
        let (swapchain, settings) = create_swapchain(
            &mut self.driver,
            surface,
            &support,
            &families,
            size,
            config.present_mode,
        )?;
        self.swapchain = Some(swapchain);
        self.swapchain_settings = Some(settings);
        self.images = swapchain_images(&self.driver, swapchain)?;
        debug!("swapchain holds {} images", self.images.len());

        create_image_views(
            &mut self.driver,
            &self.images,
            settings.format.format,
            &mut self.image_views,
        )?;

        let render_pass = create_render_pass(&mut self.driver, settings.format.format)?;
        self.render_pass = Some(render_pass);

        self.pipeline = Some(create_graphics_pipeline(
            &mut self.driver,
            &config.shaders,
            settings.extent,
            render_pass,
            &mut self.pipeline_layout,
        )?);

        create_framebuffers(
            &mut self.driver,
            render_pass,
            &self.image_views,
            settings.extent,
            &mut self.framebuffers,
        )?;

        info!(
            "vulkan ready: {} framebuffers at {}x{}",
            self.framebuffers.len(),
            settings.extent.width,
            settings.extent.height
        );
        Ok(())
    }

    /// Releases every live handle in reverse creation order. Safe to call
    /// more than once; also runs on drop.
    pub fn teardown(&mut self) {
        if self.device.is_some() {
            if let Err(e) = self.driver.device_wait_idle() {
                warn!("device_wait_idle failed during teardown: {e}");
            }
        }

        for fb in self.framebuffers.drain(..) {
            self.driver.destroy_framebuffer(fb);
        }
        if let Some(p) = self.pipeline.take() {
            self.driver.destroy_pipeline(p);
        }
        if let Some(l) = self.pipeline_layout.take() {
            self.driver.destroy_pipeline_layout(l);
        }
        if let Some(rp) = self.render_pass.take() {
            self.driver.destroy_render_pass(rp);
        }
        for view in self.image_views.drain(..) {
            self.driver.destroy_image_view(view);
        }
        // Images belong to the swapchain.
        self.images.clear();
        if let Some(sc) = self.swapchain.take() {
            self.driver.destroy_swapchain(sc);
        }
        self.swapchain_settings = None;
        self.queues = None;
        if let Some(device) = self.device.take() {
            self.driver.destroy_device(device);
        }
        self.physical_device = None;
        if let Some(m) = self.debug_messenger.take() {
            self.driver.destroy_debug_messenger(m);
        }
        if let Some(s) = self.surface.take() {
            self.driver.destroy_surface(s);
        }
        if let Some(instance) = self.instance.take() {
            self.driver.destroy_instance(instance);
            debug!("vulkan torn down");
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn instance(&self) -> Option<vk::Instance> {
        self.instance
    }

    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        self.surface
    }

    pub fn debug_messenger(&self) -> Option<vk::DebugUtilsMessengerEXT> {
        self.debug_messenger
    }

    pub fn physical_device(&self) -> Option<vk::PhysicalDevice> {
        self.physical_device
    }

    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    pub fn device(&self) -> Option<vk::Device> {
        self.device
    }

    pub fn queues(&self) -> Option<Queues> {
        self.queues
    }

    pub fn swapchain(&self) -> Option<vk::SwapchainKHR> {
        self.swapchain
    }

    pub fn swapchain_settings(&self) -> Option<SwapchainSettings> {
        self.swapchain_settings
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn render_pass(&self) -> Option<vk::RenderPass> {
        self.render_pass
    }

    pub fn pipeline_layout(&self) -> Option<vk::PipelineLayout> {
        self.pipeline_layout
    }

    pub fn pipeline(&self) -> Option<vk::Pipeline> {
        self.pipeline
    }

    pub fn framebuffers(&self) -> &[vk::Framebuffer] {
        &self.framebuffers
    }
}

impl<D: Driver> Drop for VkContext<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
