// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tracing::{debug, error, info, warn, Level};
use vkboot_core::InitConfig;
use vkboot_render::SurfaceTarget;

use crate::driver::{DebugMessengerPlan, Driver, InstancePlan};
use crate::error::{query_failed, InitError};
use crate::probe::{check_validation_layer_support, missing_names};

pub const DEBUG_UTILS_EXTENSION: &str = "VK_EXT_debug_utils";
pub const ENGINE_NAME: &str = "No Engine";

/// A live instance plus what was learned while creating it.
#[derive(Clone, Copy, Debug)]
pub struct InstanceInfo {
    pub handle: vk::Instance,
    pub debug_utils_available: bool,
}

pub fn instance_plan(
    config: &InitConfig,
    surface_extensions: &[String],
    debug_utils_available: bool,
) -> InstancePlan {
    let mut extensions = surface_extensions.to_vec();
    if config.enable_validation && debug_utils_available {
        extensions.push(DEBUG_UTILS_EXTENSION.to_owned());
    }

    InstancePlan {
        app_name: config.app_name.clone(),
        engine_name: ENGINE_NAME.to_owned(),
        app_version: vk::make_api_version(0, 1, 0, 0),
        engine_version: vk::make_api_version(0, 1, 0, 0),
        api_version: vk::API_VERSION_1_0,
        extensions,
        layers: if config.enable_validation {
            config.validation_layers.clone()
        } else {
            Vec::new()
        },
    }
}

pub fn create_instance<D: Driver>(
    driver: &mut D,
    config: &InitConfig,
    target: &SurfaceTarget,
) -> Result<InstanceInfo, InitError> {
    if config.enable_validation {
        check_validation_layer_support(driver, &config.validation_layers)?;
    }

    let surface_extensions = driver
        .surface_extensions(target)
        .map_err(InitError::SurfaceCreationFailed)?;
    let available = driver
        .instance_extensions()
        .map_err(query_failed("vkEnumerateInstanceExtensionProperties"))?;

    let unreported = missing_names(&surface_extensions, &available);
    if !unreported.is_empty() {
        warn!("window system extensions not reported by the driver: {unreported:?}");
    }

    let debug_utils_available = available.iter().any(|e| e == DEBUG_UTILS_EXTENSION);
    let plan = instance_plan(config, &surface_extensions, debug_utils_available);
    debug!(extensions = ?plan.extensions, layers = ?plan.layers, "creating instance");

    let handle = driver
        .create_instance(&plan)
        .map_err(InitError::InstanceCreationFailed)?;
    Ok(InstanceInfo {
        handle,
        debug_utils_available,
    })
}

pub fn debug_messenger_plan() -> DebugMessengerPlan {
    DebugMessengerPlan {
        severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_types: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
    }
}

pub fn install_debug_callback<D: Driver>(
    driver: &mut D,
    instance: &InstanceInfo,
) -> Result<vk::DebugUtilsMessengerEXT, InitError> {
    if !instance.debug_utils_available {
        return Err(InitError::DebugCallbackUnavailable);
    }
    driver
        .create_debug_messenger(&debug_messenger_plan())
        .map_err(InitError::DebugMessengerCreationFailed)
}

pub fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Level::ERROR
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Level::WARN
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        Level::INFO
    } else {
        Level::DEBUG
    }
}

/// Sink for driver diagnostics. Only logs.
pub(crate) fn log_validation_message(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    message: &str,
) {
    let level = severity_level(severity);
    if level == Level::ERROR {
        error!(?types, "validation layer: {message}");
    } else if level == Level::WARN {
        warn!(?types, "validation layer: {message}");
    } else if level == Level::INFO {
        info!(?types, "validation layer: {message}");
    } else {
        debug!(?types, "validation layer: {message}");
    }
}
