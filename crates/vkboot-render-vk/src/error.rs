// SPDX-License-Identifier: CEPL-1.0
use std::io;
use std::path::PathBuf;

use ash::vk;
use thiserror::Error;
use vkboot_core::FileError;

/// Every way the initialization chain can fail. All of them are fatal.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to load the Vulkan loader: {0}")]
    LoaderUnavailable(#[from] ash::LoadingError),
    #[error("validation layers requested, but not available: {}", missing.join(", "))]
    ValidationLayersUnavailable { missing: Vec<String> },
    #[error("failed to create instance: {0}")]
    InstanceCreationFailed(vk::Result),
    #[error("VK_EXT_debug_utils is not available, cannot install the debug callback")]
    DebugCallbackUnavailable,
    #[error("failed to create debug messenger: {0}")]
    DebugMessengerCreationFailed(vk::Result),
    #[error("failed to create window surface: {0}")]
    SurfaceCreationFailed(vk::Result),
    #[error("capability query `{query}` failed: {result}")]
    CapabilityQueryFailed {
        query: &'static str,
        result: vk::Result,
    },
    #[error("failed to find physical devices")]
    NoPhysicalDevicesFound,
    #[error("could not find a suitable physical device")]
    NoSuitablePhysicalDevice,
    #[error("failed to create logical device: {0}")]
    LogicalDeviceCreationFailed(vk::Result),
    #[error("failed to create swapchain: {0}")]
    SwapchainCreationFailed(vk::Result),
    #[error("failed to create image view: {0}")]
    ImageViewCreationFailed(vk::Result),
    #[error("failed to load shader: {0}")]
    ShaderFile(#[from] FileError),
    #[error("{} is not valid SPIR-V: {source}", path.display())]
    InvalidShaderCode {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create shader module: {0}")]
    ShaderModuleCreationFailed(vk::Result),
    #[error("failed to create render pass: {0}")]
    RenderPassCreationFailed(vk::Result),
    #[error("failed to create pipeline layout: {0}")]
    PipelineLayoutCreationFailed(vk::Result),
    #[error("failed to create graphics pipeline: {0}")]
    PipelineCreationFailed(vk::Result),
    #[error("failed to create framebuffer: {0}")]
    FramebufferCreationFailed(vk::Result),
}

pub(crate) fn query_failed(query: &'static str) -> impl FnOnce(vk::Result) -> InitError {
    move |result| InitError::CapabilityQueryFailed { query, result }
}
