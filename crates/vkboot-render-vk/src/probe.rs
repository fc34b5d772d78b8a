// SPDX-License-Identifier: CEPL-1.0
//! Read-only capability queries layered on top of [`Driver`].

use ash::vk;

use crate::driver::Driver;
use crate::error::{query_failed, InitError};

/// Device extensions every candidate must support.
pub const REQUIRED_DEVICE_EXTENSIONS: &[&str] = &["VK_KHR_swapchain"];

/// Names in `required` that `available` does not contain, in `required` order.
pub fn missing_names<R, A>(required: &[R], available: &[A]) -> Vec<String>
where
    R: AsRef<str>,
    A: AsRef<str>,
{
    required
        .iter()
        .map(AsRef::as_ref)
        .filter(|r| !available.iter().any(|a| a.as_ref() == *r))
        .map(str::to_owned)
        .collect()
}

pub fn check_validation_layer_support<D: Driver>(
    driver: &D,
    layers: &[String],
) -> Result<(), InitError> {
    let available = driver
        .instance_layers()
        .map_err(query_failed("vkEnumerateInstanceLayerProperties"))?;
    let missing = missing_names(layers, &available);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InitError::ValidationLayersUnavailable { missing })
    }
}

pub fn check_device_extension_support<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
) -> Result<bool, InitError> {
    let available = driver
        .device_extensions(device)
        .map_err(query_failed("vkEnumerateDeviceExtensionProperties"))?;
    Ok(missing_names(REQUIRED_DEVICE_EXTENSIONS, &available).is_empty())
}

/// What a surface offers on one physical device.
#[derive(Clone, Debug)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// At least one format and one present mode.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

pub fn query_swapchain_support<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<SwapchainSupport, InitError> {
    Ok(SwapchainSupport {
        capabilities: driver
            .surface_capabilities(device, surface)
            .map_err(query_failed("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?,
        formats: driver
            .surface_formats(device, surface)
            .map_err(query_failed("vkGetPhysicalDeviceSurfaceFormatsKHR"))?,
        present_modes: driver
            .surface_present_modes(device, surface)
            .map_err(query_failed("vkGetPhysicalDeviceSurfacePresentModesKHR"))?,
    })
}
