// SPDX-License-Identifier: CEPL-1.0
use std::collections::BTreeSet;

use ash::vk;
use tracing::{debug, info};
use vkboot_core::InitConfig;

use crate::driver::{DevicePlan, Driver, QueuePlan};
use crate::error::{query_failed, InitError};
use crate::probe::{
    check_device_extension_support, query_swapchain_support, REQUIRED_DEVICE_EXTENSIONS,
};

/// Queue family roles, each unresolved until a family is found for it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Resolved indices, de-duplicated, ascending.
    pub fn unique(&self) -> Vec<u32> {
        self.graphics
            .into_iter()
            .chain(self.present)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Both roles land on different families.
    pub fn is_split(&self) -> bool {
        self.unique().len() > 1
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Queues {
    pub graphics: vk::Queue,
    pub present: vk::Queue,
}

pub fn find_queue_families<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<QueueFamilyIndices, InitError> {
    let mut indices = QueueFamilyIndices::default();

    for (i, family) in driver.queue_families(device).iter().enumerate() {
        let i = i as u32;
        if indices.graphics.is_none()
            && family.queue_count > 0
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics = Some(i);
        }
        if indices.present.is_none()
            && family.queue_count > 0
            && driver
                .surface_support(device, i, surface)
                .map_err(query_failed("vkGetPhysicalDeviceSurfaceSupportKHR"))?
        {
            indices.present = Some(i);
        }
        if indices.is_complete() {
            break;
        }
    }

    Ok(indices)
}

/// Extension support is checked first; without it neither the queue families
/// nor the surface are queried.
pub fn is_device_suitable<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<bool, InitError> {
    if !check_device_extension_support(driver, device)? {
        return Ok(false);
    }
    if !find_queue_families(driver, device, surface)?.is_complete() {
        return Ok(false);
    }
    Ok(query_swapchain_support(driver, device, surface)?.is_adequate())
}

/// First suitable device in enumeration order.
pub fn pick_physical_device<D: Driver>(
    driver: &D,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, QueueFamilyIndices), InitError> {
    let devices = driver
        .physical_devices()
        .map_err(query_failed("vkEnumeratePhysicalDevices"))?;
    if devices.is_empty() {
        return Err(InitError::NoPhysicalDevicesFound);
    }

    for device in devices {
        if is_device_suitable(driver, device, surface)? {
            let indices = find_queue_families(driver, device, surface)?;
            info!(
                "using physical device '{}' (graphics family {:?}, present family {:?})",
                driver.device_name(device),
                indices.graphics,
                indices.present
            );
            return Ok((device, indices));
        }
        debug!("rejected physical device '{}'", driver.device_name(device));
    }

    Err(InitError::NoSuitablePhysicalDevice)
}

pub fn device_plan(config: &InitConfig, indices: &QueueFamilyIndices) -> DevicePlan {
    DevicePlan {
        queues: indices
            .unique()
            .into_iter()
            .map(|family| QueuePlan {
                family,
                priorities: vec![1.0],
            })
            .collect(),
        extensions: REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|e| (*e).to_owned())
            .collect(),
        layers: if config.enable_validation {
            config.validation_layers.clone()
        } else {
            Vec::new()
        },
    }
}

pub fn create_logical_device<D: Driver>(
    driver: &mut D,
    config: &InitConfig,
    physical: vk::PhysicalDevice,
    indices: &QueueFamilyIndices,
) -> Result<vk::Device, InitError> {
    driver
        .create_device(physical, &device_plan(config, indices))
        .map_err(InitError::LogicalDeviceCreationFailed)
}

/// Queue 0 of each role's family. Only valid once the device exists.
pub fn retrieve_queues<D: Driver>(driver: &D, indices: &QueueFamilyIndices) -> Option<Queues> {
    Some(Queues {
        graphics: driver.device_queue(indices.graphics?, 0),
        present: driver.device_queue(indices.present?, 0),
    })
}
