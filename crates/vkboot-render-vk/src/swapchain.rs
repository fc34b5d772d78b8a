// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tracing::info;
use vkboot_core::PresentModePolicy;
use vkboot_render::RenderSize;

use crate::device::QueueFamilyIndices;
use crate::driver::{Driver, ImageViewPlan, SwapchainPlan};
use crate::error::InitError;
use crate::probe::SwapchainSupport;

pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Negotiated swapchain parameters.
#[derive(Clone, Copy, Debug)]
pub struct SwapchainSettings {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
}

pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    if let [only] = formats {
        if only.format == vk::Format::UNDEFINED {
            return PREFERRED_FORMAT;
        }
    }
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == PREFERRED_FORMAT.format && f.color_space == PREFERRED_FORMAT.color_space
        })
        .or_else(|| formats.first().copied())
        .unwrap_or(PREFERRED_FORMAT)
}

pub fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    policy: PresentModePolicy,
) -> vk::PresentModeKHR {
    match policy {
        PresentModePolicy::Fifo => vk::PresentModeKHR::FIFO,
        PresentModePolicy::LowLatency => [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
            .into_iter()
            .find(|m| modes.contains(m))
            .unwrap_or(vk::PresentModeKHR::FIFO),
    }
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, want: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: want
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: want
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// One more than the minimum, capped by a nonzero maximum.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count + 1;
    if caps.max_image_count == 0 {
        wanted
    } else {
        wanted.min(caps.max_image_count)
    }
}

pub fn choose_settings(
    support: &SwapchainSupport,
    want: RenderSize,
    policy: PresentModePolicy,
) -> SwapchainSettings {
    SwapchainSettings {
        format: choose_surface_format(&support.formats),
        present_mode: choose_present_mode(&support.present_modes, policy),
        extent: choose_extent(&support.capabilities, want),
        image_count: choose_image_count(&support.capabilities),
    }
}

pub fn swapchain_plan(
    surface: vk::SurfaceKHR,
    support: &SwapchainSupport,
    settings: &SwapchainSettings,
    indices: &QueueFamilyIndices,
) -> SwapchainPlan {
    let (sharing_mode, queue_family_indices) = if indices.is_split() {
        (vk::SharingMode::CONCURRENT, indices.unique())
    } else {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    };

    SwapchainPlan {
        surface,
        min_image_count: settings.image_count,
        format: settings.format,
        extent: settings.extent,
        image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        sharing_mode,
        queue_family_indices,
        pre_transform: support.capabilities.current_transform,
        composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        present_mode: settings.present_mode,
        clipped: true,
    }
}

pub fn create_swapchain<D: Driver>(
    driver: &mut D,
    surface: vk::SurfaceKHR,
    support: &SwapchainSupport,
    indices: &QueueFamilyIndices,
    want: RenderSize,
    policy: PresentModePolicy,
) -> Result<(vk::SwapchainKHR, SwapchainSettings), InitError> {
    let settings = choose_settings(support, want, policy);
    let plan = swapchain_plan(surface, support, &settings, indices);
    let swapchain = driver
        .create_swapchain(&plan)
        .map_err(InitError::SwapchainCreationFailed)?;
    info!(
        "swapchain ready ({}x{}, fmt {:?}, {:?}, {} images requested)",
        settings.extent.width,
        settings.extent.height,
        settings.format.format,
        settings.present_mode,
        settings.image_count
    );
    Ok((swapchain, settings))
}

pub fn swapchain_images<D: Driver>(
    driver: &D,
    swapchain: vk::SwapchainKHR,
) -> Result<Vec<vk::Image>, InitError> {
    driver
        .swapchain_images(swapchain)
        .map_err(InitError::SwapchainCreationFailed)
}

pub fn image_view_plan(image: vk::Image, format: vk::Format) -> ImageViewPlan {
    ImageViewPlan {
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        components: vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        },
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        },
    }
}

/// Pushes each view into `views` as soon as it exists, so a failure part way
/// leaves the earlier views with the caller for teardown.
pub fn create_image_views<D: Driver>(
    driver: &mut D,
    images: &[vk::Image],
    format: vk::Format,
    views: &mut Vec<vk::ImageView>,
) -> Result<(), InitError> {
    for &image in images {
        let view = driver
            .create_image_view(&image_view_plan(image, format))
            .map_err(InitError::ImageViewCreationFailed)?;
        views.push(view);
    }
    Ok(())
}
