// SPDX-License-Identifier: CEPL-1.0
//! Vulkan bring-up for a single window: instance, validation, surface, device,
//! swapchain, render pass, pipeline and framebuffers, torn down in reverse.
#![deny(unsafe_op_in_unsafe_fn)]

pub mod context;
pub mod device;
pub mod driver;
pub mod error;
pub mod instance;
pub mod pipeline;
pub mod probe;
pub mod surface;
pub mod swapchain;

pub use context::VkContext;
pub use device::{QueueFamilyIndices, Queues};
pub use driver::{AshDriver, Driver};
pub use error::InitError;
pub use surface::{PlatformSurfaceBinder, SurfaceBinder};
pub use swapchain::SwapchainSettings;
