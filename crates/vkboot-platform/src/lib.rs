// SPDX-License-Identifier: CEPL-1.0
pub use winit;

use vkboot_core::WindowConfig;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowAttributes};

/// Fixed-size window attributes; the surface extent is derived from this size.
pub fn window_attributes(cfg: &WindowConfig) -> WindowAttributes {
    Window::default_attributes()
        .with_title(cfg.title.clone())
        .with_inner_size(PhysicalSize::new(cfg.width, cfg.height))
        .with_resizable(cfg.resizable)
}
