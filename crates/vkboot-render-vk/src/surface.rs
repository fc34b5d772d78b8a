// SPDX-License-Identifier: CEPL-1.0
//! Binding an instance to a native window.
//!
//! Exactly one binder is used per build, picked through [`PlatformSurfaceBinder`].

use std::ffi::CStr;

use ash::prelude::VkResult;
use ash::{khr, vk, Entry, Instance};
use raw_window_handle::RawDisplayHandle;
use vkboot_render::SurfaceTarget;

pub trait SurfaceBinder {
    /// Instance extensions needed before [`SurfaceBinder::bind_surface`] can succeed.
    fn required_extensions(&self, display: RawDisplayHandle) -> VkResult<Vec<&'static CStr>>;

    /// # Safety
    /// `instance` must have been created with [`SurfaceBinder::required_extensions`]
    /// enabled, and the window behind `target` must outlive the returned surface.
    unsafe fn bind_surface(
        &self,
        entry: &Entry,
        instance: &Instance,
        target: &SurfaceTarget,
    ) -> VkResult<vk::SurfaceKHR>;
}

/// Lets the windowing library pick the WSI path (`ash-window`).
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowSystemSurfaceBinder;

impl SurfaceBinder for WindowSystemSurfaceBinder {
    fn required_extensions(&self, display: RawDisplayHandle) -> VkResult<Vec<&'static CStr>> {
        let names = ash_window::enumerate_required_extensions(display)?;
        // SAFETY: ash-window hands out pointers to 'static extension name constants.
        Ok(names
            .iter()
            .map(|&p| unsafe { CStr::from_ptr(p) })
            .collect())
    }

    unsafe fn bind_surface(
        &self,
        entry: &Entry,
        instance: &Instance,
        target: &SurfaceTarget,
    ) -> VkResult<vk::SurfaceKHR> {
        unsafe { ash_window::create_surface(entry, instance, target.display, target.window, None) }
    }
}

/// `VK_KHR_win32_surface` from the HWND/HINSTANCE pair.
#[cfg(windows)]
#[derive(Clone, Copy, Debug, Default)]
pub struct Win32SurfaceBinder;

#[cfg(windows)]
impl SurfaceBinder for Win32SurfaceBinder {
    fn required_extensions(&self, display: RawDisplayHandle) -> VkResult<Vec<&'static CStr>> {
        match display {
            RawDisplayHandle::Windows(_) => Ok(vec![khr::surface::NAME, khr::win32_surface::NAME]),
            _ => Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT),
        }
    }

    unsafe fn bind_surface(
        &self,
        entry: &Entry,
        instance: &Instance,
        target: &SurfaceTarget,
    ) -> VkResult<vk::SurfaceKHR> {
        use raw_window_handle::RawWindowHandle;

        let RawWindowHandle::Win32(window) = target.window else {
            return Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT);
        };
        let hinstance = window
            .hinstance
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        let info = vk::Win32SurfaceCreateInfoKHR::default()
            .hinstance(hinstance.get())
            .hwnd(window.hwnd.get());
        let loader = khr::win32_surface::Instance::new(entry, instance);
        unsafe { loader.create_win32_surface(&info, None) }
    }
}

/// `VK_KHR_xlib_surface` or `VK_KHR_xcb_surface`, whichever the window came from.
#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
#[derive(Clone, Copy, Debug, Default)]
pub struct X11SurfaceBinder;

#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
impl SurfaceBinder for X11SurfaceBinder {
    fn required_extensions(&self, display: RawDisplayHandle) -> VkResult<Vec<&'static CStr>> {
        match display {
            RawDisplayHandle::Xlib(_) => Ok(vec![khr::surface::NAME, khr::xlib_surface::NAME]),
            RawDisplayHandle::Xcb(_) => Ok(vec![khr::surface::NAME, khr::xcb_surface::NAME]),
            _ => Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT),
        }
    }

    unsafe fn bind_surface(
        &self,
        entry: &Entry,
        instance: &Instance,
        target: &SurfaceTarget,
    ) -> VkResult<vk::SurfaceKHR> {
        use raw_window_handle::RawWindowHandle;

        match (target.display, target.window) {
            (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(window)) => {
                let dpy = display
                    .display
                    .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
                let info = vk::XlibSurfaceCreateInfoKHR::default()
                    .dpy(dpy.as_ptr().cast())
                    .window(window.window);
                let loader = khr::xlib_surface::Instance::new(entry, instance);
                unsafe { loader.create_xlib_surface(&info, None) }
            }
            (RawDisplayHandle::Xcb(display), RawWindowHandle::Xcb(window)) => {
                let connection = display
                    .connection
                    .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
                let info = vk::XcbSurfaceCreateInfoKHR::default()
                    .connection(connection.as_ptr().cast())
                    .window(window.window.get());
                let loader = khr::xcb_surface::Instance::new(entry, instance);
                unsafe { loader.create_xcb_surface(&info, None) }
            }
            _ => Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT),
        }
    }
}

#[cfg(all(feature = "native-surface", windows))]
pub type PlatformSurfaceBinder = Win32SurfaceBinder;

#[cfg(all(
    feature = "native-surface",
    unix,
    not(any(target_os = "macos", target_os = "ios", target_os = "android"))
))]
pub type PlatformSurfaceBinder = X11SurfaceBinder;

#[cfg(not(all(
    feature = "native-surface",
    any(
        windows,
        all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android")))
    )
)))]
pub type PlatformSurfaceBinder = WindowSystemSurfaceBinder;
