// SPDX-License-Identifier: CEPL-1.0
use raw_window_handle::{
    HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

/// Raw handles of the window a surface is bound to.
///
/// The window must outlive every surface created from these handles.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceTarget {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

impl SurfaceTarget {
    pub fn new(display: RawDisplayHandle, window: RawWindowHandle) -> Self {
        SurfaceTarget { display, window }
    }

    pub fn from_window<W>(window: &W) -> Result<Self, HandleError>
    where
        W: HasWindowHandle + HasDisplayHandle + ?Sized,
    {
        Ok(SurfaceTarget {
            display: window.display_handle()?.as_raw(),
            window: window.window_handle()?.as_raw(),
        })
    }
}
