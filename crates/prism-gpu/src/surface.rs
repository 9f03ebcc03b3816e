//! Surface binding for windowed rendering.
//!
//! Hides the raw-window-handle plumbing from the rest of the bootstrap.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use tracing::info;

use crate::backend::GpuBackend;
use crate::error::{GpuError, Result};

/// Native handles of the window a surface is bound to.
///
/// The window must outlive every surface created from this target.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceTarget {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

impl SurfaceTarget {
    /// Capture the raw handles of a window.
    pub fn from_window<W>(window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        Ok(Self {
            display: display.as_raw(),
            window: window_handle.as_raw(),
        })
    }
}

/// Bind `target` to a presentable surface.
pub fn create_surface<B: GpuBackend + ?Sized>(
    backend: &mut B,
    target: &SurfaceTarget,
) -> Result<vk::SurfaceKHR> {
    let surface = backend
        .create_surface(target)
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;
    info!("Surface created for {:?}", target.window);
    Ok(surface)
}
