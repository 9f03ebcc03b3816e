//! Platform abstraction for Prism.
//!
//! Provides window creation, the instance extensions a window surface needs,
//! and a reduced view of window events via winit.

use std::ffi::CStr;

use raw_window_handle::{HasDisplayHandle, RawDisplayHandle};
use thiserror::Error;
use tracing::{debug, info};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::Window;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
    #[error("Window handle unavailable: {0}")]
    HandleUnavailable(String),
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Prism".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

/// Create a window from `config`.
pub fn create_window(event_loop: &ActiveEventLoop, config: &PlatformConfig) -> Result<Window> {
    let attributes = Window::default_attributes()
        .with_title(&config.title)
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .with_resizable(config.resizable);

    let window = event_loop
        .create_window(attributes)
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;

    info!(
        "Window created: {} ({}x{})",
        config.title, config.width, config.height
    );
    Ok(window)
}

/// Current drawable size of the window in pixels.
pub fn window_size(window: &Window) -> (u32, u32) {
    let size = window.inner_size();
    (size.width, size.height)
}

/// Instance extensions needed to present to `window`.
pub fn required_instance_extensions<W: HasDisplayHandle>(window: &W) -> Result<Vec<String>> {
    let display = window
        .display_handle()
        .map_err(|e| PlatformError::HandleUnavailable(e.to_string()))?;
    surface_extensions(display.as_raw())
}

fn surface_extensions(display: RawDisplayHandle) -> Result<Vec<String>> {
    let names = ash_window::enumerate_required_extensions(display)
        .map_err(|e| PlatformError::UnsupportedPlatform(e.to_string()))?;

    let extensions: Vec<String> = names
        .iter()
        // SAFETY: ash-window hands out pointers to static NUL-terminated names.
        .map(|&name| unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
        .collect();

    debug!("Surface extensions: {extensions:?}");
    Ok(extensions)
}

/// What the bootstrap cares about in a window event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSignal {
    /// Close requested or Escape pressed.
    Quit,
    /// New drawable size in pixels.
    Resized(u32, u32),
}

impl WindowSignal {
    /// Reduce a window event to a signal, if it is one.
    pub fn classify(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::CloseRequested => Some(Self::Quit),
            WindowEvent::KeyboardInput { event, .. } => {
                is_escape(event.state, &event.logical_key).then_some(Self::Quit)
            }
            WindowEvent::Resized(size) => Some(Self::Resized(size.width, size.height)),
            _ => None,
        }
    }
}

fn is_escape(state: ElementState, key: &Key) -> bool {
    state == ElementState::Pressed && *key == Key::Named(NamedKey::Escape)
}
