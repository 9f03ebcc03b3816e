//! Event loop wiring: window, context bootstrap, resize and teardown.

use std::path::PathBuf;

use anyhow::{bail, Context as _};
use ash::vk;
use prism_gpu::{AshBackend, GraphicsContext, GraphicsContextBuilder, ShaderSet, SurfaceTarget};
use prism_platform::{
    create_window, required_instance_extensions, window_size, PlatformConfig, PlatformError,
    WindowSignal,
};
use prism_shaders::load_spirv;
use tracing::info;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

const TITLE: &str = "Prism Triangle";

/// Where `glslc` output is expected, relative to the workspace root.
pub const DEFAULT_VERTEX_SHADER: &str = "crates/prism-shaders/shaders/triangle.vert.spv";
pub const DEFAULT_FRAGMENT_SHADER: &str = "crates/prism-shaders/shaders/triangle.frag.spv";

/// Command line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub vert: PathBuf,
    pub frag: PathBuf,
    pub width: u32,
    pub height: u32,
    pub validation: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            vert: PathBuf::from(DEFAULT_VERTEX_SHADER),
            frag: PathBuf::from(DEFAULT_FRAGMENT_SHADER),
            width: 800,
            height: 600,
            validation: cfg!(debug_assertions),
        }
    }
}

impl Options {
    /// Parse options, excluding the program name.
    pub fn from_args<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--vert" => options.vert = PathBuf::from(value(&mut args, &arg)?),
                "--frag" => options.frag = PathBuf::from(value(&mut args, &arg)?),
                "--width" => options.width = dimension(&mut args, &arg)?,
                "--height" => options.height = dimension(&mut args, &arg)?,
                "--validation" => options.validation = true,
                "--no-validation" => options.validation = false,
                other => bail!("Unknown option: {other} (see --help)"),
            }
        }

        Ok(options)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next()
        .with_context(|| format!("{flag} expects a value"))
}

fn dimension(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<u32> {
    let raw = value(args, flag)?;
    let parsed: u32 = raw
        .parse()
        .with_context(|| format!("{flag} expects a positive integer, got {raw}"))?;
    if parsed == 0 {
        bail!("{flag} must be greater than zero");
    }
    Ok(parsed)
}

/// Run the event loop until the window is closed.
///
/// Returns the first fatal error hit while bootstrapping or resizing.
pub fn run(options: Options) -> anyhow::Result<()> {
    info!("{TITLE} starting...");

    let event_loop = EventLoop::new().map_err(|e| PlatformError::EventLoop(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = TriangleApp {
        options,
        state: None,
        error: None,
    };

    event_loop
        .run_app(&mut app)
        .map_err(|e| PlatformError::EventLoop(e.to_string()))?;

    app.error.map_or(Ok(()), Err)
}

struct TriangleApp {
    options: Options,
    state: Option<AppState>,
    error: Option<anyhow::Error>,
}

/// Live window and context.
///
/// Field order matters: the context (and its surface) is dropped before the
/// window it was created for.
struct AppState {
    context: GraphicsContext<AshBackend>,
    window: Window,
}

impl TriangleApp {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window = create_window(
            event_loop,
            &PlatformConfig {
                title: TITLE.to_string(),
                width: self.options.width,
                height: self.options.height,
                resizable: true,
            },
        )?;

        let shaders = ShaderSet {
            vertex: load_spirv(&self.options.vert)?,
            fragment: load_spirv(&self.options.frag)?,
        };

        let target = SurfaceTarget::from_window(&window)?;
        let (width, height) = window_size(&window);

        let context = GraphicsContextBuilder::new()
            .app_name(TITLE)
            .validation(self.options.validation)
            .instance_extensions(required_instance_extensions(&window)?)
            .shaders(shaders)
            .build(AshBackend::load()?, &target, vk::Extent2D { width, height })?;

        Ok(AppState { context, window })
    }

    /// Reported once, by `main`, after the loop exits.
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.state = None;
        self.error.get_or_insert(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for TriangleApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                info!("Ready, window {:?}", state.window.id());
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e.context("Failed to initialize")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match WindowSignal::classify(&event) {
            Some(WindowSignal::Quit) => {
                info!("Quit requested");
                self.state = None;
                event_loop.exit();
            }
            Some(WindowSignal::Resized(width, height)) => {
                let Some(state) = &mut self.state else {
                    return;
                };
                if let Err(e) = state
                    .context
                    .recreate_swapchain(vk::Extent2D { width, height })
                {
                    self.fail(event_loop, anyhow::Error::new(e).context("Resize failed"));
                }
            }
            None => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.state = None;
    }
}

/// Single-line description of a fatal error, context chain included.
pub fn diagnostic(err: &anyhow::Error) -> String {
    format!("Error: {err:#}").replace('\n', " ")
}
