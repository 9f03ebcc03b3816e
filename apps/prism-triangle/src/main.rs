//! Prism Triangle
//!
//! Opens a window, bootstraps a complete Vulkan rendering context for it
//! (instance, surface, device, swapchain, render pass, pipeline and
//! framebuffers) and keeps it alive until the window is closed. The swapchain
//! is rebuilt whenever the window is resized.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p prism-triangle -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--vert <PATH>`: Compiled vertex shader
//!   (default: crates/prism-shaders/shaders/triangle.vert.spv)
//! - `--frag <PATH>`: Compiled fragment shader
//!   (default: crates/prism-shaders/shaders/triangle.frag.spv)
//! - `--width <N>`: Initial window width (default: 800)
//! - `--height <N>`: Initial window height (default: 600)
//! - `--validation` / `--no-validation`: Force validation layers on or off
//!   (default: on in debug builds)
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)
//!
//! ## Shaders
//!
//! Compile the GLSL sources once from the workspace root:
//!
//! ```bash
//! glslc crates/prism-shaders/shaders/triangle.vert -o crates/prism-shaders/shaders/triangle.vert.spv
//! glslc crates/prism-shaders/shaders/triangle.frag -o crates/prism-shaders/shaders/triangle.frag.spv
//! ```

mod app;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::app::Options;

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", app::diagnostic(&err));
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Check for help flag before touching the window system
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    let options = Options::from_args(args)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    app::run(options)
}

fn print_help() {
    eprintln!(
        "Prism Triangle - Vulkan rendering-context bootstrap

USAGE:
    cargo run -p prism-triangle -- [OPTIONS]

OPTIONS:
    --vert <PATH>       Compiled vertex shader
                        Default: crates/prism-shaders/shaders/triangle.vert.spv
    --frag <PATH>       Compiled fragment shader
                        Default: crates/prism-shaders/shaders/triangle.frag.spv
    --width <N>         Initial window width (default: 800)
    --height <N>        Initial window height (default: 600)
    --validation        Enable validation layers and the debug messenger
    --no-validation     Disable validation layers
    -h, --help          Print this help message

CONTROLS:
    Escape              Quit
    Close window        Quit

ENVIRONMENT:
    RUST_LOG            Log filter (e.g. info, debug, prism_gpu=trace)

SHADERS:
    Compile once from the workspace root with glslc from the Vulkan SDK:
    glslc crates/prism-shaders/shaders/triangle.vert -o crates/prism-shaders/shaders/triangle.vert.spv
    glslc crates/prism-shaders/shaders/triangle.frag -o crates/prism-shaders/shaders/triangle.frag.spv"
    );
}
