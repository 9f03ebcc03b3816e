//! Compiled shader loading for Prism.
//!
//! Shaders are compiled ahead of time (see `shaders/` for the GLSL sources)
//! and read from disk at startup as opaque SPIR-V files.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("Failed to read shader {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Shader file is empty: {0}")]
    Empty(PathBuf),
    #[error("Invalid SPIR-V: {0}")]
    InvalidSpirv(String),
}

pub type Result<T> = std::result::Result<T, ShaderError>;

/// Read a compiled shader as raw bytes.
///
/// Fails if the file cannot be read or has no content.
pub fn load_compiled_shader(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ShaderError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.is_empty() {
        return Err(ShaderError::Empty(path.to_path_buf()));
    }

    debug!("Loaded shader {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

/// Convert SPIR-V bytes to the aligned words Vulkan expects.
///
/// Checks the size is a multiple of four and that the magic number is
/// present, fixing up byte order if needed.
pub fn bytes_to_spirv(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() {
        return Err(ShaderError::InvalidSpirv("no words".to_string()));
    }
    ash::util::read_spv(&mut Cursor::new(bytes))
        .map_err(|e| ShaderError::InvalidSpirv(e.to_string()))
}

/// Load a compiled shader and decode it to SPIR-V words.
pub fn load_spirv(path: impl AsRef<Path>) -> Result<Vec<u32>> {
    bytes_to_spirv(&load_compiled_shader(path)?)
}
