//! Vulkan instance creation.

use ash::vk;
use tracing::{debug, info, warn};

use crate::backend::{GpuBackend, InstanceDesc};
use crate::config::{
    debug_utils_extension_name, portability_enumeration_extension_name, ContextConfig,
};
use crate::error::{GpuError, Result};

/// Resolve the final extension and layer lists for instance creation.
///
/// With diagnostics on, every validation layer must be installed and the
/// debug-utils extension is appended to the window system's extensions.
pub fn instance_desc<B: GpuBackend + ?Sized>(
    backend: &B,
    config: &ContextConfig,
) -> Result<InstanceDesc> {
    let available_extensions = backend.instance_extensions()?;
    debug!(
        "Available instance extensions ({}): {:?}",
        available_extensions.len(),
        available_extensions
    );

    let mut extensions = config.instance_extensions.clone();
    for ext in &extensions {
        if !available_extensions.contains(ext) {
            warn!("Instance extension {ext} is not advertised by the runtime");
        }
    }

    let layers = if config.diagnostics {
        let available_layers = backend.instance_layers()?;
        debug!("Available instance layers: {:?}", available_layers);
        if let Some(missing) = config
            .validation_layers
            .iter()
            .find(|layer| !available_layers.contains(layer))
        {
            return Err(GpuError::LayerUnavailable(missing.clone()));
        }
        push_unique(&mut extensions, debug_utils_extension_name());
        config.validation_layers.clone()
    } else {
        Vec::new()
    };

    // Required for MoltenVK
    let portability_ext = portability_enumeration_extension_name();
    let portability = available_extensions.contains(&portability_ext);
    if portability {
        push_unique(&mut extensions, portability_ext);
    }

    Ok(InstanceDesc {
        app_name: config.app_name.clone(),
        app_version: config.app_version,
        engine_name: config.engine_name.clone(),
        engine_version: config.engine_version,
        api_version: config.api_version,
        extensions,
        layers,
        portability,
    })
}

/// Create the instance.
pub fn create_instance<B: GpuBackend + ?Sized>(
    backend: &mut B,
    config: &ContextConfig,
) -> Result<vk::Instance> {
    let desc = instance_desc(backend, config)?;

    let instance = backend.create_instance(&desc).map_err(|e| {
        GpuError::Initialization(format!(
            "vkCreateInstance rejected API {}.{} with extensions {:?}: {e}",
            vk::api_version_major(desc.api_version),
            vk::api_version_minor(desc.api_version),
            desc.extensions
        ))
    })?;

    info!(
        "Instance created ({} extensions, {} layers)",
        desc.extensions.len(),
        desc.layers.len()
    );

    Ok(instance)
}

fn push_unique(list: &mut Vec<String>, name: String) {
    if !list.contains(&name) {
        list.push(name);
    }
}
