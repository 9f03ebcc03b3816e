//! Physical device selection and logical device creation.

use ash::vk;
use tracing::{debug, info, warn};

use crate::backend::{DeviceDesc, GpuBackend};
use crate::capabilities::{query_device, DeviceReport, QueueFamilyInfo};
use crate::config::{ContextConfig, RequiredFeatures};
use crate::error::{GpuError, Result};

/// Score bonus for discrete GPUs, far above any image-dimension limit.
pub const DISCRETE_GPU_BONUS: u32 = 1 << 20;

/// Priority given to every requested queue.
pub const QUEUE_PRIORITY: f32 = 1.0;

/// Queue family indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Scan families in ascending index order, recording the first graphics
    /// family and the first present-capable family.
    pub fn find(families: &[QueueFamilyInfo]) -> Self {
        let mut indices = Self::default();

        for family in families {
            if indices.graphics_family.is_none() && family.supports_graphics() {
                indices.graphics_family = Some(family.index);
            }
            if indices.present_family.is_none() && family.supports_present() {
                indices.present_family = Some(family.index);
            }
            if indices.is_complete() {
                break;
            }
        }

        indices
    }

    pub const fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Distinct families to request queues from, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);
        for family in [self.graphics_family, self.present_family]
            .into_iter()
            .flatten()
        {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }
}

/// What a physical device must offer to be considered at all.
#[derive(Debug, Clone, Default)]
pub struct DeviceRequirements {
    pub extensions: Vec<String>,
    pub features: RequiredFeatures,
}

impl DeviceRequirements {
    pub fn from_config(config: &ContextConfig) -> Self {
        Self {
            extensions: config.device_extensions.clone(),
            features: config.required_features,
        }
    }
}

/// Score a device for selection. Zero means unsuitable.
pub fn score_device(report: &DeviceReport, requirements: &DeviceRequirements) -> u32 {
    let mut score = 0u32;

    if report.properties.is_discrete() {
        score += DISCRETE_GPU_BONUS;
    }
    score = score.saturating_add(report.properties.max_image_dimension_2d);

    if !requirements.features.satisfied_by(&report.features) {
        return 0;
    }
    if !QueueFamilyIndices::find(&report.queue_families).is_complete() {
        return 0;
    }
    if !report.supports_extensions(&requirements.extensions) {
        return 0;
    }
    if !report.swapchain_support.is_adequate() {
        return 0;
    }

    score
}

/// Pick the highest-scoring device; ties go to the earliest enumerated.
pub fn select_device<'a>(
    reports: &'a [DeviceReport],
    requirements: &DeviceRequirements,
) -> Result<&'a DeviceReport> {
    let mut best: Option<(&DeviceReport, u32)> = None;

    for report in reports {
        let score = score_device(report, requirements);
        debug!("Device {} scored {score}", report.properties.name);
        if score > best.map_or(0, |(_, best_score)| best_score) {
            best = Some((report, score));
        }
    }

    best.map(|(report, _)| report).ok_or(GpuError::NoSuitableDevice)
}

/// The chosen physical device and its queue families.
#[derive(Debug, Clone)]
pub struct SelectedDevice {
    pub report: DeviceReport,
    pub queue_families: QueueFamilyIndices,
}

impl SelectedDevice {
    pub const fn handle(&self) -> vk::PhysicalDevice {
        self.report.handle
    }

    /// Graphics family index. Always set on a selected device.
    pub fn graphics_family(&self) -> u32 {
        self.queue_families.graphics_family.unwrap_or_default()
    }

    /// Present family index. Always set on a selected device.
    pub fn present_family(&self) -> u32 {
        self.queue_families.present_family.unwrap_or_default()
    }
}

/// Enumerate, score and select a physical device for `surface`.
///
/// A device whose capability queries fail is left out, which is the same as
/// scoring it zero.
pub fn pick_physical_device<B: GpuBackend + ?Sized>(
    backend: &B,
    surface: vk::SurfaceKHR,
    requirements: &DeviceRequirements,
) -> Result<SelectedDevice> {
    let reports: Vec<DeviceReport> = backend
        .physical_devices()?
        .into_iter()
        .filter_map(|device| match query_device(backend, device, surface) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Skipping physical device {device:?}: {e}");
                None
            }
        })
        .collect();

    let report = select_device(&reports, requirements)?.clone();
    let queue_families = QueueFamilyIndices::find(&report.queue_families);

    info!("Selected GPU: {}", report.summary());

    Ok(SelectedDevice {
        report,
        queue_families,
    })
}

/// Logical device with its queues.
#[derive(Debug, Clone, Copy)]
pub struct LogicalDevice {
    pub device: vk::Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

/// Build the logical device create parameters.
pub fn device_desc(selected: &SelectedDevice, config: &ContextConfig) -> DeviceDesc {
    DeviceDesc {
        queue_families: selected.queue_families.unique_families(),
        queue_priority: QUEUE_PRIORITY,
        extensions: config.device_extensions.clone(),
        layers: if config.diagnostics {
            config.validation_layers.clone()
        } else {
            Vec::new()
        },
        features: config.required_features.to_enabled(),
    }
}

/// Create the logical device and retrieve one queue per family.
pub fn create_logical_device<B: GpuBackend + ?Sized>(
    backend: &mut B,
    selected: &SelectedDevice,
    config: &ContextConfig,
) -> Result<LogicalDevice> {
    let desc = device_desc(selected, config);

    let device = backend
        .create_device(selected.handle(), &desc)
        .map_err(|e| GpuError::DeviceCreation(e.to_string()))?;

    let graphics_queue = backend.device_queue(selected.graphics_family(), 0);
    let present_queue = backend.device_queue(selected.present_family(), 0);

    info!(
        "Logical device created (queue families {:?})",
        desc.queue_families
    );

    Ok(LogicalDevice {
        device,
        graphics_queue,
        present_queue,
    })
}
