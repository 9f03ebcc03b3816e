//! Bootstrap configuration.

use ash::vk;

/// Khronos validation layer.
pub const KHRONOS_VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Device features a physical device must offer to be selected.
///
/// Every required feature is also enabled on the logical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredFeatures {
    pub geometry_shader: bool,
}

impl Default for RequiredFeatures {
    fn default() -> Self {
        Self {
            geometry_shader: true,
        }
    }
}

impl RequiredFeatures {
    /// Check `available` against the required set.
    pub fn satisfied_by(&self, available: &vk::PhysicalDeviceFeatures) -> bool {
        !self.geometry_shader || available.geometry_shader == vk::TRUE
    }

    /// Features to enable on the logical device.
    pub fn to_enabled(self) -> vk::PhysicalDeviceFeatures {
        vk::PhysicalDeviceFeatures::default().geometry_shader(self.geometry_shader)
    }
}

/// Everything the bootstrap needs to know up front.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub app_name: String,
    pub app_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub api_version: u32,
    /// Instance extensions required by the window system.
    pub instance_extensions: Vec<String>,
    /// Layers enabled when diagnostics are on.
    pub validation_layers: Vec<String>,
    pub device_extensions: Vec<String>,
    pub required_features: RequiredFeatures,
    /// Enable validation layers and the debug messenger.
    pub diagnostics: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            app_name: "Prism".to_string(),
            app_version: vk::make_api_version(0, 1, 0, 0),
            engine_name: "No Engine".to_string(),
            engine_version: vk::make_api_version(0, 1, 0, 0),
            api_version: vk::API_VERSION_1_0,
            instance_extensions: Vec::new(),
            validation_layers: vec![KHRONOS_VALIDATION_LAYER.to_string()],
            device_extensions: vec![swapchain_extension_name()],
            required_features: RequiredFeatures::default(),
            diagnostics: cfg!(debug_assertions),
        }
    }
}

/// `VK_KHR_swapchain`.
pub fn swapchain_extension_name() -> String {
    ash::khr::swapchain::NAME.to_string_lossy().into_owned()
}

/// `VK_EXT_debug_utils`.
pub fn debug_utils_extension_name() -> String {
    ash::ext::debug_utils::NAME.to_string_lossy().into_owned()
}

/// `VK_KHR_portability_enumeration`.
pub fn portability_enumeration_extension_name() -> String {
    ash::khr::portability_enumeration::NAME
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_shader_requirement() {
        let required = RequiredFeatures::default();
        let mut features = vk::PhysicalDeviceFeatures::default();
        assert!(!required.satisfied_by(&features));

        features.geometry_shader = vk::TRUE;
        assert!(required.satisfied_by(&features));

        let relaxed = RequiredFeatures {
            geometry_shader: false,
        };
        assert!(relaxed.satisfied_by(&vk::PhysicalDeviceFeatures::default()));
    }

    #[test]
    fn required_features_are_enabled() {
        let enabled = RequiredFeatures::default().to_enabled();
        assert_eq!(enabled.geometry_shader, vk::TRUE);
        assert_eq!(enabled.tessellation_shader, vk::FALSE);
    }

    #[test]
    fn default_config_requests_swapchain() {
        let config = ContextConfig::default();
        assert_eq!(config.device_extensions, vec!["VK_KHR_swapchain"]);
        assert_eq!(config.validation_layers, vec![KHRONOS_VALIDATION_LAYER]);
    }
}
