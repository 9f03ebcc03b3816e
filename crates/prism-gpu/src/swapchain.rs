//! Swapchain negotiation and management.

use ash::vk;
use tracing::info;

use crate::backend::{GpuBackend, ImageViewDesc, SwapchainDesc};
use crate::capabilities::SwapchainSupport;
use crate::device::QueueFamilyIndices;
use crate::error::{GpuError, Result};

/// Format used when the surface accepts anything, and preferred otherwise.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Select the surface format.
///
/// A single `UNDEFINED` entry means the surface takes any format. Returns
/// `None` only for an empty set.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    if let [only] = available {
        if only.format == vk::Format::UNDEFINED {
            return Some(PREFERRED_SURFACE_FORMAT);
        }
    }

    available
        .iter()
        .find(|format| {
            format.format == PREFERRED_SURFACE_FORMAT.format
                && format.color_space == PREFERRED_SURFACE_FORMAT.color_space
        })
        .or_else(|| available.first())
        .copied()
}

/// Select the present mode: mailbox when offered, FIFO otherwise.
pub fn select_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        // Always supported
        vk::PresentModeKHR::FIFO
    }
}

/// Calculate swapchain extent.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_extent: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: window_extent.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: window_extent.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// One more than the minimum, capped by a non-zero maximum.
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && image_count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        image_count
    }
}

/// Concurrent sharing across both families when they differ.
pub fn select_sharing_mode(indices: &QueueFamilyIndices) -> (vk::SharingMode, Vec<u32>) {
    match (indices.graphics_family, indices.present_family) {
        (Some(graphics), Some(present)) if graphics != present => {
            (vk::SharingMode::CONCURRENT, vec![graphics, present])
        }
        _ => (vk::SharingMode::EXCLUSIVE, Vec::new()),
    }
}

/// Negotiate every swapchain parameter against the surface support.
pub fn swapchain_desc(
    support: &SwapchainSupport,
    indices: &QueueFamilyIndices,
    surface: vk::SurfaceKHR,
    window_extent: vk::Extent2D,
) -> Result<SwapchainDesc> {
    let surface_format = select_surface_format(&support.formats).ok_or_else(|| {
        GpuError::SwapchainCreation("surface reports no formats".to_string())
    })?;
    let (sharing_mode, queue_family_indices) = select_sharing_mode(indices);

    Ok(SwapchainDesc {
        surface,
        min_image_count: select_image_count(&support.capabilities),
        surface_format,
        present_mode: select_present_mode(&support.present_modes),
        extent: calculate_extent(&support.capabilities, window_extent),
        image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        sharing_mode,
        queue_family_indices,
        pre_transform: support.capabilities.current_transform,
        composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        clipped: true,
    })
}

/// A 2D color view over one swapchain image.
pub fn color_view_desc(image: vk::Image, format: vk::Format) -> ImageViewDesc {
    ImageViewDesc {
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        components: vk::ComponentMapping::default()
            .r(vk::ComponentSwizzle::IDENTITY)
            .g(vk::ComponentSwizzle::IDENTITY)
            .b(vk::ComponentSwizzle::IDENTITY)
            .a(vk::ComponentSwizzle::IDENTITY),
        subresource_range: vk::ImageSubresourceRange::default()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(0)
            .layer_count(1),
    }
}

/// Swapchain wrapper.
///
/// `images` belong to the swapchain and go away with it; only the views are
/// destroyed individually.
#[derive(Debug, Clone)]
pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    /// Create the swapchain, fetch its images and build one view per image.
    ///
    /// On a view failure everything created so far is released again.
    pub fn new<B: GpuBackend + ?Sized>(backend: &mut B, desc: &SwapchainDesc) -> Result<Self> {
        let swapchain = backend
            .create_swapchain(desc)
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        // The driver may hand out more images than requested
        let images = match backend.swapchain_images(swapchain) {
            Ok(images) => images,
            Err(e) => {
                backend.destroy_swapchain(swapchain);
                return Err(GpuError::SwapchainCreation(format!(
                    "failed to fetch images: {e}"
                )));
            }
        };

        let format = desc.surface_format.format;
        let mut image_views = Vec::with_capacity(images.len());
        for (i, &image) in images.iter().enumerate() {
            match backend.create_image_view(&color_view_desc(image, format)) {
                Ok(view) => image_views.push(view),
                Err(e) => {
                    for &view in image_views.iter().rev() {
                        backend.destroy_image_view(view);
                    }
                    backend.destroy_swapchain(swapchain);
                    return Err(GpuError::ImageViewCreation(format!("image {i}: {e}")));
                }
            }
        }

        info!(
            "Swapchain created: {}x{} {:?} {:?} ({} images)",
            desc.extent.width,
            desc.extent.height,
            format,
            desc.present_mode,
            images.len()
        );

        Ok(Self {
            swapchain,
            images,
            image_views,
            format,
            present_mode: desc.present_mode,
            extent: desc.extent,
        })
    }

    /// Destroy the views in reverse creation order, then the swapchain.
    ///
    /// The swapchain must not be in use.
    pub fn destroy<B: GpuBackend + ?Sized>(self, backend: &mut B) {
        for &view in self.image_views.iter().rev() {
            backend.destroy_image_view(view);
        }
        backend.destroy_swapchain(self.swapchain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn key(format: Option<vk::SurfaceFormatKHR>) -> Option<(vk::Format, vk::ColorSpaceKHR)> {
        format.map(|f| (f.format, f.color_space))
    }

    const PREFERRED: Option<(vk::Format, vk::ColorSpaceKHR)> = Some((
        PREFERRED_SURFACE_FORMAT.format,
        PREFERRED_SURFACE_FORMAT.color_space,
    ));

    #[test]
    fn undefined_format_means_any() {
        let available = [surface_format(
            vk::Format::UNDEFINED,
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        )];
        assert_eq!(key(select_surface_format(&available)), PREFERRED);
    }

    #[test]
    fn preferred_format_wins_anywhere_in_list() {
        let available = [
            surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            PREFERRED_SURFACE_FORMAT,
        ];
        assert_eq!(key(select_surface_format(&available)), PREFERRED);
    }

    #[test]
    fn falls_back_to_first_format() {
        let available = [
            surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ];
        let chosen = key(select_surface_format(&available));
        assert_eq!(chosen, key(Some(available[0])));
        // Same input, same answer
        assert_eq!(key(select_surface_format(&available)), chosen);
        assert!(select_surface_format(&[]).is_none());
    }

    #[test]
    fn mailbox_preferred_over_fifo() {
        assert_eq!(
            select_present_mode(&[vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::FIFO
        );
        assert_eq!(
            select_present_mode(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED]),
            vk::PresentModeKHR::FIFO
        );
        assert_eq!(
            select_present_mode(&[
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::IMMEDIATE,
                vk::PresentModeKHR::MAILBOX,
            ]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            select_present_mode(&[vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::MAILBOX
        );
    }

    #[test]
    fn defined_current_extent_is_used_verbatim() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        };
        let extent = calculate_extent(
            &capabilities,
            vk::Extent2D {
                width: 1920,
                height: 1080,
            },
        );
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn undefined_extent_clamps_window_size() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 64,
                height: 64,
            },
            max_image_extent: vk::Extent2D {
                width: 1024,
                height: 768,
            },
            ..Default::default()
        };

        let large = calculate_extent(
            &capabilities,
            vk::Extent2D {
                width: 4000,
                height: 10,
            },
        );
        assert_eq!((large.width, large.height), (1024, 64));

        let inside = calculate_extent(
            &capabilities,
            vk::Extent2D {
                width: 640,
                height: 480,
            },
        );
        assert_eq!((inside.width, inside.height), (640, 480));
    }

    #[test]
    fn image_count_respects_maximum() {
        let mut capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(select_image_count(&capabilities), 3);

        capabilities.max_image_count = 8;
        assert_eq!(select_image_count(&capabilities), 3);

        capabilities.max_image_count = 2;
        assert_eq!(select_image_count(&capabilities), 2);
    }

    #[test]
    fn sharing_mode_follows_family_split() {
        let shared = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert_eq!(
            select_sharing_mode(&shared),
            (vk::SharingMode::EXCLUSIVE, Vec::new())
        );

        let split = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(1),
        };
        assert_eq!(
            select_sharing_mode(&split),
            (vk::SharingMode::CONCURRENT, vec![0, 1])
        );
    }

    #[test]
    fn empty_formats_fail_negotiation() {
        let support = SwapchainSupport {
            present_modes: vec![vk::PresentModeKHR::FIFO],
            ..Default::default()
        };
        let result = swapchain_desc(
            &support,
            &QueueFamilyIndices::default(),
            vk::SurfaceKHR::null(),
            vk::Extent2D::default(),
        );
        assert!(matches!(result, Err(GpuError::SwapchainCreation(_))));
    }

    #[test]
    fn color_view_is_single_level_single_layer() {
        let desc = color_view_desc(vk::Image::null(), vk::Format::B8G8R8A8_SRGB);
        assert_eq!(desc.view_type, vk::ImageViewType::TYPE_2D);
        assert_eq!(desc.components.r, vk::ComponentSwizzle::IDENTITY);
        assert_eq!(desc.subresource_range.aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(desc.subresource_range.level_count, 1);
        assert_eq!(desc.subresource_range.layer_count, 1);
    }
}
