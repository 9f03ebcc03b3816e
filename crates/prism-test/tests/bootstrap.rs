//! Full bootstrap runs over the recording backend.

use ash::vk::{self, Handle};
use prism_gpu::{GpuError, GraphicsContext, GraphicsContextBuilder, RequiredFeatures, Result};
use prism_test::{test_target, CallLog, MockBackend, MockDevice, ResourceKind, TEST_EXTENT};

fn bootstrap(backend: MockBackend) -> (Result<GraphicsContext<MockBackend>>, CallLog) {
    bootstrap_with(GraphicsContextBuilder::new().validation(true), backend)
}

fn bootstrap_with(
    builder: GraphicsContextBuilder,
    backend: MockBackend,
) -> (Result<GraphicsContext<MockBackend>>, CallLog) {
    let log = backend.log();
    let result = builder.build(backend, &test_target(), TEST_EXTENT);
    (result, log)
}

fn expect_err(result: Result<GraphicsContext<MockBackend>>) -> GpuError {
    match result {
        Ok(_) => panic!("bootstrap unexpectedly succeeded"),
        Err(e) => e,
    }
}

fn kinds(entries: &[(ResourceKind, u64)]) -> Vec<ResourceKind> {
    entries.iter().map(|&(kind, _)| kind).collect()
}

fn without_shader_modules(entries: Vec<(ResourceKind, u64)>) -> Vec<(ResourceKind, u64)> {
    entries
        .into_iter()
        .filter(|&(kind, _)| kind != ResourceKind::ShaderModule)
        .collect()
}

#[test]
fn single_capable_device_bootstraps() {
    let (result, log) = bootstrap(MockBackend::default());
    let ctx = result.unwrap();

    let swapchain = ctx.swapchain().unwrap();
    assert_eq!(swapchain.images.len(), 3);
    assert_eq!(swapchain.image_views.len(), 3);
    assert_eq!(swapchain.format, vk::Format::B8G8R8A8_SRGB);
    assert_eq!(swapchain.present_mode, vk::PresentModeKHR::FIFO);
    assert_eq!(
        (swapchain.extent.width, swapchain.extent.height),
        (TEST_EXTENT.width, TEST_EXTENT.height)
    );

    let desc = &ctx.backend().swapchain_descs[0];
    assert_eq!(desc.min_image_count, 3);
    assert_eq!(
        desc.surface_format.color_space,
        vk::ColorSpaceKHR::SRGB_NONLINEAR
    );
    assert_eq!(desc.sharing_mode, vk::SharingMode::EXCLUSIVE);
    assert!(desc.queue_family_indices.is_empty());
    assert_eq!(desc.image_usage, vk::ImageUsageFlags::COLOR_ATTACHMENT);
    assert!(desc.clipped);

    let target = ctx.render_target().unwrap();
    assert_eq!(target.framebuffers.len(), swapchain.image_views.len());
    for (fb_desc, view) in ctx
        .backend()
        .framebuffer_descs
        .iter()
        .zip(&swapchain.image_views)
    {
        assert_eq!(fb_desc.attachments, vec![*view]);
        assert_eq!(fb_desc.layers, 1);
    }

    // Shader modules are gone as soon as the pipeline exists
    let created_modules = log.created_of(ResourceKind::ShaderModule);
    assert_eq!(created_modules.len(), 2);
    assert!(log
        .live()
        .iter()
        .all(|&(kind, _)| kind != ResourceKind::ShaderModule));

    let device = ctx.device().unwrap();
    assert_eq!(device.graphics_queue, device.present_queue);
    assert!(ctx.debug_messenger().is_some());
}

#[test]
fn image_count_is_capped_by_maximum() {
    let device = MockDevice::default().with_image_counts(3, 3);
    let (result, _log) = bootstrap(MockBackend::new(vec![device]));
    let ctx = result.unwrap();
    assert_eq!(ctx.backend().swapchain_descs[0].min_image_count, 3);
}

#[test]
fn driver_may_return_more_images_than_requested() {
    let mut backend = MockBackend::default();
    backend.extra_images = 2;
    let (result, log) = bootstrap(backend);
    let ctx = result.unwrap();

    assert_eq!(ctx.swapchain().unwrap().images.len(), 5);
    assert_eq!(log.created_of(ResourceKind::ImageView).len(), 5);
    assert_eq!(log.created_of(ResourceKind::Framebuffer).len(), 5);
}

#[test]
fn teardown_is_exact_reverse_of_creation() {
    let (result, log) = bootstrap(MockBackend::default());
    drop(result.unwrap());

    let created = without_shader_modules(log.created());
    let mut destroyed = without_shader_modules(log.destroyed());
    destroyed.reverse();
    assert_eq!(destroyed, created);

    assert_eq!(
        kinds(&created[..4]),
        vec![
            ResourceKind::Instance,
            ResourceKind::DebugMessenger,
            ResourceKind::Surface,
            ResourceKind::Device,
        ]
    );
    assert!(log.live().is_empty());
    assert!(log.double_destroys().is_empty());
}

#[test]
fn device_is_idle_before_anything_is_destroyed() {
    let (result, log) = bootstrap(MockBackend::default());
    let ctx = result.unwrap();
    log.clear();
    drop(ctx);

    let calls = log.calls();
    assert_eq!(calls.first(), Some(&prism_test::Call::WaitIdle));
}

#[test]
fn empty_device_list_is_fatal() {
    let (result, log) = bootstrap(MockBackend::new(Vec::new()));
    assert!(matches!(expect_err(result), GpuError::NoSuitableDevice));

    // Instance, messenger and surface were created and must be released
    assert!(log.live().is_empty());
    assert_eq!(
        kinds(&log.destroyed()),
        vec![
            ResourceKind::Surface,
            ResourceKind::DebugMessenger,
            ResourceKind::Instance,
        ]
    );
}

#[test]
fn missing_required_feature_disqualifies_device() {
    let device = MockDevice::default().without_geometry_shader();
    let (result, log) = bootstrap(MockBackend::new(vec![device]));
    assert!(matches!(expect_err(result), GpuError::NoSuitableDevice));
    assert!(log.live().is_empty());
}

#[test]
fn feature_requirement_can_be_relaxed() {
    let device = MockDevice::default().without_geometry_shader();
    let builder = GraphicsContextBuilder::new()
        .validation(true)
        .required_features(RequiredFeatures {
            geometry_shader: false,
        });
    let (result, _log) = bootstrap_with(builder, MockBackend::new(vec![device]));
    let ctx = result.unwrap();
    assert_eq!(
        ctx.backend().device_desc.as_ref().unwrap().features.geometry_shader,
        vk::FALSE
    );
}

#[test]
fn unqualified_devices_are_skipped() {
    let devices = vec![
        MockDevice::discrete("no swapchain").with_extensions(Vec::new()),
        MockDevice::discrete("no formats").with_formats(Vec::new()),
        MockDevice::discrete("no modes").with_present_modes(Vec::new()),
        MockDevice::integrated("usable").with_max_image_dimension(4096),
    ];
    let (result, _log) = bootstrap(MockBackend::new(devices));
    let ctx = result.unwrap();

    let selected = ctx.physical_device().unwrap();
    assert_eq!(selected.report.properties.name, "usable");
    assert_eq!(selected.handle().as_raw(), 4);
}

#[test]
fn discrete_beats_integrated_with_larger_limit() {
    let devices = vec![
        MockDevice::integrated("big integrated").with_max_image_dimension(32768),
        MockDevice::discrete("small discrete").with_max_image_dimension(8192),
    ];
    let (result, _log) = bootstrap(MockBackend::new(devices));
    let ctx = result.unwrap();
    assert_eq!(
        ctx.physical_device().unwrap().report.properties.name,
        "small discrete"
    );
}

#[test]
fn higher_limit_wins_between_equal_types() {
    let devices = vec![
        MockDevice::discrete("small").with_max_image_dimension(8192),
        MockDevice::discrete("big").with_max_image_dimension(16384),
    ];
    let (result, _log) = bootstrap(MockBackend::new(devices));
    let ctx = result.unwrap();
    assert_eq!(ctx.physical_device().unwrap().report.properties.name, "big");
}

#[test]
fn device_with_failing_surface_queries_is_skipped() {
    let devices = vec![
        MockDevice::discrete("lost").with_lost_surface(),
        MockDevice::integrated("good"),
    ];
    let (result, _log) = bootstrap(MockBackend::new(devices));
    let ctx = result.unwrap();

    let selected = ctx.physical_device().unwrap();
    assert_eq!(selected.report.properties.name, "good");
    assert_eq!(selected.handle().as_raw(), 2);
}

#[test]
fn only_failing_devices_means_no_suitable_device() {
    let devices = vec![MockDevice::discrete("lost").with_lost_surface()];
    let (result, _log) = bootstrap(MockBackend::new(devices));
    assert!(matches!(expect_err(result), GpuError::NoSuitableDevice));
}

#[test]
fn ties_go_to_first_enumerated_device() {
    let devices = vec![MockDevice::discrete("first"), MockDevice::discrete("second")];
    let (result, _log) = bootstrap(MockBackend::new(devices));
    let ctx = result.unwrap();
    assert_eq!(ctx.physical_device().unwrap().handle().as_raw(), 1);
}

#[test]
fn missing_validation_layer_is_fatal() {
    let (result, log) = bootstrap(MockBackend::default().without_layers());
    match expect_err(result) {
        GpuError::LayerUnavailable(layer) => assert_eq!(layer, "VK_LAYER_KHRONOS_validation"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(log.is_empty());
}

#[test]
fn layers_are_not_checked_without_diagnostics() {
    let builder = GraphicsContextBuilder::new().validation(false);
    let (result, log) = bootstrap_with(builder, MockBackend::default().without_layers());
    let ctx = result.unwrap();

    assert!(ctx.debug_messenger().is_none());
    assert!(log.created_of(ResourceKind::DebugMessenger).is_empty());

    let instance_desc = ctx.backend().instance_desc.as_ref().unwrap();
    assert!(instance_desc.layers.is_empty());
    assert!(!instance_desc
        .extensions
        .contains(&"VK_EXT_debug_utils".to_string()));
    assert!(ctx.backend().device_desc.as_ref().unwrap().layers.is_empty());
}

#[test]
fn diagnostics_enable_layers_and_debug_utils() {
    let (result, _log) = bootstrap(MockBackend::default());
    let ctx = result.unwrap();

    let instance_desc = ctx.backend().instance_desc.as_ref().unwrap();
    assert_eq!(instance_desc.layers, vec!["VK_LAYER_KHRONOS_validation"]);
    assert!(instance_desc
        .extensions
        .contains(&"VK_EXT_debug_utils".to_string()));
    assert!(!instance_desc.portability);
    assert_eq!(
        ctx.backend().device_desc.as_ref().unwrap().layers,
        instance_desc.layers
    );
}

#[test]
fn portability_enumeration_is_enabled_when_offered() {
    let mut backend = MockBackend::default();
    backend
        .instance_extensions
        .push("VK_KHR_portability_enumeration".to_string());
    let (result, _log) = bootstrap(backend);
    let ctx = result.unwrap();

    let instance_desc = ctx.backend().instance_desc.as_ref().unwrap();
    assert!(instance_desc.portability);
    assert!(instance_desc
        .extensions
        .contains(&"VK_KHR_portability_enumeration".to_string()));
}

#[test]
fn window_extensions_reach_the_instance() {
    let builder = GraphicsContextBuilder::new()
        .validation(false)
        .instance_extensions(vec![
            "VK_KHR_surface".to_string(),
            "VK_KHR_xlib_surface".to_string(),
        ]);
    let (result, _log) = bootstrap_with(builder, MockBackend::default());
    let ctx = result.unwrap();
    assert_eq!(
        ctx.backend().instance_desc.as_ref().unwrap().extensions,
        vec!["VK_KHR_surface", "VK_KHR_xlib_surface"]
    );
}

#[test]
fn unsupported_instance_extension_fails_initialization() {
    let builder = GraphicsContextBuilder::new()
        .validation(false)
        .instance_extensions(vec!["VK_KHR_win32_surface".to_string()]);
    let (result, log) = bootstrap_with(builder, MockBackend::default());
    assert!(matches!(expect_err(result), GpuError::Initialization(_)));
    assert!(log.is_empty());
}

#[test]
fn unresolvable_debug_utils_is_fatal() {
    let (result, log) = bootstrap(MockBackend::default().without_debug_utils());
    assert!(matches!(
        expect_err(result),
        GpuError::ExtensionUnavailable(_)
    ));
    assert_eq!(kinds(&log.created()), vec![ResourceKind::Instance]);
    assert!(log.live().is_empty());
}

#[test]
fn distinct_queue_families_share_concurrently() {
    let device = MockDevice::default().with_split_queues();
    let (result, _log) = bootstrap(MockBackend::new(vec![device]));
    let ctx = result.unwrap();

    let selected = ctx.physical_device().unwrap();
    assert_eq!(selected.graphics_family(), 0);
    assert_eq!(selected.present_family(), 1);

    assert_eq!(
        ctx.backend().device_desc.as_ref().unwrap().queue_families,
        vec![0, 1]
    );

    let desc = &ctx.backend().swapchain_descs[0];
    assert_eq!(desc.sharing_mode, vk::SharingMode::CONCURRENT);
    assert_eq!(desc.queue_family_indices, vec![0, 1]);

    let device = ctx.device().unwrap();
    assert_ne!(device.graphics_queue, device.present_queue);
}

#[test]
fn shared_queue_family_is_requested_once() {
    let (result, _log) = bootstrap(MockBackend::default());
    let ctx = result.unwrap();
    assert_eq!(
        ctx.backend().device_desc.as_ref().unwrap().queue_families,
        vec![0]
    );
}

#[test]
fn mailbox_is_preferred_when_offered() {
    let device = MockDevice::default().with_present_modes(vec![
        vk::PresentModeKHR::FIFO,
        vk::PresentModeKHR::MAILBOX,
    ]);
    let (result, _log) = bootstrap(MockBackend::new(vec![device]));
    let ctx = result.unwrap();
    assert_eq!(
        ctx.swapchain().unwrap().present_mode,
        vk::PresentModeKHR::MAILBOX
    );
}

#[test]
fn fixed_surface_extent_wins_over_window_size() {
    let device = MockDevice::default().with_current_extent(1920, 1080);
    let (result, _log) = bootstrap(MockBackend::new(vec![device]));
    let ctx = result.unwrap();
    let extent = ctx.swapchain().unwrap().extent;
    assert_eq!((extent.width, extent.height), (1920, 1080));

    let pipeline = &ctx.backend().pipeline_descs[0];
    assert_eq!(pipeline.scissor.extent.width, 1920);
    assert_eq!(pipeline.scissor.extent.height, 1080);
}

#[test]
fn failed_device_creation_releases_earlier_stages() {
    let (result, log) = bootstrap(MockBackend::default().failing(ResourceKind::Device));
    assert!(matches!(expect_err(result), GpuError::DeviceCreation(_)));
    assert!(log.live().is_empty());
    assert_eq!(
        kinds(&log.destroyed()),
        vec![
            ResourceKind::Surface,
            ResourceKind::DebugMessenger,
            ResourceKind::Instance,
        ]
    );
}

#[test]
fn failed_surface_creation_is_reported() {
    let (result, log) = bootstrap(MockBackend::default().failing(ResourceKind::Surface));
    assert!(matches!(expect_err(result), GpuError::SurfaceCreation(_)));
    assert!(log.live().is_empty());
}

#[test]
fn failed_image_view_releases_partial_swapchain() {
    let backend = MockBackend::default().failing_nth(ResourceKind::ImageView, 2);
    let (result, log) = bootstrap(backend);
    assert!(matches!(expect_err(result), GpuError::ImageViewCreation(_)));
    assert!(log.live().is_empty());
    assert!(log.double_destroys().is_empty());
}

#[test]
fn failed_render_pass_is_reported() {
    let backend = MockBackend::default().failing(ResourceKind::RenderPass);
    let (result, log) = bootstrap(backend);
    assert!(matches!(expect_err(result), GpuError::RenderPassCreation(_)));
    assert!(log.live().is_empty());
}

#[test]
fn failed_pipeline_releases_modules_and_layout() {
    let backend = MockBackend::default().failing(ResourceKind::Pipeline);
    let (result, log) = bootstrap(backend);
    assert!(matches!(expect_err(result), GpuError::PipelineCreation(_)));
    assert!(log.live().is_empty());
    assert!(log.double_destroys().is_empty());
}

#[test]
fn failed_fragment_module_releases_vertex_module() {
    let backend = MockBackend::default().failing_nth(ResourceKind::ShaderModule, 1);
    let (result, log) = bootstrap(backend);
    assert!(matches!(expect_err(result), GpuError::PipelineCreation(_)));
    assert!(log.live().is_empty());
}

#[test]
fn failed_framebuffer_releases_everything() {
    let backend = MockBackend::default().failing_nth(ResourceKind::Framebuffer, 1);
    let (result, log) = bootstrap(backend);
    assert!(matches!(expect_err(result), GpuError::FramebufferCreation(_)));
    assert!(log.live().is_empty());
    assert!(log.double_destroys().is_empty());

    let destroyed = kinds(&without_shader_modules(log.destroyed()));
    assert_eq!(destroyed.last(), Some(&ResourceKind::Instance));
}

#[test]
fn recreation_keeps_device_surface_and_instance() {
    let (result, log) = bootstrap(MockBackend::default());
    let mut ctx = result.unwrap();

    let instance = ctx.instance();
    let surface = ctx.surface();
    let device = ctx.device().unwrap().device;
    let old_swapchain = ctx.swapchain().unwrap().swapchain;

    ctx.recreate_swapchain(vk::Extent2D {
        width: 1024,
        height: 768,
    })
    .unwrap();

    assert_eq!(ctx.instance(), instance);
    assert_eq!(ctx.surface(), surface);
    assert_eq!(ctx.device().unwrap().device, device);

    let swapchain = ctx.swapchain().unwrap();
    assert_ne!(swapchain.swapchain, old_swapchain);
    assert_eq!((swapchain.extent.width, swapchain.extent.height), (1024, 768));
    assert!(log
        .destroyed()
        .contains(&(ResourceKind::Swapchain, old_swapchain.as_raw())));

    assert_eq!(log.created_of(ResourceKind::Device).len(), 1);
    assert_eq!(log.created_of(ResourceKind::Surface).len(), 1);
    assert_eq!(log.created_of(ResourceKind::Swapchain).len(), 2);
    assert_eq!(log.created_of(ResourceKind::Pipeline).len(), 2);

    drop(ctx);
    assert!(log.live().is_empty());
    assert!(log.double_destroys().is_empty());
}

#[test]
fn zero_area_resize_is_ignored() {
    let (result, log) = bootstrap(MockBackend::default());
    let mut ctx = result.unwrap();
    let swapchain = ctx.swapchain().unwrap().swapchain;

    ctx.recreate_swapchain(vk::Extent2D {
        width: 0,
        height: 600,
    })
    .unwrap();

    assert_eq!(ctx.swapchain().unwrap().swapchain, swapchain);
    assert_eq!(log.created_of(ResourceKind::Swapchain).len(), 1);
}

#[test]
fn failed_recreation_leaves_context_droppable() {
    let backend = MockBackend::default().failing_nth(ResourceKind::Swapchain, 1);
    let (result, log) = bootstrap(backend);
    let mut ctx = result.unwrap();

    let err = ctx
        .recreate_swapchain(vk::Extent2D {
            width: 640,
            height: 480,
        })
        .unwrap_err();
    assert!(matches!(err, GpuError::SwapchainCreation(_)));
    assert!(ctx.swapchain().is_none());
    assert!(ctx.render_target().is_none());
    assert!(ctx.device().is_some());

    drop(ctx);
    assert!(log.live().is_empty());
    assert!(log.double_destroys().is_empty());
}
