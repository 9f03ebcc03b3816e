//! Test harness for the Prism bootstrap.
//!
//! Provides [`MockBackend`], a [`prism_gpu::GpuBackend`] that never touches a
//! driver. It hands out unique handles, records every create and destroy call
//! in a [`CallLog`], serves scripted physical devices and can be told to fail
//! a chosen creation call.

pub mod log;
pub mod mock;
pub mod scenario;

pub use log::{Call, CallLog, ResourceKind};
pub use mock::{FailurePoint, MockBackend};
pub use scenario::{MockDevice, MockQueueFamily};

use ash::vk;
use prism_gpu::SurfaceTarget;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle};

/// Window handles for tests. Never dereferenced by the mock.
pub fn test_target() -> SurfaceTarget {
    SurfaceTarget {
        display: RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
        window: RawWindowHandle::Xlib(XlibWindowHandle::new(1)),
    }
}

/// Window size used by tests unless they need something specific.
pub const TEST_EXTENT: vk::Extent2D = vk::Extent2D {
    width: 800,
    height: 600,
};
