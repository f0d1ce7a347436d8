//! Common utilities for integration tests.
//!
//! Every test runs on the dummy backend, which validates semaphore and fence
//! usage as strictly as a real driver would.

#![allow(dead_code)]

use std::sync::Arc;

use ember_graphics::backend::dummy::{CompletionMode, DummyBackend, DummyBackendConfig};
use ember_graphics::{
    Device, DeviceParameters, FrameOutcome, FrameScheduler, ImageFormat, RenderGraph,
    SchedulerConfig, SwapchainDescriptor, SwapchainHandle, TransientImageDescriptor,
};

/// Install the test logger once per process.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An HDR color target description.
pub fn color_target(width: u32, height: u32) -> TransientImageDescriptor {
    TransientImageDescriptor::new_2d(width, height, ImageFormat::Rgba16Float)
}

// ============================================================================
// Test Context
// ============================================================================

/// A device and a scheduler on one dummy backend.
pub struct TestContext {
    /// The backend, for inspecting submissions and completing fences.
    pub backend: Arc<DummyBackend>,
    /// Device owning the resources.
    pub device: Device,
    /// Scheduler submitting to the backend.
    pub scheduler: FrameScheduler,
}

impl TestContext {
    /// Immediate completion, default scheduler configuration.
    pub fn new() -> Self {
        Self::with_config(DummyBackendConfig::default(), SchedulerConfig::default())
    }

    /// Manual completion with `frames_in_flight` slots.
    pub fn manual(frames_in_flight: usize) -> Self {
        Self::with_config(
            DummyBackendConfig::new().with_completion(CompletionMode::Manual),
            SchedulerConfig::new().with_frames_in_flight(frames_in_flight),
        )
    }

    pub fn with_config(backend_config: DummyBackendConfig, config: SchedulerConfig) -> Self {
        init_logging();
        let backend = Arc::new(DummyBackend::with_config(backend_config));
        let device = Device::with_backend(
            backend.clone(),
            DeviceParameters::new().with_label("integration"),
        );
        let scheduler = FrameScheduler::new(&device, config).expect("scheduler");
        Self {
            backend,
            device,
            scheduler,
        }
    }

    /// A BGRA swapchain.
    pub fn create_swapchain(&mut self, width: u32, height: u32) -> SwapchainHandle {
        self.device
            .create_swapchain(&SwapchainDescriptor::new(width, height, ImageFormat::Bgra8Unorm))
            .expect("swapchain")
    }

    /// Begin a frame and submit `graph`.
    pub fn run_frame(&mut self, graph: &mut RenderGraph) -> FrameOutcome {
        self.scheduler.begin_frame().expect("begin_frame");
        self.scheduler
            .end_frame(&self.device, graph)
            .expect("end_frame")
    }

    /// Labels of all submissions so far, in submission order.
    pub fn submitted_labels(&self) -> Vec<String> {
        self.backend
            .submissions()
            .iter()
            .map(|submission| submission.label().unwrap_or("").to_string())
            .collect()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.backend.complete_all();
        let _ = self.scheduler.wait_idle();
    }
}
