//! # Ember Graphics
//!
//! Render-graph hardware abstraction layer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Device`] - Resource creation on a [`GpuBackend`](backend::GpuBackend)
//! - [`RenderGraph`] - Declarative description of passes and the attachments they use
//! - [`compiler`] - Pass ordering, synchronization and transient lifetimes
//! - [`FrameScheduler`] - Frames in flight, queue submission and presentation
//! - A dummy backend for testing and headless development
//!
//! ## Example
//!
//! ```ignore
//! use ember_graphics::{Device, DeviceParameters, FrameScheduler, RenderGraph, SchedulerConfig};
//!
//! let mut device = Device::new(DeviceParameters::default())?;
//! let mut scheduler = FrameScheduler::new(&device, SchedulerConfig::from_env())?;
//!
//! scheduler.begin_frame()?;
//! let mut graph = RenderGraph::new();
//! // Declare passes and attachments...
//! let outcome = scheduler.end_frame(&device, &mut graph)?;
//! ```

pub mod backend;
pub mod compiler;
pub mod device;
pub mod error;
pub mod graph;
pub mod resources;
pub mod scheduler;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendType, GpuBackend};
pub use compiler::{AliasingPlan, CompiledGraph, GraphError};
pub use device::{Device, DeviceCapabilities, DeviceParameters};
pub use error::GraphicsError;
pub use graph::{
    AttachmentLifetime, BufferAttachmentHandle, CommandList, ImageAttachmentHandle, LoadOp,
    PassHandle, RenderGraph, StoreOp, TransientImageDescriptor,
};
pub use resources::{
    BufferHandle, ImageHandle, SamplerHandle, SwapchainDescriptor, SwapchainHandle,
};
pub use scheduler::{FrameOutcome, FrameScheduler, PresentStatus, SchedulerConfig};
pub use types::{
    Access, BufferDescriptor, BufferUsage, Extent3d, ImageDescriptor, ImageFormat, ImageUsage,
    PipelineStages, QueueType, RenderArea,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the graphics library version.
pub fn init() {
    log::info!("Ember Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_render_graph_creation() {
        let graph = RenderGraph::new();
        assert!(graph.passes().is_empty());
    }

    #[test]
    fn test_dummy_device() {
        let device = Device::new(DeviceParameters::default()).unwrap();
        assert_eq!(device.name(), "Dummy Backend");
    }
}
