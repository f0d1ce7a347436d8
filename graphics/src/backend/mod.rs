//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction for GPU backends. The core
//! never touches native API objects: every backend object is a raw `u64` id
//! wrapped in a typed newtype, and the [`Device`](crate::Device) keeps the
//! descriptive state in its handle pools.
//!
//! # Available Backends
//!
//! - `dummy` (default): in-memory backend for testing and development
//!
//! # Architecture
//!
//! Each backend implements the [`GpuBackend`] trait, which provides:
//! - Resource creation and destruction (images, buffers, views, samplers)
//! - Synchronization primitives (fences, semaphores)
//! - Buffer mapping
//! - Queue submission, swapchain acquisition and presentation

pub mod dummy;

use std::fmt;
use std::sync::Arc;

use crate::error::GraphicsError;
use crate::graph::CommandList;
use crate::resources::{BufferViewDescriptor, ImageViewDescriptor, SwapchainDescriptor};
use crate::types::{
    BufferDescriptor, ImageDescriptor, PipelineStages, QueueType, SamplerDescriptor,
};

macro_rules! raw_object {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#x})"), self.0)
            }
        }
    };
}

raw_object!(
    /// Backend image object.
    GpuImage
);
raw_object!(
    /// Backend buffer object.
    GpuBuffer
);
raw_object!(
    /// Backend image view object.
    GpuImageView
);
raw_object!(
    /// Backend buffer view object.
    GpuBufferView
);
raw_object!(
    /// Backend sampler object.
    GpuSampler
);
raw_object!(
    /// Fence for CPU-GPU synchronization.
    GpuFence
);
raw_object!(
    /// Binary semaphore for GPU-GPU synchronization.
    GpuSemaphore
);
raw_object!(
    /// Backend swapchain object.
    GpuSwapchain
);

/// A semaphore wait with the stages that must not start before it signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreWait {
    /// The semaphore to wait on.
    pub semaphore: GpuSemaphore,
    /// Stages blocked by the wait.
    pub stages: PipelineStages,
}

impl SemaphoreWait {
    /// Create a wait on `semaphore` blocking `stages`.
    pub fn new(semaphore: GpuSemaphore, stages: PipelineStages) -> Self {
        Self { semaphore, stages }
    }
}

/// One queue submission.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    /// Target queue.
    pub queue: QueueType,
    /// Command lists executed in order.
    pub command_lists: &'a [CommandList],
    /// Semaphores waited on before execution.
    pub wait_semaphores: &'a [SemaphoreWait],
    /// Semaphores signaled after execution.
    pub signal_semaphores: &'a [GpuSemaphore],
    /// Fence signaled after execution.
    pub fence: Option<GpuFence>,
}

impl<'a> Submission<'a> {
    /// An empty submission on `queue`.
    pub fn new(queue: QueueType) -> Self {
        Self {
            queue,
            command_lists: &[],
            wait_semaphores: &[],
            signal_semaphores: &[],
            fence: None,
        }
    }

    /// Set the command lists.
    pub fn with_command_lists(mut self, command_lists: &'a [CommandList]) -> Self {
        self.command_lists = command_lists;
        self
    }

    /// Set the wait semaphores.
    pub fn with_waits(mut self, waits: &'a [SemaphoreWait]) -> Self {
        self.wait_semaphores = waits;
        self
    }

    /// Set the signal semaphores.
    pub fn with_signals(mut self, signals: &'a [GpuSemaphore]) -> Self {
        self.signal_semaphores = signals;
        self
    }

    /// Set the fence.
    pub fn with_fence(mut self, fence: GpuFence) -> Self {
        self.fence = Some(fence);
        self
    }
}

/// A request to present one swapchain image.
#[derive(Debug, Clone, Copy)]
pub struct PresentRequest<'a> {
    /// Swapchain to present.
    pub swapchain: GpuSwapchain,
    /// Image index returned by the matching acquire.
    pub image_index: u32,
    /// Semaphores waited on before presentation.
    pub wait_semaphores: &'a [GpuSemaphore],
}

/// GPU backend trait for abstracting different GPU APIs.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create an image resource.
    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<GpuImage, GraphicsError>;

    /// Destroy an image resource.
    fn destroy_image(&self, image: GpuImage);

    /// Create a buffer resource.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError>;

    /// Destroy a buffer resource.
    fn destroy_buffer(&self, buffer: GpuBuffer);

    /// Create a view of an image.
    fn create_image_view(
        &self,
        image: GpuImage,
        descriptor: &ImageViewDescriptor,
    ) -> Result<GpuImageView, GraphicsError>;

    /// Destroy an image view.
    fn destroy_image_view(&self, view: GpuImageView);

    /// Create a view of a buffer.
    fn create_buffer_view(
        &self,
        buffer: GpuBuffer,
        descriptor: &BufferViewDescriptor,
    ) -> Result<GpuBufferView, GraphicsError>;

    /// Destroy a buffer view.
    fn destroy_buffer_view(&self, view: GpuBufferView);

    /// Create a sampler resource.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuSampler, GraphicsError>;

    /// Destroy a sampler resource.
    fn destroy_sampler(&self, sampler: GpuSampler);

    /// Create a fence for CPU-GPU synchronization.
    fn create_fence(&self, signaled: bool) -> Result<GpuFence, GraphicsError>;

    /// Destroy a fence.
    fn destroy_fence(&self, fence: GpuFence);

    /// Block until a fence is signaled.
    fn wait_fence(&self, fence: GpuFence) -> Result<(), GraphicsError>;

    /// Check if a fence is signaled (non-blocking).
    fn is_fence_signaled(&self, fence: GpuFence) -> bool;

    /// Return a fence to the unsignaled state.
    fn reset_fence(&self, fence: GpuFence) -> Result<(), GraphicsError>;

    /// Create a binary semaphore.
    fn create_semaphore(&self) -> Result<GpuSemaphore, GraphicsError>;

    /// Destroy a semaphore.
    fn destroy_semaphore(&self, semaphore: GpuSemaphore);

    /// Create a swapchain and its images.
    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<(GpuSwapchain, Vec<GpuImage>), GraphicsError>;

    /// Destroy a swapchain; its images are destroyed with it.
    fn destroy_swapchain(&self, swapchain: GpuSwapchain);

    /// Acquire the next presentable image, signaling `signal` when it is ready.
    fn acquire_next_image(
        &self,
        swapchain: GpuSwapchain,
        signal: GpuSemaphore,
    ) -> Result<u32, GraphicsError>;

    /// Map a buffer for host access.
    fn map_buffer(&self, buffer: GpuBuffer) -> Result<(), GraphicsError>;

    /// Unmap a previously mapped buffer.
    fn unmap_buffer(&self, buffer: GpuBuffer) -> Result<(), GraphicsError>;

    /// Write bytes into a mapped buffer.
    fn write_mapped(&self, buffer: GpuBuffer, offset: u64, data: &[u8])
    -> Result<(), GraphicsError>;

    /// Read bytes from a mapped buffer.
    fn read_mapped(&self, buffer: GpuBuffer, offset: u64, size: u64)
    -> Result<Vec<u8>, GraphicsError>;

    /// Submit work to a queue.
    fn submit(&self, submission: &Submission<'_>) -> Result<(), GraphicsError>;

    /// Present a swapchain image.
    fn present(&self, request: &PresentRequest<'_>) -> Result<(), GraphicsError>;
}

/// Which backend a device should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Pick the best compiled-in backend.
    #[default]
    Auto,
    /// The in-memory dummy backend.
    Dummy,
}

/// Selects and creates the appropriate backend based on available features.
pub fn create_backend(backend: BackendType) -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    match backend {
        BackendType::Auto | BackendType::Dummy => {
            log::info!("Using dummy backend");
            Ok(Arc::new(dummy::DummyBackend::new()))
        }
    }
}
