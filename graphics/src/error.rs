//! Graphics error types.

use thiserror::Error;

/// Errors that can occur in the graphics system.
///
/// Swapchain invalidation is the only recoverable condition; the frame
/// scheduler reports it to the caller instead of failing the frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// A requested feature is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// Out of host memory.
    #[error("out of host memory")]
    OutOfMemory,
    /// Out of GPU memory.
    #[error("out of device memory")]
    OutOfDeviceMemory,
    /// The allocator could not satisfy a request.
    #[error("allocation failed: {0}")]
    AllocationFailed(String),
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A handle did not resolve to a live object.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    /// The swapchain no longer matches its surface and must be recreated.
    #[error("swapchain out of date, needs recreation")]
    SwapchainOutOfDate,
    /// The surface backing the swapchain was lost.
    #[error("swapchain surface lost, needs recreation")]
    SwapchainSurfaceLost,
    /// An unclassified backend error.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl GraphicsError {
    /// Whether this error means swapchain-derived state must be rebuilt.
    pub fn is_swapchain_invalidated(&self) -> bool {
        matches!(self, Self::SwapchainOutOfDate | Self::SwapchainSurfaceLost)
    }

    /// Whether this is a resource exhaustion error.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(
            self,
            Self::OutOfMemory | Self::OutOfDeviceMemory | Self::AllocationFailed(_)
        )
    }

    /// Whether the device can no longer be used after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DeviceLost | Self::InitializationFailed(_))
    }
}
