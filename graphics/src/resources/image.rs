//! GPU image resource.

use crate::backend::GpuImage;
use crate::types::{Extent3d, ImageDescriptor, ImageFormat, ImageUsage};

use super::SwapchainHandle;

/// A GPU image resource.
///
/// Images are created by [`Device::create_image`](crate::Device::create_image)
/// or owned by a swapchain, in which case [`Image::swapchain`] is set and the
/// image cannot be destroyed on its own.
pub struct Image {
    descriptor: ImageDescriptor,
    raw: GpuImage,
    swapchain: Option<SwapchainHandle>,
}

impl Image {
    pub(crate) fn new(descriptor: ImageDescriptor, raw: GpuImage) -> Self {
        Self {
            descriptor,
            raw,
            swapchain: None,
        }
    }

    pub(crate) fn for_swapchain(
        descriptor: ImageDescriptor,
        raw: GpuImage,
        swapchain: SwapchainHandle,
    ) -> Self {
        Self {
            descriptor,
            raw,
            swapchain: Some(swapchain),
        }
    }

    /// Get the image descriptor.
    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    /// Backend object id.
    pub fn raw(&self) -> GpuImage {
        self.raw
    }

    /// Get the image size.
    pub fn size(&self) -> Extent3d {
        self.descriptor.size
    }

    /// Get the image format.
    pub fn format(&self) -> ImageFormat {
        self.descriptor.format
    }

    /// Get the usage flags.
    pub fn usage(&self) -> ImageUsage {
        self.descriptor.usage
    }

    /// Owning swapchain, for presentable images.
    pub fn swapchain(&self) -> Option<SwapchainHandle> {
        self.swapchain
    }

    /// Get the image label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("raw", &self.raw)
            .field("size", &self.descriptor.size)
            .field("format", &self.descriptor.format)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Image: Send, Sync);
