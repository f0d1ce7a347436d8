//! Swapchain resource.

use crate::backend::GpuSwapchain;
use crate::types::{Extent3d, ImageFormat, ImageUsage};

use super::ImageHandle;

/// Descriptor for creating a swapchain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwapchainDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Size of the presentable images.
    pub extent: Extent3d,
    /// Format of the presentable images.
    pub format: ImageFormat,
    /// Usage of the presentable images; always includes `PRESENT`.
    pub usage: ImageUsage,
    /// Number of images in the chain.
    pub image_count: u32,
}

impl SwapchainDescriptor {
    /// Create a triple-buffered swapchain descriptor.
    pub fn new(width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            label: None,
            extent: Extent3d::new_2d(width, height),
            format,
            usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::PRESENT,
            image_count: 3,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the image count.
    pub fn with_image_count(mut self, count: u32) -> Self {
        self.image_count = count;
        self
    }

    /// Add usage flags to the presentable images.
    pub fn with_usage(mut self, usage: ImageUsage) -> Self {
        self.usage |= usage;
        self
    }
}

/// A chain of presentable images.
///
/// The images are device images whose records point back at the swapchain.
/// Recreating the swapchain replaces every image handle.
#[derive(Debug)]
pub struct Swapchain {
    descriptor: SwapchainDescriptor,
    raw: GpuSwapchain,
    images: Vec<ImageHandle>,
}

impl Swapchain {
    pub(crate) fn new(descriptor: SwapchainDescriptor, raw: GpuSwapchain) -> Self {
        Self {
            descriptor,
            raw,
            images: Vec::new(),
        }
    }

    /// The descriptor of the current chain.
    pub fn descriptor(&self) -> &SwapchainDescriptor {
        &self.descriptor
    }

    /// Backend object id.
    pub fn raw(&self) -> GpuSwapchain {
        self.raw
    }

    /// Size of the presentable images.
    pub fn extent(&self) -> Extent3d {
        self.descriptor.extent
    }

    /// Format of the presentable images.
    pub fn format(&self) -> ImageFormat {
        self.descriptor.format
    }

    /// Presentable images, indexed by acquire index.
    pub fn images(&self) -> &[ImageHandle] {
        &self.images
    }

    /// Image at an acquire index.
    pub fn image(&self, index: u32) -> Option<ImageHandle> {
        self.images.get(index as usize).copied()
    }

    pub(crate) fn replace(
        &mut self,
        descriptor: SwapchainDescriptor,
        raw: GpuSwapchain,
        images: Vec<ImageHandle>,
    ) -> Vec<ImageHandle> {
        self.descriptor = descriptor;
        self.raw = raw;
        std::mem::replace(&mut self.images, images)
    }

    pub(crate) fn set_images(&mut self, images: Vec<ImageHandle>) {
        self.images = images;
    }
}
