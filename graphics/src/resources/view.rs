//! Image and buffer views.

use crate::backend::{GpuBufferView, GpuImageView};
use crate::types::{BufferRange, ImageFormat, SubresourceRange};

use super::{BufferHandle, ImageHandle};

/// Descriptor for creating an image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageViewDescriptor {
    /// Reinterpreted format; `None` keeps the image's format.
    pub format: Option<ImageFormat>,
    /// Mip levels and array layers covered by the view.
    pub range: SubresourceRange,
}

impl ImageViewDescriptor {
    /// A view of the first mip of the first layer in the image's own format.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reinterpret the image in another format.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the subresource range.
    pub fn with_range(mut self, range: SubresourceRange) -> Self {
        self.range = range;
        self
    }
}

/// A view of an image.
#[derive(Debug)]
pub struct ImageView {
    image: ImageHandle,
    descriptor: ImageViewDescriptor,
    format: ImageFormat,
    raw: GpuImageView,
}

impl ImageView {
    pub(crate) fn new(
        image: ImageHandle,
        descriptor: ImageViewDescriptor,
        format: ImageFormat,
        raw: GpuImageView,
    ) -> Self {
        Self {
            image,
            descriptor,
            format,
            raw,
        }
    }

    /// The viewed image.
    pub fn image(&self) -> ImageHandle {
        self.image
    }

    /// The descriptor the view was created with.
    pub fn descriptor(&self) -> &ImageViewDescriptor {
        &self.descriptor
    }

    /// Effective format of the view.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Backend object id.
    pub fn raw(&self) -> GpuImageView {
        self.raw
    }
}

/// Descriptor for creating a buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferViewDescriptor {
    /// Texel format for formatted views; `None` for raw views.
    pub format: Option<ImageFormat>,
    /// Byte range covered by the view.
    pub range: BufferRange,
}

impl BufferViewDescriptor {
    /// A raw view of the whole buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the texel format.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the byte range.
    pub fn with_range(mut self, range: BufferRange) -> Self {
        self.range = range;
        self
    }
}

/// A view of a buffer.
#[derive(Debug)]
pub struct BufferView {
    buffer: BufferHandle,
    descriptor: BufferViewDescriptor,
    raw: GpuBufferView,
}

impl BufferView {
    pub(crate) fn new(
        buffer: BufferHandle,
        descriptor: BufferViewDescriptor,
        raw: GpuBufferView,
    ) -> Self {
        Self {
            buffer,
            descriptor,
            raw,
        }
    }

    /// The viewed buffer.
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// The descriptor the view was created with.
    pub fn descriptor(&self) -> &BufferViewDescriptor {
        &self.descriptor
    }

    /// Backend object id.
    pub fn raw(&self) -> GpuBufferView {
        self.raw
    }
}
