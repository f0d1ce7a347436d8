//! GPU buffer resource.

use crate::backend::GpuBuffer;
use crate::types::{BufferDescriptor, BufferUsage};

/// A GPU buffer resource.
///
/// Buffers are created by [`Device::create_buffer`](crate::Device::create_buffer).
/// The record tracks whether the buffer is currently mapped for host access.
pub struct Buffer {
    descriptor: BufferDescriptor,
    raw: GpuBuffer,
    mapped: bool,
}

impl Buffer {
    pub(crate) fn new(descriptor: BufferDescriptor, raw: GpuBuffer) -> Self {
        Self {
            descriptor,
            raw,
            mapped: false,
        }
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Backend object id.
    pub fn raw(&self) -> GpuBuffer {
        self.raw
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the usage flags.
    pub fn usage(&self) -> BufferUsage {
        self.descriptor.usage
    }

    /// Returns true while the buffer is mapped.
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub(crate) fn set_mapped(&mut self, mapped: bool) {
        self.mapped = mapped;
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("raw", &self.raw)
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("mapped", &self.mapped)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_debug() {
        let buffer = Buffer::new(
            BufferDescriptor::new(1024, BufferUsage::VERTEX),
            GpuBuffer(3),
        );
        let debug = format!("{:?}", buffer);
        assert!(debug.contains("Buffer"));
        assert!(debug.contains("1024"));
        assert!(!buffer.is_mapped());
    }
}
