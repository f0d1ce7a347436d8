//! Buffer types and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Buffer can be used as an indirect buffer.
        const INDIRECT = 1 << 4;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 5;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 6;
        /// Buffer is mappable for CPU reads.
        const MAP_READ = 1 << 7;
        /// Buffer is mappable for CPU writes.
        const MAP_WRITE = 1 << 8;
    }
}

impl BufferUsage {
    /// Returns true if the buffer can be mapped for host access.
    pub fn is_mappable(&self) -> bool {
        self.intersects(Self::MAP_READ | Self::MAP_WRITE)
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Byte range of a buffer addressed by a view or use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRange {
    /// Offset in bytes.
    pub offset: u64,
    /// Size in bytes; `None` means to the end of the buffer.
    pub size: Option<u64>,
}

impl BufferRange {
    /// The whole buffer.
    pub const WHOLE: Self = Self {
        offset: 0,
        size: None,
    };

    /// Create a bounded range.
    pub fn new(offset: u64, size: u64) -> Self {
        Self {
            offset,
            size: Some(size),
        }
    }

    /// One past the last byte addressed, given the buffer's size.
    ///
    /// Returns `None` if the bounded end overflows.
    pub fn end(&self, buffer_size: u64) -> Option<u64> {
        match self.size {
            Some(size) => self.offset.checked_add(size),
            None => Some(buffer_size),
        }
    }
}

impl Default for BufferRange {
    fn default() -> Self {
        Self::WHOLE
    }
}
