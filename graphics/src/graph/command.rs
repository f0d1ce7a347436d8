//! Command lists recorded by passes.
//!
//! A [`CommandList`] is the recording surface handed to a pass each frame. It
//! stores backend-agnostic [`Command`]s that reference attachments by handle;
//! the backend resolves them when the list is submitted.

use crate::types::{ClearValue, Extent3d, QueueType, RenderArea, SubresourceRange};

use super::attachment::{BufferAttachmentHandle, ImageAttachmentHandle};

// ============================================================================
// Draw and dispatch
// ============================================================================

/// A non-indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawCommand {
    /// Number of vertices to draw.
    pub vertex_count: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
    /// Index of the first vertex.
    pub first_vertex: u32,
    /// Instance ID of the first instance.
    pub first_instance: u32,
}

impl DrawCommand {
    /// Draw `vertex_count` vertices once.
    pub fn new(vertex_count: u32) -> Self {
        Self {
            vertex_count,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }

    /// Set the instance count.
    pub fn with_instance_count(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }

    /// Set the first vertex index.
    pub fn with_first_vertex(mut self, first_vertex: u32) -> Self {
        self.first_vertex = first_vertex;
        self
    }

    /// Set the first instance index.
    pub fn with_first_instance(mut self, first: u32) -> Self {
        self.first_instance = first;
        self
    }
}

/// A compute dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchCommand {
    /// Workgroups along X.
    pub x: u32,
    /// Workgroups along Y.
    pub y: u32,
    /// Workgroups along Z.
    pub z: u32,
}

impl DispatchCommand {
    /// Dispatch an `x * y * z` grid of workgroups.
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

// ============================================================================
// Copy
// ============================================================================

/// A region within a buffer for copy operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferCopyRegion {
    /// Offset in bytes from the start of the source buffer.
    pub src_offset: u64,
    /// Offset in bytes from the start of the destination buffer.
    pub dst_offset: u64,
    /// Number of bytes to copy.
    pub size: u64,
}

impl BufferCopyRegion {
    /// Create a new buffer copy region.
    pub fn new(src_offset: u64, dst_offset: u64, size: u64) -> Self {
        Self {
            src_offset,
            dst_offset,
            size,
        }
    }

    /// Copy `size` bytes from the start of one buffer to the start of another.
    pub fn whole(size: u64) -> Self {
        Self::new(0, 0, size)
    }
}

/// Location within an image for copy operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageCopyLocation {
    /// Mip level to copy from/to.
    pub mip_level: u32,
    /// First array layer.
    pub array_layer: u32,
    /// Texel offset within the mip level.
    pub origin: [u32; 3],
}

impl ImageCopyLocation {
    /// Location at a mip level, origin (0, 0, 0), first layer.
    pub fn mip(mip_level: u32) -> Self {
        Self {
            mip_level,
            ..Default::default()
        }
    }
}

/// Layout of image data inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferImageLayout {
    /// Offset in bytes from the start of the buffer.
    pub offset: u64,
    /// Bytes per row; `None` for tightly packed rows.
    pub bytes_per_row: Option<u32>,
    /// Rows per image; `None` for tightly packed images.
    pub rows_per_image: Option<u32>,
}

/// A copy operation between attachments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CopyCommand {
    /// Buffer to buffer.
    BufferToBuffer {
        src: BufferAttachmentHandle,
        dst: BufferAttachmentHandle,
        regions: Vec<BufferCopyRegion>,
    },
    /// Buffer to image upload.
    BufferToImage {
        src: BufferAttachmentHandle,
        layout: BufferImageLayout,
        dst: ImageAttachmentHandle,
        location: ImageCopyLocation,
        extent: Extent3d,
    },
    /// Image to buffer readback.
    ImageToBuffer {
        src: ImageAttachmentHandle,
        location: ImageCopyLocation,
        dst: BufferAttachmentHandle,
        layout: BufferImageLayout,
        extent: Extent3d,
    },
    /// Image to image.
    ImageToImage {
        src: ImageAttachmentHandle,
        src_location: ImageCopyLocation,
        dst: ImageAttachmentHandle,
        dst_location: ImageCopyLocation,
        extent: Extent3d,
    },
}

impl CopyCommand {
    /// Copy whole-buffer contents.
    pub fn buffer_to_buffer(
        src: BufferAttachmentHandle,
        dst: BufferAttachmentHandle,
        size: u64,
    ) -> Self {
        Self::BufferToBuffer {
            src,
            dst,
            regions: vec![BufferCopyRegion::whole(size)],
        }
    }

    /// Source attachment of the copy.
    pub fn source(&self) -> CopyEndpoint {
        match self {
            Self::BufferToBuffer { src, .. } | Self::BufferToImage { src, .. } => {
                CopyEndpoint::Buffer(*src)
            }
            Self::ImageToBuffer { src, .. } | Self::ImageToImage { src, .. } => {
                CopyEndpoint::Image(*src)
            }
        }
    }

    /// Destination attachment of the copy.
    pub fn destination(&self) -> CopyEndpoint {
        match self {
            Self::BufferToBuffer { dst, .. } | Self::ImageToBuffer { dst, .. } => {
                CopyEndpoint::Buffer(*dst)
            }
            Self::BufferToImage { dst, .. } | Self::ImageToImage { dst, .. } => {
                CopyEndpoint::Image(*dst)
            }
        }
    }
}

/// One side of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyEndpoint {
    /// An image attachment.
    Image(ImageAttachmentHandle),
    /// A buffer attachment.
    Buffer(BufferAttachmentHandle),
}

// ============================================================================
// Clear
// ============================================================================

/// A clear operation outside of a target load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearCommand {
    /// Clear an image subresource range.
    Image {
        attachment: ImageAttachmentHandle,
        value: ClearValue,
        range: SubresourceRange,
    },
    /// Fill a buffer range with a repeated 32-bit value.
    Buffer {
        attachment: BufferAttachmentHandle,
        offset: u64,
        size: Option<u64>,
        value: u32,
    },
}

// ============================================================================
// Command list
// ============================================================================

/// A recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Set the render area for subsequent draws.
    SetRenderArea(RenderArea),
    /// Draw.
    Draw(DrawCommand),
    /// Compute dispatch.
    Dispatch(DispatchCommand),
    /// Copy.
    Copy(CopyCommand),
    /// Clear.
    Clear(ClearCommand),
}

impl From<DrawCommand> for Command {
    fn from(command: DrawCommand) -> Self {
        Self::Draw(command)
    }
}

impl From<DispatchCommand> for Command {
    fn from(command: DispatchCommand) -> Self {
        Self::Dispatch(command)
    }
}

impl From<CopyCommand> for Command {
    fn from(command: CopyCommand) -> Self {
        Self::Copy(command)
    }
}

impl From<ClearCommand> for Command {
    fn from(command: ClearCommand) -> Self {
        Self::Clear(command)
    }
}

/// A list of commands for one queue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandList {
    label: Option<String>,
    queue: QueueType,
    commands: Vec<Command>,
}

impl CommandList {
    /// Create an empty command list for `queue`.
    pub fn new(queue: QueueType) -> Self {
        Self {
            label: None,
            queue,
            commands: Vec::new(),
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Queue the list is recorded for.
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// Debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn set_label(&mut self, label: &str) {
        match &mut self.label {
            Some(existing) => {
                existing.clear();
                existing.push_str(label);
            }
            None => self.label = Some(label.to_string()),
        }
    }

    /// Record a draw, dispatch, copy or clear.
    pub fn submit(&mut self, command: impl Into<Command>) {
        self.commands.push(command.into());
    }

    /// Record a render area change.
    pub fn set_render_area(&mut self, area: RenderArea) {
        self.commands.push(Command::SetRenderArea(area));
    }

    /// Recorded commands, in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop all commands, keeping the allocation.
    pub fn reset(&mut self) {
        self.commands.clear();
    }

    pub(crate) fn reset_for(&mut self, queue: QueueType) {
        self.queue = queue;
        self.commands.clear();
    }

    pub(crate) fn extend_from(&mut self, other: &CommandList) {
        self.commands.extend(other.commands.iter().cloned());
    }
}
