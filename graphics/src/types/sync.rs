//! Queue, pipeline stage and access types used for synchronization.

use bitflags::bitflags;

/// Hardware queue family a pass is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum QueueType {
    /// Graphics queue; also accepts compute and transfer work.
    #[default]
    Graphics,
    /// Asynchronous compute queue.
    Compute,
    /// Dedicated transfer queue.
    Transfer,
}

impl QueueType {
    /// Every queue type, in submission-slot order.
    pub const ALL: [QueueType; 3] = [Self::Graphics, Self::Compute, Self::Transfer];

    /// Number of queue types.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index for per-queue arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Graphics => 0,
            Self::Compute => 1,
            Self::Transfer => 2,
        }
    }

    /// Short name for logging.
    pub fn name(self) -> &'static str {
        match self {
            Self::Graphics => "graphics",
            Self::Compute => "compute",
            Self::Transfer => "transfer",
        }
    }
}

bitflags! {
    /// Pipeline stages in which a use happens.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineStages: u32 {
        /// Start of the pipeline.
        const TOP_OF_PIPE = 1 << 0;
        /// Indirect argument fetch.
        const DRAW_INDIRECT = 1 << 1;
        /// Vertex and index fetch.
        const VERTEX_INPUT = 1 << 2;
        /// Vertex shader.
        const VERTEX_SHADER = 1 << 3;
        /// Fragment shader.
        const FRAGMENT_SHADER = 1 << 4;
        /// Early depth/stencil tests.
        const EARLY_FRAGMENT_TESTS = 1 << 5;
        /// Late depth/stencil tests.
        const LATE_FRAGMENT_TESTS = 1 << 6;
        /// Color attachment output.
        const COLOR_ATTACHMENT_OUTPUT = 1 << 7;
        /// Compute shader.
        const COMPUTE_SHADER = 1 << 8;
        /// Copy and clear operations.
        const TRANSFER = 1 << 9;
        /// End of the pipeline.
        const BOTTOM_OF_PIPE = 1 << 10;

        /// All shader stages that can read resources.
        const ALL_SHADERS = Self::VERTEX_SHADER.bits()
            | Self::FRAGMENT_SHADER.bits()
            | Self::COMPUTE_SHADER.bits();
        /// Both depth test stages.
        const FRAGMENT_TESTS = Self::EARLY_FRAGMENT_TESTS.bits()
            | Self::LATE_FRAGMENT_TESTS.bits();
    }
}

/// Direction of a resource use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    /// The use only reads.
    #[default]
    Read,
    /// The use only writes.
    Write,
    /// The use reads then writes.
    ReadWrite,
}

impl Access {
    /// Returns true if the use reads the resource.
    pub fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Returns true if the use writes the resource.
    pub fn is_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Image layout an image must be in for a use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    /// Contents undefined; used before the first use in a frame.
    #[default]
    Undefined,
    /// General layout for storage access.
    General,
    /// Color render target.
    ColorAttachment,
    /// Writable depth/stencil target.
    DepthStencilAttachment,
    /// Read-only depth/stencil.
    DepthStencilReadOnly,
    /// Sampled in shaders.
    ShaderReadOnly,
    /// Source of a copy.
    TransferSrc,
    /// Destination of a copy.
    TransferDst,
    /// Ready for presentation.
    Present,
}
