//! Attachment use declarations.
//!
//! A use kind names what a pass does with an attachment. From the kind the
//! graph derives the usage flags the resource needs, the pipeline stages the
//! use happens in and, for images, the layout the image must be in.

use crate::types::{
    Access, BufferRange, BufferUsage, ImageFormat, ImageLayout, ImageUsage, PipelineStages,
    QueueType, SubresourceRange,
};

use super::target::{LoadOp, StoreOp};

/// How an image attachment is used within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageUseKind {
    /// Color render target.
    RenderTarget,
    /// Depth/stencil target.
    DepthStencil,
    /// Sampled in a shader.
    ShaderResource,
    /// Read/write as storage image.
    Storage,
    /// Source of a copy.
    CopySource,
    /// Destination of a copy or clear.
    CopyDestination,
}

impl ImageUseKind {
    /// Usage flag the image needs for this kind of use.
    pub fn required_usage(self) -> ImageUsage {
        match self {
            Self::RenderTarget => ImageUsage::COLOR_ATTACHMENT,
            Self::DepthStencil => ImageUsage::DEPTH_STENCIL_ATTACHMENT,
            Self::ShaderResource => ImageUsage::SAMPLED,
            Self::Storage => ImageUsage::STORAGE,
            Self::CopySource => ImageUsage::COPY_SRC,
            Self::CopyDestination => ImageUsage::COPY_DST,
        }
    }

    /// Stages the use happens in on the given queue.
    pub fn default_stages(self, queue: QueueType) -> PipelineStages {
        match (self, queue) {
            (Self::RenderTarget, _) => PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            (Self::DepthStencil, _) => PipelineStages::FRAGMENT_TESTS,
            (Self::ShaderResource | Self::Storage, QueueType::Graphics) => {
                PipelineStages::FRAGMENT_SHADER
            }
            (Self::ShaderResource | Self::Storage, _) => PipelineStages::COMPUTE_SHADER,
            (Self::CopySource | Self::CopyDestination, _) => PipelineStages::TRANSFER,
        }
    }

    /// Layout the image must be in for this use.
    pub fn layout(self, access: Access) -> ImageLayout {
        match self {
            Self::RenderTarget => ImageLayout::ColorAttachment,
            Self::DepthStencil if access.is_write() => ImageLayout::DepthStencilAttachment,
            Self::DepthStencil => ImageLayout::DepthStencilReadOnly,
            Self::ShaderResource => ImageLayout::ShaderReadOnly,
            Self::Storage => ImageLayout::General,
            Self::CopySource => ImageLayout::TransferSrc,
            Self::CopyDestination => ImageLayout::TransferDst,
        }
    }

    /// Whether `access` is meaningful for this kind of use.
    pub fn allows(self, access: Access) -> bool {
        match self {
            Self::ShaderResource | Self::CopySource => access == Access::Read,
            Self::CopyDestination => access == Access::Write,
            Self::RenderTarget => access.is_write(),
            Self::DepthStencil | Self::Storage => true,
        }
    }

    /// Whether a pass on `queue` can perform this use.
    pub fn supported_on(self, queue: QueueType) -> bool {
        match queue {
            QueueType::Graphics => true,
            QueueType::Compute => !matches!(self, Self::RenderTarget | Self::DepthStencil),
            QueueType::Transfer => matches!(self, Self::CopySource | Self::CopyDestination),
        }
    }

    /// Returns true for render and depth targets.
    pub fn is_target(self) -> bool {
        matches!(self, Self::RenderTarget | Self::DepthStencil)
    }
}

/// How a buffer attachment is used within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUseKind {
    /// Read as vertex buffer data.
    Vertex,
    /// Read as index buffer data.
    Index,
    /// Read as uniform buffer.
    Uniform,
    /// Storage buffer access.
    Storage,
    /// Read as indirect draw or dispatch arguments.
    Indirect,
    /// Source of a copy.
    CopySource,
    /// Destination of a copy or clear.
    CopyDestination,
}

impl BufferUseKind {
    /// Usage flag the buffer needs for this kind of use.
    pub fn required_usage(self) -> BufferUsage {
        match self {
            Self::Vertex => BufferUsage::VERTEX,
            Self::Index => BufferUsage::INDEX,
            Self::Uniform => BufferUsage::UNIFORM,
            Self::Storage => BufferUsage::STORAGE,
            Self::Indirect => BufferUsage::INDIRECT,
            Self::CopySource => BufferUsage::COPY_SRC,
            Self::CopyDestination => BufferUsage::COPY_DST,
        }
    }

    /// Stages the use happens in on the given queue.
    pub fn default_stages(self, queue: QueueType) -> PipelineStages {
        match (self, queue) {
            (Self::Vertex | Self::Index, _) => PipelineStages::VERTEX_INPUT,
            (Self::Indirect, _) => PipelineStages::DRAW_INDIRECT,
            (Self::Uniform | Self::Storage, QueueType::Graphics) => {
                PipelineStages::VERTEX_SHADER | PipelineStages::FRAGMENT_SHADER
            }
            (Self::Uniform | Self::Storage, _) => PipelineStages::COMPUTE_SHADER,
            (Self::CopySource | Self::CopyDestination, _) => PipelineStages::TRANSFER,
        }
    }

    /// Whether `access` is meaningful for this kind of use.
    pub fn allows(self, access: Access) -> bool {
        match self {
            Self::Vertex | Self::Index | Self::Uniform | Self::Indirect | Self::CopySource => {
                access == Access::Read
            }
            Self::CopyDestination => access == Access::Write,
            Self::Storage => true,
        }
    }

    /// Whether a pass on `queue` can perform this use.
    pub fn supported_on(self, queue: QueueType) -> bool {
        match queue {
            QueueType::Graphics => true,
            QueueType::Compute => !matches!(self, Self::Vertex | Self::Index),
            QueueType::Transfer => matches!(self, Self::CopySource | Self::CopyDestination),
        }
    }
}

/// Declaration of one image use by a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageUse {
    /// What the pass does with the image.
    pub kind: ImageUseKind,
    /// Read/write direction.
    pub access: Access,
    /// Stages; `None` derives them from the kind and the pass queue.
    pub stages: Option<PipelineStages>,
    /// Reinterpreted view format; `None` keeps the attachment's format.
    pub format: Option<ImageFormat>,
    /// Mip levels and array layers touched.
    pub range: SubresourceRange,
    /// Load operation for targets.
    pub load_op: LoadOp,
    /// Store operation for targets.
    pub store_op: StoreOp,
}

impl ImageUse {
    /// Declare a use of the given kind.
    pub fn new(kind: ImageUseKind, access: Access) -> Self {
        Self {
            kind,
            access,
            stages: None,
            format: None,
            range: SubresourceRange::BASE,
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
        }
    }

    /// Color render target written by the pass.
    pub fn render_target() -> Self {
        Self::new(ImageUseKind::RenderTarget, Access::Write)
    }

    /// Depth/stencil target written by the pass.
    pub fn depth_stencil() -> Self {
        Self::new(ImageUseKind::DepthStencil, Access::ReadWrite)
    }

    /// Image sampled by the pass.
    pub fn shader_resource() -> Self {
        Self::new(ImageUseKind::ShaderResource, Access::Read)
    }

    /// Override the stages.
    pub fn with_stages(mut self, stages: PipelineStages) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Reinterpret the attachment in another format.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the subresource range.
    pub fn with_range(mut self, range: SubresourceRange) -> Self {
        self.range = range;
        self
    }

    /// Set the load operation.
    pub fn with_load_op(mut self, load_op: LoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    /// Set the store operation.
    pub fn with_store_op(mut self, store_op: StoreOp) -> Self {
        self.store_op = store_op;
        self
    }
}

/// Declaration of one buffer use by a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferUse {
    /// What the pass does with the buffer.
    pub kind: BufferUseKind,
    /// Read/write direction.
    pub access: Access,
    /// Stages; `None` derives them from the kind and the pass queue.
    pub stages: Option<PipelineStages>,
    /// Byte range touched.
    pub range: BufferRange,
}

impl BufferUse {
    /// Declare a use of the given kind.
    pub fn new(kind: BufferUseKind, access: Access) -> Self {
        Self {
            kind,
            access,
            stages: None,
            range: BufferRange::WHOLE,
        }
    }

    /// Override the stages.
    pub fn with_stages(mut self, stages: PipelineStages) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Set the byte range.
    pub fn with_range(mut self, range: BufferRange) -> Self {
        self.range = range;
        self
    }
}
