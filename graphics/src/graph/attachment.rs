//! Attachment registry.
//!
//! Attachments are the named, frame-scoped resources a render graph reasons
//! about. Each one owns a use list: every declaration of a pass touching the
//! attachment becomes a node in the registry's use pool, appended in
//! declaration order. The compiler walks these lists to derive dependencies
//! and lifetimes.
//!
//! Aggregated properties (usage flags, mip and layer extents) always equal
//! the union over the live uses. Appending widens them incrementally;
//! removing a use rescans the remaining list.

use std::collections::HashMap;

use ember_core::{Handle, HandlePool};

use crate::error::GraphicsError;
use crate::resources::{Buffer, BufferHandle, Image, ImageHandle, Swapchain, SwapchainHandle};
use crate::types::{
    Access, BufferDescriptor, BufferRange, BufferUsage, Extent3d, ImageDescriptor,
    ImageDimension, ImageFormat, ImageLayout, ImageUsage, PipelineStages, QueueType,
    SubresourceRange,
};

use super::PassHandle;
use super::chain::{UseChain, UseIter, UseLinks, UseNode};
use super::target::{LoadOp, StoreOp};
use super::usage::{BufferUse, BufferUseKind, ImageUse, ImageUseKind};

/// Handle to an image attachment.
pub type ImageAttachmentHandle = Handle<ImageAttachment>;
/// Handle to a buffer attachment.
pub type BufferAttachmentHandle = Handle<BufferAttachment>;
/// Handle to one image use.
pub type ImageUseHandle = Handle<ImagePassAttachment>;
/// Handle to one buffer use.
pub type BufferUseHandle = Handle<BufferPassAttachment>;

/// Where an attachment's resource comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentLifetime {
    /// An existing device resource owned by the caller.
    Imported,
    /// A frame-local resource described by the graph.
    Transient,
    /// The current image of a swapchain.
    Swapchain,
}

/// Either kind of attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentId {
    /// An image attachment.
    Image(ImageAttachmentHandle),
    /// A buffer attachment.
    Buffer(BufferAttachmentHandle),
}

impl From<ImageAttachmentHandle> for AttachmentId {
    fn from(handle: ImageAttachmentHandle) -> Self {
        Self::Image(handle)
    }
}

impl From<BufferAttachmentHandle> for AttachmentId {
    fn from(handle: BufferAttachmentHandle) -> Self {
        Self::Buffer(handle)
    }
}

// ============================================================================
// Image attachments
// ============================================================================

/// Parameters of a transient image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransientImageDescriptor {
    /// Texel format.
    pub format: ImageFormat,
    /// Size of mip level 0.
    pub size: Extent3d,
    /// Samples per texel.
    pub sample_count: u32,
}

impl TransientImageDescriptor {
    /// A single-sampled 2D image.
    pub fn new_2d(width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            format,
            size: Extent3d::new_2d(width, height),
            sample_count: 1,
        }
    }

    /// Set the sample count.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageSource {
    Imported(ImageHandle),
    Transient,
    Swapchain(SwapchainHandle),
}

/// A named image participating in the graph.
#[derive(Debug)]
pub struct ImageAttachment {
    name: String,
    source: ImageSource,
    format: ImageFormat,
    size: Extent3d,
    sample_count: u32,
    allowed_usage: ImageUsage,
    max_mip_levels: u32,
    max_array_layers: u32,
    usage: ImageUsage,
    mip_level_count: u32,
    array_layer_count: u32,
    resource: Option<ImageHandle>,
    uses: UseChain<ImagePassAttachment>,
}

impl ImageAttachment {
    /// Attachment name, unique within the registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifetime classification.
    pub fn lifetime(&self) -> AttachmentLifetime {
        match self.source {
            ImageSource::Imported(_) => AttachmentLifetime::Imported,
            ImageSource::Transient => AttachmentLifetime::Transient,
            ImageSource::Swapchain(_) => AttachmentLifetime::Swapchain,
        }
    }

    /// Returns true for transient attachments.
    pub fn is_transient(&self) -> bool {
        self.source == ImageSource::Transient
    }

    /// Swapchain backing this attachment, if any.
    pub fn swapchain(&self) -> Option<SwapchainHandle> {
        match self.source {
            ImageSource::Swapchain(swapchain) => Some(swapchain),
            _ => None,
        }
    }

    /// Attachment format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Size of mip level 0.
    pub fn size(&self) -> Extent3d {
        self.size
    }

    /// Samples per texel.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Union of the usage flags required by every use.
    pub fn usage(&self) -> ImageUsage {
        self.usage
    }

    /// Number of mip levels required by the uses.
    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }

    /// Number of array layers required by the uses.
    pub fn array_layer_count(&self) -> u32 {
        self.array_layer_count
    }

    /// Device image bound for the current frame.
    ///
    /// Imported attachments are bound at import, swapchain attachments when
    /// the scheduler acquires an image, and transients only if the caller
    /// binds an allocation.
    pub fn resource(&self) -> Option<ImageHandle> {
        self.resource
    }

    /// Number of declared uses.
    pub fn use_count(&self) -> u32 {
        self.uses.len()
    }

    /// First declared use.
    pub fn first_use(&self) -> Option<ImageUseHandle> {
        Some(self.uses.first()).filter(|handle| !handle.is_invalid())
    }

    /// Last declared use.
    pub fn last_use(&self) -> Option<ImageUseHandle> {
        Some(self.uses.last()).filter(|handle| !handle.is_invalid())
    }

    /// Descriptor covering every use, suitable for allocating the image.
    pub fn descriptor(&self) -> ImageDescriptor {
        ImageDescriptor {
            label: Some(self.name.clone()),
            dimension: if self.size.depth > 1 {
                ImageDimension::D3
            } else {
                ImageDimension::D2
            },
            size: self.size,
            mip_level_count: self.mip_level_count,
            array_layer_count: self.array_layer_count,
            sample_count: self.sample_count,
            format: self.format,
            usage: self.usage,
        }
    }

    fn reset_aggregates(&mut self) {
        self.usage = ImageUsage::empty();
        self.mip_level_count = 1;
        self.array_layer_count = 1;
    }

    fn widen(&mut self, node: &ImagePassAttachment) {
        self.usage |= node.kind.required_usage();
        if let Some(end) = node.range.mip_end() {
            self.mip_level_count = self.mip_level_count.max(end);
        }
        if let Some(end) = node.range.layer_end() {
            self.array_layer_count = self.array_layer_count.max(end);
        }
    }
}

/// One use of an image attachment by one pass.
#[derive(Debug)]
pub struct ImagePassAttachment {
    pass: PassHandle,
    attachment: ImageAttachmentHandle,
    kind: ImageUseKind,
    access: Access,
    stages: PipelineStages,
    format: ImageFormat,
    range: SubresourceRange,
    load_op: LoadOp,
    store_op: StoreOp,
    links: UseLinks<ImagePassAttachment>,
}

impl ImagePassAttachment {
    /// Pass declaring the use.
    pub fn pass(&self) -> PassHandle {
        self.pass
    }

    /// Attachment being used.
    pub fn attachment(&self) -> ImageAttachmentHandle {
        self.attachment
    }

    /// Use classification.
    pub fn kind(&self) -> ImageUseKind {
        self.kind
    }

    /// Read/write direction.
    pub fn access(&self) -> Access {
        self.access
    }

    /// Stages the use happens in.
    pub fn stages(&self) -> PipelineStages {
        self.stages
    }

    /// View format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Subresources touched.
    pub fn range(&self) -> SubresourceRange {
        self.range
    }

    /// Load operation for targets.
    pub fn load_op(&self) -> LoadOp {
        self.load_op
    }

    /// Store operation for targets.
    pub fn store_op(&self) -> StoreOp {
        self.store_op
    }

    /// Layout the image must be in for this use.
    pub fn layout(&self) -> ImageLayout {
        self.kind.layout(self.access)
    }

    /// Previous use of the same attachment.
    pub fn prev(&self) -> Option<ImageUseHandle> {
        Some(self.links.prev).filter(|handle| !handle.is_invalid())
    }

    /// Next use of the same attachment.
    pub fn next(&self) -> Option<ImageUseHandle> {
        Some(self.links.next).filter(|handle| !handle.is_invalid())
    }
}

impl UseNode for ImagePassAttachment {
    fn links(&self) -> &UseLinks<Self> {
        &self.links
    }

    fn links_mut(&mut self) -> &mut UseLinks<Self> {
        &mut self.links
    }
}

// ============================================================================
// Buffer attachments
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferSource {
    Imported(BufferHandle),
    Transient,
}

/// A named buffer participating in the graph.
#[derive(Debug)]
pub struct BufferAttachment {
    name: String,
    source: BufferSource,
    size: u64,
    allowed_usage: BufferUsage,
    usage: BufferUsage,
    resource: Option<BufferHandle>,
    uses: UseChain<BufferPassAttachment>,
}

impl BufferAttachment {
    /// Attachment name, unique within the registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifetime classification.
    pub fn lifetime(&self) -> AttachmentLifetime {
        match self.source {
            BufferSource::Imported(_) => AttachmentLifetime::Imported,
            BufferSource::Transient => AttachmentLifetime::Transient,
        }
    }

    /// Returns true for transient attachments.
    pub fn is_transient(&self) -> bool {
        self.source == BufferSource::Transient
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Union of the usage flags required by every use.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Device buffer bound for the current frame.
    pub fn resource(&self) -> Option<BufferHandle> {
        self.resource
    }

    /// Number of declared uses.
    pub fn use_count(&self) -> u32 {
        self.uses.len()
    }

    /// First declared use.
    pub fn first_use(&self) -> Option<BufferUseHandle> {
        Some(self.uses.first()).filter(|handle| !handle.is_invalid())
    }

    /// Last declared use.
    pub fn last_use(&self) -> Option<BufferUseHandle> {
        Some(self.uses.last()).filter(|handle| !handle.is_invalid())
    }

    /// Descriptor covering every use, suitable for allocating the buffer.
    pub fn descriptor(&self) -> BufferDescriptor {
        BufferDescriptor::new(self.size, self.usage).with_label(self.name.clone())
    }
}

/// One use of a buffer attachment by one pass.
#[derive(Debug)]
pub struct BufferPassAttachment {
    pass: PassHandle,
    attachment: BufferAttachmentHandle,
    kind: BufferUseKind,
    access: Access,
    stages: PipelineStages,
    range: BufferRange,
    links: UseLinks<BufferPassAttachment>,
}

impl BufferPassAttachment {
    /// Pass declaring the use.
    pub fn pass(&self) -> PassHandle {
        self.pass
    }

    /// Attachment being used.
    pub fn attachment(&self) -> BufferAttachmentHandle {
        self.attachment
    }

    /// Use classification.
    pub fn kind(&self) -> BufferUseKind {
        self.kind
    }

    /// Read/write direction.
    pub fn access(&self) -> Access {
        self.access
    }

    /// Stages the use happens in.
    pub fn stages(&self) -> PipelineStages {
        self.stages
    }

    /// Byte range touched.
    pub fn range(&self) -> BufferRange {
        self.range
    }

    /// Previous use of the same attachment.
    pub fn prev(&self) -> Option<BufferUseHandle> {
        Some(self.links.prev).filter(|handle| !handle.is_invalid())
    }

    /// Next use of the same attachment.
    pub fn next(&self) -> Option<BufferUseHandle> {
        Some(self.links.next).filter(|handle| !handle.is_invalid())
    }
}

impl UseNode for BufferPassAttachment {
    fn links(&self) -> &UseLinks<Self> {
        &self.links
    }

    fn links_mut(&mut self) -> &mut UseLinks<Self> {
        &mut self.links
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Owns the attachments of one graph build and their use lists.
#[derive(Debug, Default)]
pub struct AttachmentRegistry {
    images: HandlePool<ImageAttachment>,
    buffers: HandlePool<BufferAttachment>,
    image_uses: HandlePool<ImagePassAttachment>,
    buffer_uses: HandlePool<BufferPassAttachment>,
    names: HashMap<String, AttachmentId>,
}

impl AttachmentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn claim_name(&self, name: &str) -> Result<(), GraphicsError> {
        if name.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "attachment name must not be empty".to_string(),
            ));
        }
        if self.names.contains_key(name) {
            return Err(GraphicsError::InvalidParameter(format!(
                "attachment '{name}' already exists"
            )));
        }
        Ok(())
    }

    fn insert_image(
        &mut self,
        name: String,
        source: ImageSource,
        descriptor: &ImageDescriptor,
        allowed_usage: ImageUsage,
        resource: Option<ImageHandle>,
    ) -> ImageAttachmentHandle {
        let handle = self.images.insert(ImageAttachment {
            name: name.clone(),
            source,
            format: descriptor.format,
            size: descriptor.size,
            sample_count: descriptor.sample_count,
            allowed_usage,
            max_mip_levels: descriptor.mip_level_count,
            max_array_layers: descriptor.array_layer_count,
            usage: ImageUsage::empty(),
            mip_level_count: 1,
            array_layer_count: 1,
            resource,
            uses: UseChain::default(),
        });
        log::trace!("Graph: image attachment '{name}' ({source:?}) -> {handle:?}");
        self.names.insert(name, AttachmentId::Image(handle));
        handle
    }

    /// Declare a transient image.
    pub fn create_transient_image(
        &mut self,
        name: impl Into<String>,
        descriptor: TransientImageDescriptor,
    ) -> Result<ImageAttachmentHandle, GraphicsError> {
        let name = name.into();
        self.claim_name(&name)?;
        if descriptor.size.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "transient image '{name}' has an empty extent"
            )));
        }
        if !descriptor.sample_count.is_power_of_two() {
            return Err(GraphicsError::InvalidParameter(format!(
                "transient image '{name}' has invalid sample count {}",
                descriptor.sample_count
            )));
        }
        let full = ImageDescriptor {
            label: None,
            dimension: ImageDimension::D2,
            size: descriptor.size,
            mip_level_count: descriptor.size.full_mip_count(),
            array_layer_count: u32::MAX,
            sample_count: descriptor.sample_count,
            format: descriptor.format,
            usage: ImageUsage::all(),
        };
        Ok(self.insert_image(name, ImageSource::Transient, &full, ImageUsage::all(), None))
    }

    /// Import a device image.
    pub fn import_image(
        &mut self,
        name: impl Into<String>,
        handle: ImageHandle,
        image: &Image,
    ) -> Result<ImageAttachmentHandle, GraphicsError> {
        let name = name.into();
        self.claim_name(&name)?;
        let descriptor = image.descriptor();
        Ok(self.insert_image(
            name,
            ImageSource::Imported(handle),
            descriptor,
            descriptor.usage,
            Some(handle),
        ))
    }

    /// Import a swapchain; the attachment follows its current image.
    pub fn import_swapchain(
        &mut self,
        name: impl Into<String>,
        handle: SwapchainHandle,
        swapchain: &Swapchain,
    ) -> Result<ImageAttachmentHandle, GraphicsError> {
        let name = name.into();
        self.claim_name(&name)?;
        let source = swapchain.descriptor();
        let descriptor = ImageDescriptor::new_2d(
            source.extent.width,
            source.extent.height,
            source.format,
            source.usage,
        );
        Ok(self.insert_image(
            name,
            ImageSource::Swapchain(handle),
            &descriptor,
            source.usage,
            None,
        ))
    }

    fn insert_buffer(
        &mut self,
        name: String,
        source: BufferSource,
        size: u64,
        allowed_usage: BufferUsage,
        resource: Option<BufferHandle>,
    ) -> BufferAttachmentHandle {
        let handle = self.buffers.insert(BufferAttachment {
            name: name.clone(),
            source,
            size,
            allowed_usage,
            usage: BufferUsage::empty(),
            resource,
            uses: UseChain::default(),
        });
        log::trace!("Graph: buffer attachment '{name}' ({source:?}) -> {handle:?}");
        self.names.insert(name, AttachmentId::Buffer(handle));
        handle
    }

    /// Declare a transient buffer of `size` bytes.
    pub fn create_transient_buffer(
        &mut self,
        name: impl Into<String>,
        size: u64,
    ) -> Result<BufferAttachmentHandle, GraphicsError> {
        let name = name.into();
        self.claim_name(&name)?;
        if size == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "transient buffer '{name}' has zero size"
            )));
        }
        Ok(self.insert_buffer(name, BufferSource::Transient, size, BufferUsage::all(), None))
    }

    /// Import a device buffer.
    pub fn import_buffer(
        &mut self,
        name: impl Into<String>,
        handle: BufferHandle,
        buffer: &Buffer,
    ) -> Result<BufferAttachmentHandle, GraphicsError> {
        let name = name.into();
        self.claim_name(&name)?;
        Ok(self.insert_buffer(
            name,
            BufferSource::Imported(handle),
            buffer.size(),
            buffer.usage(),
            Some(handle),
        ))
    }

    /// Look up an attachment by name.
    pub fn find(&self, name: &str) -> Option<AttachmentId> {
        self.names.get(name).copied()
    }

    /// Get an image attachment.
    pub fn image(&self, handle: ImageAttachmentHandle) -> Option<&ImageAttachment> {
        self.images.get(handle)
    }

    /// Get an image attachment, panicking on a stale handle.
    pub fn resolve_image(&self, handle: ImageAttachmentHandle) -> &ImageAttachment {
        &self.images[handle]
    }

    /// Get a buffer attachment.
    pub fn buffer(&self, handle: BufferAttachmentHandle) -> Option<&BufferAttachment> {
        self.buffers.get(handle)
    }

    /// Get a buffer attachment, panicking on a stale handle.
    pub fn resolve_buffer(&self, handle: BufferAttachmentHandle) -> &BufferAttachment {
        &self.buffers[handle]
    }

    /// Get an image use.
    pub fn image_use(&self, handle: ImageUseHandle) -> Option<&ImagePassAttachment> {
        self.image_uses.get(handle)
    }

    /// Get a buffer use.
    pub fn buffer_use(&self, handle: BufferUseHandle) -> Option<&BufferPassAttachment> {
        self.buffer_uses.get(handle)
    }

    /// All image attachments.
    pub fn images(&self) -> impl Iterator<Item = (ImageAttachmentHandle, &ImageAttachment)> + '_ {
        self.images.iter()
    }

    /// All buffer attachments.
    pub fn buffers(
        &self,
    ) -> impl Iterator<Item = (BufferAttachmentHandle, &BufferAttachment)> + '_ {
        self.buffers.iter()
    }

    /// Uses of an image attachment in declaration order.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is stale.
    pub fn image_uses(&self, handle: ImageAttachmentHandle) -> UseIter<'_, ImagePassAttachment> {
        self.images[handle].uses.iter(&self.image_uses)
    }

    /// Uses of a buffer attachment in declaration order.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is stale.
    pub fn buffer_uses(
        &self,
        handle: BufferAttachmentHandle,
    ) -> UseIter<'_, BufferPassAttachment> {
        self.buffers[handle].uses.iter(&self.buffer_uses)
    }

    /// Number of image attachments.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Number of buffer attachments.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Classify an image use against its attachment.
    ///
    /// Color targets on depth/stencil formats become depth/stencil uses.
    pub fn classify_image_use(
        &self,
        handle: ImageAttachmentHandle,
        declaration: &ImageUse,
    ) -> Result<ImageUseKind, GraphicsError> {
        let attachment = self.images.get(handle).ok_or_else(|| {
            GraphicsError::InvalidHandle(format!("image attachment {handle:?}"))
        })?;
        let format = declaration.format.unwrap_or(attachment.format);
        match declaration.kind {
            ImageUseKind::RenderTarget if format.is_depth_stencil() => {
                Ok(ImageUseKind::DepthStencil)
            }
            ImageUseKind::DepthStencil if !format.is_depth_stencil() => {
                Err(GraphicsError::InvalidParameter(format!(
                    "'{}' has non-depth format {format:?} but is used as depth/stencil",
                    attachment.name
                )))
            }
            kind => Ok(kind),
        }
    }

    /// Append an image use for `pass` on `queue`.
    pub fn use_image(
        &mut self,
        pass: PassHandle,
        queue: QueueType,
        handle: ImageAttachmentHandle,
        declaration: ImageUse,
    ) -> Result<ImageUseHandle, GraphicsError> {
        let kind = self.classify_image_use(handle, &declaration)?;
        let attachment = &self.images[handle];
        let format = declaration.format.unwrap_or(attachment.format);
        let range = declaration.range;

        if !attachment.format.is_view_compatible(format) {
            return Err(GraphicsError::InvalidParameter(format!(
                "'{}' ({:?}) cannot be viewed as {format:?}",
                attachment.name, attachment.format
            )));
        }
        if !kind.allows(declaration.access) {
            return Err(GraphicsError::InvalidParameter(format!(
                "{kind:?} use of '{}' cannot have {:?} access",
                attachment.name, declaration.access
            )));
        }
        if !kind.supported_on(queue) {
            return Err(GraphicsError::InvalidParameter(format!(
                "{kind:?} use of '{}' is not supported on the {} queue",
                attachment.name,
                queue.name()
            )));
        }
        if range.mip_level_count == 0
            || range.array_layer_count == 0
            || range.mip_end().is_none_or(|end| end > attachment.max_mip_levels)
            || range.layer_end().is_none_or(|end| end > attachment.max_array_layers)
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "subresource range {range:?} is out of bounds for '{}'",
                attachment.name
            )));
        }
        if !attachment.allowed_usage.contains(kind.required_usage()) {
            return Err(GraphicsError::InvalidParameter(format!(
                "'{}' was not created with {:?}",
                attachment.name,
                kind.required_usage()
            )));
        }

        let node = self.image_uses.insert(ImagePassAttachment {
            pass,
            attachment: handle,
            kind,
            access: declaration.access,
            stages: declaration.stages.unwrap_or(kind.default_stages(queue)),
            format,
            range,
            load_op: declaration.load_op,
            store_op: declaration.store_op,
            links: UseLinks::default(),
        });
        let attachment = &mut self.images[handle];
        attachment.uses.push_back(&mut self.image_uses, node);
        attachment.widen(&self.image_uses[node]);
        log::trace!(
            "Graph: pass {} uses '{}' as {kind:?} ({:?})",
            pass.index(),
            attachment.name,
            declaration.access
        );
        Ok(node)
    }

    /// Append a buffer use for `pass` on `queue`.
    pub fn use_buffer(
        &mut self,
        pass: PassHandle,
        queue: QueueType,
        handle: BufferAttachmentHandle,
        declaration: BufferUse,
    ) -> Result<BufferUseHandle, GraphicsError> {
        let attachment = self.buffers.get(handle).ok_or_else(|| {
            GraphicsError::InvalidHandle(format!("buffer attachment {handle:?}"))
        })?;
        let kind = declaration.kind;
        let range = declaration.range;

        if !kind.allows(declaration.access) {
            return Err(GraphicsError::InvalidParameter(format!(
                "{kind:?} use of '{}' cannot have {:?} access",
                attachment.name, declaration.access
            )));
        }
        if !kind.supported_on(queue) {
            return Err(GraphicsError::InvalidParameter(format!(
                "{kind:?} use of '{}' is not supported on the {} queue",
                attachment.name,
                queue.name()
            )));
        }
        if range.size == Some(0)
            || range.offset >= attachment.size
            || range.end(attachment.size).is_none_or(|end| end > attachment.size)
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "range {range:?} is out of bounds for '{}' ({} bytes)",
                attachment.name, attachment.size
            )));
        }
        if !attachment.allowed_usage.contains(kind.required_usage()) {
            return Err(GraphicsError::InvalidParameter(format!(
                "'{}' was not created with {:?}",
                attachment.name,
                kind.required_usage()
            )));
        }

        let node = self.buffer_uses.insert(BufferPassAttachment {
            pass,
            attachment: handle,
            kind,
            access: declaration.access,
            stages: declaration.stages.unwrap_or(kind.default_stages(queue)),
            range,
            links: UseLinks::default(),
        });
        let attachment = &mut self.buffers[handle];
        attachment.uses.push_back(&mut self.buffer_uses, node);
        attachment.usage |= kind.required_usage();
        log::trace!(
            "Graph: pass {} uses '{}' as {kind:?} ({:?})",
            pass.index(),
            attachment.name,
            declaration.access
        );
        Ok(node)
    }

    /// Remove an image use and recompute the attachment's aggregates.
    pub fn remove_image_use(
        &mut self,
        handle: ImageUseHandle,
    ) -> Result<ImagePassAttachment, GraphicsError> {
        let attachment = self
            .image_uses
            .get(handle)
            .map(|node| node.attachment)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("image use {handle:?}")))?;
        let owner = &mut self.images[attachment];
        owner.uses.unlink(&mut self.image_uses, handle);
        let removed = self
            .image_uses
            .remove(handle)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("image use {handle:?}")))?;

        owner.reset_aggregates();
        let mut cursor = owner.uses.first();
        while let Some(node) = self.image_uses.get(cursor) {
            owner.widen(node);
            cursor = node.links.next;
        }
        Ok(removed)
    }

    /// Remove a buffer use and recompute the attachment's usage.
    pub fn remove_buffer_use(
        &mut self,
        handle: BufferUseHandle,
    ) -> Result<BufferPassAttachment, GraphicsError> {
        let attachment = self
            .buffer_uses
            .get(handle)
            .map(|node| node.attachment)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("buffer use {handle:?}")))?;
        let owner = &mut self.buffers[attachment];
        owner.uses.unlink(&mut self.buffer_uses, handle);
        let removed = self
            .buffer_uses
            .remove(handle)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("buffer use {handle:?}")))?;

        owner.usage = owner
            .uses
            .iter(&self.buffer_uses)
            .fold(BufferUsage::empty(), |usage, (_, node)| {
                usage | node.kind.required_usage()
            });
        Ok(removed)
    }

    /// Bind a device image to an attachment for the current frame.
    ///
    /// Swapchain attachments are bound by the scheduler on acquire; transient
    /// attachments may be bound to an allocation made from their descriptor.
    pub fn bind_image(
        &mut self,
        handle: ImageAttachmentHandle,
        image: ImageHandle,
    ) -> Result<(), GraphicsError> {
        let attachment = self.images.get_mut(handle).ok_or_else(|| {
            GraphicsError::InvalidHandle(format!("image attachment {handle:?}"))
        })?;
        if let ImageSource::Imported(imported) = attachment.source
            && imported != image
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "imported attachment '{}' is bound to {imported:?}",
                attachment.name
            )));
        }
        attachment.resource = Some(image);
        Ok(())
    }

    /// Bind a device buffer to a transient attachment for the current frame.
    pub fn bind_buffer(
        &mut self,
        handle: BufferAttachmentHandle,
        buffer: BufferHandle,
    ) -> Result<(), GraphicsError> {
        let attachment = self.buffers.get_mut(handle).ok_or_else(|| {
            GraphicsError::InvalidHandle(format!("buffer attachment {handle:?}"))
        })?;
        if let BufferSource::Imported(imported) = attachment.source
            && imported != buffer
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "imported attachment '{}' is bound to {imported:?}",
                attachment.name
            )));
        }
        attachment.resource = Some(buffer);
        Ok(())
    }

    /// Drop every attachment and use, keeping pool storage.
    pub fn clear(&mut self) {
        self.images.clear();
        self.buffers.clear();
        self.image_uses.clear();
        self.buffer_uses.clear();
        self.names.clear();
    }
}

static_assertions::assert_impl_all!(AttachmentRegistry: Send, Sync);
