//! Render graph infrastructure.
//!
//! The render graph provides a declarative way to describe a frame's GPU work
//! and its dependencies. Passes declare which attachments they use and how;
//! the [compiler](crate::compiler) derives from those declarations:
//!
//! - A pass order that respects every read/write hazard
//! - The semaphores and barriers needed between passes
//! - Transient attachment lifetimes and a memory aliasing plan
//!
//! # Architecture
//!
//! | Layer | Type | Purpose |
//! |-------|------|---------|
//! | Scheduler | [`FrameScheduler`](crate::scheduler::FrameScheduler) | Frames in flight, submission |
//! | **Graph** | [`RenderGraph`] | Passes and attachment uses (this module) |
//! | Attachments | [`AttachmentRegistry`] | Named resources and their use lists |
//! | Pass | [`Pass`] | Single unit of GPU work on one queue |
//!
//! # Example
//!
//! ```ignore
//! let mut graph = RenderGraph::new();
//! let color = graph.create_transient_image(
//!     "color",
//!     TransientImageDescriptor::new_2d(1280, 720, ImageFormat::Rgba16Float),
//! )?;
//! let backbuffer = graph.import_swapchain("backbuffer", &device, swapchain)?;
//!
//! let scene = graph.add_graphics_pass("scene");
//! graph.use_render_target(scene, color, LoadOp::clear_color(0.0, 0.0, 0.0, 1.0))?;
//!
//! let tonemap = graph.add_graphics_pass("tonemap");
//! graph.use_shader_input(tonemap, color)?;
//! graph.use_render_target(tonemap, backbuffer, LoadOp::DontCare)?;
//! ```

mod attachment;
mod chain;
mod command;
mod pass;
mod target;
mod usage;

pub use attachment::{
    AttachmentId, AttachmentLifetime, AttachmentRegistry, BufferAttachment,
    BufferAttachmentHandle, BufferPassAttachment, BufferUseHandle, ImageAttachment,
    ImageAttachmentHandle, ImagePassAttachment, ImageUseHandle, TransientImageDescriptor,
};
pub use chain::UseIter;
pub use command::{
    BufferCopyRegion, BufferImageLayout, ClearCommand, Command, CommandList, CopyCommand,
    CopyEndpoint, DispatchCommand, DrawCommand, ImageCopyLocation,
};
pub use pass::{Pass, PassRecorder};
pub use target::{LoadOp, StoreOp};
pub use usage::{BufferUse, BufferUseKind, ImageUse, ImageUseKind};

use crate::compiler::{self, CompiledGraph, GraphError};
use crate::device::Device;
use crate::error::GraphicsError;
use crate::resources::{BufferHandle, ImageHandle, SwapchainHandle};
use crate::types::{Access, BufferRange, QueueType, RenderArea, SubresourceRange};

/// Handle to a pass in the render graph.
///
/// `PassHandle` is `Copy` and cheap to pass around. It is only valid within
/// the `RenderGraph` that created it, until the next [`RenderGraph::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassHandle(u32);

impl PassHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Declaration index of the pass.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The render graph describes a frame's rendering operations.
///
/// # Construction
///
/// Build a graph by adding passes and declaring their attachment uses.
/// Ordering is derived from the uses; explicit edges can be added with
/// [`add_dependency`](Self::add_dependency):
///
/// ```ignore
/// let mut graph = RenderGraph::new();
/// let geometry = graph.add_graphics_pass("geometry");
/// let lighting = graph.add_graphics_pass("lighting");
/// graph.add_dependency(lighting, geometry);
/// ```
///
/// # Execution
///
/// After construction, the graph is compiled and handed to the scheduler:
///
/// ```ignore
/// let compiled = graph.compile()?;
/// ```
#[derive(Debug, Default)]
pub struct RenderGraph {
    /// All passes in declaration order.
    passes: Vec<Pass>,
    /// Explicit dependency edges stored as (dependent, dependency) pairs.
    edges: Vec<(PassHandle, PassHandle)>,
    registry: AttachmentRegistry,
}

impl RenderGraph {
    /// Create a new empty render graph.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Passes
    // ========================================================================

    /// Add a pass on `queue`.
    pub fn add_pass(&mut self, name: impl Into<String>, queue: QueueType) -> PassHandle {
        let index = self.passes.len() as u32;
        let name = name.into();
        log::trace!("Graph: pass {index} '{name}' on {}", queue.name());
        self.passes.push(Pass::new(name, queue));
        PassHandle::new(index)
    }

    /// Add a graphics pass to the graph.
    pub fn add_graphics_pass(&mut self, name: impl Into<String>) -> PassHandle {
        self.add_pass(name, QueueType::Graphics)
    }

    /// Add a compute pass to the graph.
    pub fn add_compute_pass(&mut self, name: impl Into<String>) -> PassHandle {
        self.add_pass(name, QueueType::Compute)
    }

    /// Add a transfer pass to the graph.
    pub fn add_transfer_pass(&mut self, name: impl Into<String>) -> PassHandle {
        self.add_pass(name, QueueType::Transfer)
    }

    /// Add a pass performing a single copy, declaring its source and
    /// destination uses.
    pub fn add_copy_pass(
        &mut self,
        name: impl Into<String>,
        queue: QueueType,
        copy: CopyCommand,
    ) -> Result<PassHandle, GraphicsError> {
        let pass = self.add_pass(name, queue);
        if let Err(err) = self.declare_copy(pass, &copy) {
            self.discard_last_pass(pass);
            return Err(err);
        }
        let label = self.passes[pass.index()].name().to_string();
        let mut list = CommandList::new(queue).with_label(label);
        list.submit(copy);
        self.passes[pass.index()].push_command_list(list);
        Ok(pass)
    }

    fn declare_copy(&mut self, pass: PassHandle, copy: &CopyCommand) -> Result<(), GraphicsError> {
        match copy {
            CopyCommand::BufferToBuffer { src, dst, regions } => {
                let Some(first) = regions.first() else {
                    return Err(GraphicsError::InvalidParameter(
                        "buffer copy has no regions".to_string(),
                    ));
                };
                let overflow = || {
                    GraphicsError::InvalidParameter("buffer copy region overflows".to_string())
                };
                let mut src_range = (first.src_offset, first.src_offset);
                let mut dst_range = (first.dst_offset, first.dst_offset);
                for region in regions {
                    let src_end = region.src_offset.checked_add(region.size).ok_or_else(overflow)?;
                    let dst_end = region.dst_offset.checked_add(region.size).ok_or_else(overflow)?;
                    src_range.0 = src_range.0.min(region.src_offset);
                    src_range.1 = src_range.1.max(src_end);
                    dst_range.0 = dst_range.0.min(region.dst_offset);
                    dst_range.1 = dst_range.1.max(dst_end);
                }
                self.use_buffer_attachment(
                    pass,
                    *src,
                    BufferUse::new(BufferUseKind::CopySource, Access::Read).with_range(
                        BufferRange::new(src_range.0, src_range.1 - src_range.0),
                    ),
                )?;
                self.use_buffer_attachment(
                    pass,
                    *dst,
                    BufferUse::new(BufferUseKind::CopyDestination, Access::Write).with_range(
                        BufferRange::new(dst_range.0, dst_range.1 - dst_range.0),
                    ),
                )?;
            }
            CopyCommand::BufferToImage {
                src,
                layout,
                dst,
                location,
                ..
            } => {
                self.use_buffer_attachment(
                    pass,
                    *src,
                    BufferUse::new(BufferUseKind::CopySource, Access::Read).with_range(
                        BufferRange {
                            offset: layout.offset,
                            size: None,
                        },
                    ),
                )?;
                self.use_image_attachment(
                    pass,
                    *dst,
                    ImageUse::new(ImageUseKind::CopyDestination, Access::Write)
                        .with_range(copy_range(location)),
                )?;
            }
            CopyCommand::ImageToBuffer {
                src,
                location,
                dst,
                layout,
                ..
            } => {
                self.use_image_attachment(
                    pass,
                    *src,
                    ImageUse::new(ImageUseKind::CopySource, Access::Read)
                        .with_range(copy_range(location)),
                )?;
                self.use_buffer_attachment(
                    pass,
                    *dst,
                    BufferUse::new(BufferUseKind::CopyDestination, Access::Write).with_range(
                        BufferRange {
                            offset: layout.offset,
                            size: None,
                        },
                    ),
                )?;
            }
            CopyCommand::ImageToImage {
                src,
                src_location,
                dst,
                dst_location,
                ..
            } => {
                self.use_image_attachment(
                    pass,
                    *src,
                    ImageUse::new(ImageUseKind::CopySource, Access::Read)
                        .with_range(copy_range(src_location)),
                )?;
                self.use_image_attachment(
                    pass,
                    *dst,
                    ImageUse::new(ImageUseKind::CopyDestination, Access::Write)
                        .with_range(copy_range(dst_location)),
                )?;
            }
        }
        Ok(())
    }

    /// Drop the most recently added pass along with its uses.
    fn discard_last_pass(&mut self, pass: PassHandle) {
        debug_assert_eq!(pass.index() + 1, self.passes.len());
        let Some(removed) = self.passes.pop() else {
            return;
        };
        for &handle in removed.image_uses() {
            let unlinked = self.registry.remove_image_use(handle);
            debug_assert!(unlinked.is_ok(), "rollback failed to unlink {handle:?}");
        }
        for &handle in removed.buffer_uses() {
            let unlinked = self.registry.remove_buffer_use(handle);
            debug_assert!(unlinked.is_ok(), "rollback failed to unlink {handle:?}");
        }
        self.edges
            .retain(|&(dependent, dependency)| dependent != pass && dependency != pass);
    }

    /// Add a dependency between passes.
    ///
    /// The `dependent` pass will execute after the `dependency` pass and
    /// wait on its completion.
    ///
    /// # Panics
    ///
    /// Panics if either handle is out of bounds or both name the same pass.
    pub fn add_dependency(&mut self, dependent: PassHandle, dependency: PassHandle) {
        assert!(
            dependent.index() < self.passes.len(),
            "Invalid dependent handle"
        );
        assert!(
            dependency.index() < self.passes.len(),
            "Invalid dependency handle"
        );
        assert!(dependent != dependency, "Pass cannot depend on itself");

        // Check for duplicates
        let exists = self
            .edges
            .iter()
            .any(|&(d, dep)| d == dependent && dep == dependency);
        if !exists {
            self.edges.push((dependent, dependency));
        }
    }

    /// Get explicit dependencies of a pass.
    pub fn dependencies(&self, handle: PassHandle) -> impl Iterator<Item = PassHandle> + '_ {
        self.edges
            .iter()
            .filter(move |&&(dependent, _)| dependent == handle)
            .map(|&(_, dependency)| dependency)
    }

    pub(crate) fn edges(&self) -> &[(PassHandle, PassHandle)] {
        &self.edges
    }

    /// Get a pass.
    pub fn pass(&self, handle: PassHandle) -> Option<&Pass> {
        self.passes.get(handle.index())
    }

    /// Get all passes in the graph.
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub(crate) fn pass_mut(&mut self, handle: PassHandle) -> &mut Pass {
        &mut self.passes[handle.index()]
    }

    /// Get the number of passes in the graph.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    fn checked_pass(&self, handle: PassHandle) -> Result<&Pass, GraphicsError> {
        self.passes
            .get(handle.index())
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("pass {handle:?}")))
    }

    /// Install the callback that records the pass's commands.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is out of bounds.
    pub fn set_recorder(
        &mut self,
        handle: PassHandle,
        recorder: impl FnMut(&mut CommandList) + Send + 'static,
    ) {
        self.passes[handle.index()].set_recorder(Box::new(recorder));
    }

    /// Append a pre-recorded command list to a pass.
    pub fn record(&mut self, handle: PassHandle, list: CommandList) -> Result<(), GraphicsError> {
        let pass = self.checked_pass(handle)?;
        if list.queue() != pass.queue() {
            return Err(GraphicsError::InvalidParameter(format!(
                "command list for the {} queue recorded into '{}' on the {} queue",
                list.queue().name(),
                pass.name(),
                pass.queue().name()
            )));
        }
        self.passes[handle.index()].push_command_list(list);
        Ok(())
    }

    /// Restrict a graphics pass's draws to `area`.
    pub fn set_render_area(
        &mut self,
        handle: PassHandle,
        area: RenderArea,
    ) -> Result<(), GraphicsError> {
        let pass = self.checked_pass(handle)?;
        if !pass.is_graphics() {
            return Err(GraphicsError::InvalidParameter(format!(
                "'{}' is not a graphics pass",
                pass.name()
            )));
        }
        if area.is_empty() || area.x < 0 || area.y < 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "invalid render area {area:?}"
            )));
        }
        if let Some(extent) = pass.render_extent()
            && (area.x as u64 + area.width as u64 > extent.width as u64
                || area.y as u64 + area.height as u64 > extent.height as u64)
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "render area {area:?} exceeds the {}x{} targets of '{}'",
                extent.width,
                extent.height,
                pass.name()
            )));
        }
        self.passes[handle.index()].set_render_area(area);
        Ok(())
    }

    // ========================================================================
    // Attachments
    // ========================================================================

    /// The attachment registry.
    pub fn registry(&self) -> &AttachmentRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut AttachmentRegistry {
        &mut self.registry
    }

    /// Declare a transient image.
    pub fn create_transient_image(
        &mut self,
        name: impl Into<String>,
        descriptor: TransientImageDescriptor,
    ) -> Result<ImageAttachmentHandle, GraphicsError> {
        self.registry.create_transient_image(name, descriptor)
    }

    /// Declare a transient buffer.
    pub fn create_transient_buffer(
        &mut self,
        name: impl Into<String>,
        size: u64,
    ) -> Result<BufferAttachmentHandle, GraphicsError> {
        self.registry.create_transient_buffer(name, size)
    }

    /// Import a device image.
    pub fn import_image(
        &mut self,
        name: impl Into<String>,
        device: &Device,
        image: ImageHandle,
    ) -> Result<ImageAttachmentHandle, GraphicsError> {
        let resource = device
            .image(image)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("image {image:?}")))?;
        self.registry.import_image(name, image, resource)
    }

    /// Import a device buffer.
    pub fn import_buffer(
        &mut self,
        name: impl Into<String>,
        device: &Device,
        buffer: BufferHandle,
    ) -> Result<BufferAttachmentHandle, GraphicsError> {
        let resource = device
            .buffer(buffer)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("buffer {buffer:?}")))?;
        self.registry.import_buffer(name, buffer, resource)
    }

    /// Import a swapchain. The scheduler binds its current image each frame.
    pub fn import_swapchain(
        &mut self,
        name: impl Into<String>,
        device: &Device,
        swapchain: SwapchainHandle,
    ) -> Result<ImageAttachmentHandle, GraphicsError> {
        let resource = device
            .swapchain(swapchain)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("swapchain {swapchain:?}")))?;
        self.registry.import_swapchain(name, swapchain, resource)
    }

    /// Bind a device image to a transient attachment for this frame.
    pub fn bind_transient_image(
        &mut self,
        attachment: ImageAttachmentHandle,
        image: ImageHandle,
    ) -> Result<(), GraphicsError> {
        self.registry.bind_image(attachment, image)
    }

    /// Bind a device buffer to a transient attachment for this frame.
    pub fn bind_transient_buffer(
        &mut self,
        attachment: BufferAttachmentHandle,
        buffer: BufferHandle,
    ) -> Result<(), GraphicsError> {
        self.registry.bind_buffer(attachment, buffer)
    }

    // ========================================================================
    // Attachment uses
    // ========================================================================

    /// Declare an image use by `pass`.
    ///
    /// Render and depth targets fix the pass's render extent; later targets
    /// must match it. A pass has at most one depth/stencil target.
    pub fn use_image_attachment(
        &mut self,
        pass: PassHandle,
        attachment: ImageAttachmentHandle,
        declaration: ImageUse,
    ) -> Result<ImageUseHandle, GraphicsError> {
        let owner = self.checked_pass(pass)?;
        let queue = owner.queue();
        let kind = self.registry.classify_image_use(attachment, &declaration)?;

        let target_extent = if kind.is_target() {
            let image = self.registry.resolve_image(attachment);
            let extent = image.size().mip_level(declaration.range.base_mip_level);
            if let Some(existing) = owner.render_extent()
                && (existing.width, existing.height) != (extent.width, extent.height)
            {
                return Err(GraphicsError::InvalidParameter(format!(
                    "'{}' is {}x{} but '{}' renders at {}x{}",
                    image.name(),
                    extent.width,
                    extent.height,
                    owner.name(),
                    existing.width,
                    existing.height
                )));
            }
            Some(extent)
        } else {
            None
        };

        let depth_stencil = kind == ImageUseKind::DepthStencil;
        if depth_stencil && owner.depth_stencil().is_some() {
            return Err(GraphicsError::InvalidParameter(format!(
                "'{}' already has a depth/stencil target",
                owner.name()
            )));
        }

        let node = self
            .registry
            .use_image(pass, queue, attachment, declaration)?;
        self.passes[pass.index()].push_image_use(node, target_extent, depth_stencil);
        Ok(node)
    }

    /// Declare a color render target.
    pub fn use_render_target(
        &mut self,
        pass: PassHandle,
        attachment: ImageAttachmentHandle,
        load_op: LoadOp,
    ) -> Result<ImageUseHandle, GraphicsError> {
        self.use_image_attachment(pass, attachment, ImageUse::render_target().with_load_op(load_op))
    }

    /// Declare the depth/stencil target.
    pub fn use_depth_stencil_target(
        &mut self,
        pass: PassHandle,
        attachment: ImageAttachmentHandle,
        load_op: LoadOp,
    ) -> Result<ImageUseHandle, GraphicsError> {
        self.use_image_attachment(pass, attachment, ImageUse::depth_stencil().with_load_op(load_op))
    }

    /// Declare an image sampled by the pass.
    pub fn use_shader_input(
        &mut self,
        pass: PassHandle,
        attachment: ImageAttachmentHandle,
    ) -> Result<ImageUseHandle, GraphicsError> {
        self.use_image_attachment(pass, attachment, ImageUse::shader_resource())
    }

    /// Declare a storage image.
    pub fn use_storage_image(
        &mut self,
        pass: PassHandle,
        attachment: ImageAttachmentHandle,
        access: Access,
    ) -> Result<ImageUseHandle, GraphicsError> {
        self.use_image_attachment(pass, attachment, ImageUse::new(ImageUseKind::Storage, access))
    }

    /// Declare a buffer use by `pass`.
    pub fn use_buffer_attachment(
        &mut self,
        pass: PassHandle,
        attachment: BufferAttachmentHandle,
        declaration: BufferUse,
    ) -> Result<BufferUseHandle, GraphicsError> {
        let queue = self.checked_pass(pass)?.queue();
        let node = self
            .registry
            .use_buffer(pass, queue, attachment, declaration)?;
        self.passes[pass.index()].push_buffer_use(node);
        Ok(node)
    }

    /// Declare a storage buffer.
    pub fn use_storage_buffer(
        &mut self,
        pass: PassHandle,
        attachment: BufferAttachmentHandle,
        access: Access,
    ) -> Result<BufferUseHandle, GraphicsError> {
        self.use_buffer_attachment(pass, attachment, BufferUse::new(BufferUseKind::Storage, access))
    }

    /// Withdraw an image use.
    pub fn remove_image_use(&mut self, handle: ImageUseHandle) -> Result<(), GraphicsError> {
        let pass = self
            .registry
            .image_use(handle)
            .map(|node| node.pass())
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("image use {handle:?}")))?;
        self.passes[pass.index()].remove_image_use(handle);
        self.registry.remove_image_use(handle)?;
        Ok(())
    }

    /// Withdraw a buffer use.
    pub fn remove_buffer_use(&mut self, handle: BufferUseHandle) -> Result<(), GraphicsError> {
        let pass = self
            .registry
            .buffer_use(handle)
            .map(|node| node.pass())
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("buffer use {handle:?}")))?;
        self.passes[pass.index()].remove_buffer_use(handle);
        self.registry.remove_buffer_use(handle)?;
        Ok(())
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Compile the graph for execution.
    ///
    /// This performs:
    /// - Dependency derivation from the attachment use lists
    /// - Topological sorting of passes
    /// - Synchronization and barrier placement
    /// - Transient lifetime analysis
    pub fn compile(&self) -> Result<CompiledGraph, GraphError> {
        compiler::compile(self)
    }

    /// Tear down passes, uses and attachments, keeping storage for reuse.
    pub fn reset(&mut self) {
        self.passes.clear();
        self.edges.clear();
        self.registry.clear();
    }
}

fn copy_range(location: &ImageCopyLocation) -> SubresourceRange {
    SubresourceRange::mip(location.mip_level).with_array_layers(location.array_layer, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Extent3d, ImageFormat};

    fn transient(graph: &mut RenderGraph, name: &str, size: u32) -> ImageAttachmentHandle {
        graph
            .create_transient_image(
                name,
                TransientImageDescriptor::new_2d(size, size, ImageFormat::Rgba8Unorm),
            )
            .unwrap()
    }

    #[test]
    fn test_add_passes() {
        let mut graph = RenderGraph::new();
        let draw = graph.add_graphics_pass("draw");
        let cull = graph.add_compute_pass("cull");
        let upload = graph.add_transfer_pass("upload");
        assert_eq!(graph.pass_count(), 3);
        assert!(graph.pass(draw).unwrap().is_graphics());
        assert!(graph.pass(cull).unwrap().is_compute());
        assert!(graph.pass(upload).unwrap().is_transfer());
        assert_eq!(graph.passes()[0].name(), "draw");
    }

    #[test]
    fn test_add_dependency() {
        let mut graph = RenderGraph::new();
        let pass1 = graph.add_graphics_pass("pass1");
        let pass2 = graph.add_graphics_pass("pass2");
        graph.add_dependency(pass2, pass1);
        graph.add_dependency(pass2, pass1);

        let deps: Vec<_> = graph.dependencies(pass2).collect();
        assert_eq!(deps, vec![pass1]);
        assert_eq!(graph.dependencies(pass1).count(), 0);
    }

    #[test]
    #[should_panic(expected = "Pass cannot depend on itself")]
    fn test_self_dependency_panics() {
        let mut graph = RenderGraph::new();
        let pass = graph.add_graphics_pass("pass");
        graph.add_dependency(pass, pass);
    }

    #[test]
    fn test_render_extent_must_match() {
        let mut graph = RenderGraph::new();
        let a = transient(&mut graph, "a", 128);
        let b = transient(&mut graph, "b", 64);
        let mips = transient(&mut graph, "mips", 256);
        let pass = graph.add_graphics_pass("main");

        graph.use_render_target(pass, a, LoadOp::DontCare).unwrap();
        let err = graph.use_render_target(pass, b, LoadOp::DontCare).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidParameter(_)));

        // Mip 1 of a 256 image renders at 128.
        graph
            .use_image_attachment(
                pass,
                mips,
                ImageUse::render_target().with_range(SubresourceRange::mip(1)),
            )
            .unwrap();
        assert_eq!(
            graph.pass(pass).unwrap().render_extent(),
            Some(Extent3d::new_2d(128, 128))
        );
        assert_eq!(graph.passes()[0].image_uses().len(), 2);
    }

    #[test]
    fn test_single_depth_target() {
        let mut graph = RenderGraph::new();
        let depth = graph
            .create_transient_image(
                "depth",
                TransientImageDescriptor::new_2d(64, 64, ImageFormat::Depth32Float),
            )
            .unwrap();
        let other = graph
            .create_transient_image(
                "other",
                TransientImageDescriptor::new_2d(64, 64, ImageFormat::Depth24Plus),
            )
            .unwrap();
        let pass = graph.add_graphics_pass("main");
        let node = graph
            .use_depth_stencil_target(pass, depth, LoadOp::clear_depth(1.0))
            .unwrap();
        assert_eq!(graph.pass(pass).unwrap().depth_stencil(), Some(node));
        assert!(
            graph
                .use_render_target(pass, other, LoadOp::DontCare)
                .is_err()
        );

        graph.remove_image_use(node).unwrap();
        assert!(graph.pass(pass).unwrap().depth_stencil().is_none());
        graph.use_depth_stencil_target(pass, other, LoadOp::Load).unwrap();
    }

    #[test]
    fn test_render_area_validation() {
        let mut graph = RenderGraph::new();
        let color = transient(&mut graph, "color", 64);
        let pass = graph.add_graphics_pass("main");
        let compute = graph.add_compute_pass("compute");
        graph.use_render_target(pass, color, LoadOp::DontCare).unwrap();

        graph
            .set_render_area(pass, RenderArea::new(0, 0, 32, 32))
            .unwrap();
        assert!(
            graph
                .set_render_area(pass, RenderArea::new(40, 0, 32, 32))
                .is_err()
        );
        assert!(
            graph
                .set_render_area(compute, RenderArea::from_dimensions(8, 8))
                .is_err()
        );
    }

    #[test]
    fn test_copy_pass_declares_uses() {
        let mut graph = RenderGraph::new();
        let staging = graph.create_transient_buffer("staging", 4096).unwrap();
        let image = transient(&mut graph, "image", 32);
        let upload = graph
            .add_copy_pass(
                "upload",
                QueueType::Transfer,
                CopyCommand::BufferToImage {
                    src: staging,
                    layout: BufferImageLayout::default(),
                    dst: image,
                    location: ImageCopyLocation::mip(0),
                    extent: Extent3d::new_2d(32, 32),
                },
            )
            .unwrap();

        let pass = graph.pass(upload).unwrap();
        assert_eq!(pass.image_uses().len(), 1);
        assert_eq!(pass.buffer_uses().len(), 1);
        assert_eq!(pass.command_lists().len(), 1);
        assert_eq!(pass.command_lists()[0].label(), Some("upload"));
        let node = graph.registry().image_use(pass.image_uses()[0]).unwrap();
        assert_eq!(node.kind(), ImageUseKind::CopyDestination);
    }

    #[test]
    fn test_failed_copy_pass_is_discarded() {
        let mut graph = RenderGraph::new();
        let staging = graph.create_transient_buffer("staging", 64).unwrap();
        let dst = graph.create_transient_buffer("dst", 64).unwrap();
        let result = graph.add_copy_pass(
            "copy",
            QueueType::Transfer,
            CopyCommand::buffer_to_buffer(staging, dst, 128),
        );
        assert!(result.is_err());
        assert_eq!(graph.pass_count(), 0);
        assert_eq!(graph.registry().resolve_buffer(staging).use_count(), 0);
    }

    #[test]
    fn test_overflowing_copy_region_rejected() {
        let mut graph = RenderGraph::new();
        let src = graph.create_transient_buffer("src", 64).unwrap();
        let dst = graph.create_transient_buffer("dst", 64).unwrap();
        let result = graph.add_copy_pass(
            "copy",
            QueueType::Transfer,
            CopyCommand::BufferToBuffer {
                src,
                dst,
                regions: vec![
                    BufferCopyRegion::whole(16),
                    BufferCopyRegion::new(8, 0, u64::MAX),
                ],
            },
        );
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
        assert_eq!(graph.pass_count(), 0);
        assert_eq!(graph.registry().resolve_buffer(dst).use_count(), 0);
    }

    #[test]
    fn test_record_checks_queue() {
        let mut graph = RenderGraph::new();
        let pass = graph.add_compute_pass("compute");
        let mut list = CommandList::new(QueueType::Compute);
        list.submit(DispatchCommand::new(8, 8, 1));
        graph.record(pass, list).unwrap();
        assert!(
            graph
                .record(pass, CommandList::new(QueueType::Graphics))
                .is_err()
        );
    }

    #[test]
    fn test_reset_keeps_nothing() {
        let mut graph = RenderGraph::new();
        let color = transient(&mut graph, "color", 64);
        let pass = graph.add_graphics_pass("main");
        graph.use_render_target(pass, color, LoadOp::DontCare).unwrap();
        graph.reset();
        assert_eq!(graph.pass_count(), 0);
        assert!(graph.registry().image(color).is_none());
        assert!(graph.registry().find("color").is_none());
    }
}
