//! Render graph compilation.
//!
//! This module handles the compilation of a [`RenderGraph`](crate::graph::RenderGraph)
//! into an execution plan ([`CompiledGraph`]).
//!
//! The compiler performs:
//!
//! 1. **Hazard analysis** - Walk each attachment's use list in declaration
//!    order and derive read-after-write, write-after-write and
//!    write-after-read edges. Image layout transitions count as writes.
//! 2. **Topological Sort** - Order passes respecting derived and explicit
//!    edges; ties go to the pass declared first
//! 3. **Cycle Detection** - Report the passes that could not be scheduled
//! 4. **Synchronization** - Per pass, the producers to wait on, the consumers
//!    to signal, and the barriers to issue before the pass starts
//! 5. **Lifetimes** - First and last use of every transient, with the
//!    resource requirements an allocator needs; see [`AliasingPlan`]
//!
//! # Example
//!
//! ```ignore
//! let mut graph = RenderGraph::new();
//! let geometry = graph.add_graphics_pass("geometry");
//! let lighting = graph.add_graphics_pass("lighting");
//! graph.add_dependency(lighting, geometry);
//!
//! let compiled = graph.compile()?;
//! assert_eq!(compiled.pass_order(), &[geometry, lighting]);
//! ```

mod aliasing;

pub use aliasing::{AliasSlot, AliasingPlan};

use std::collections::{BTreeMap, BTreeSet};

use ember_core::Handle;
use thiserror::Error;

use crate::error::GraphicsError;
use crate::graph::{
    AttachmentId, AttachmentLifetime, BufferAttachmentHandle, ImageAttachmentHandle, PassHandle,
    RenderGraph,
};
use crate::types::{Access, BufferDescriptor, ImageDescriptor, ImageLayout, PipelineStages};

/// Errors that can occur during graph compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The graph contains a cyclic dependency.
    ///
    /// `passes` lists the passes that could not be scheduled, in
    /// declaration order.
    #[error("render graph contains cyclic dependency between {} passes", passes.len())]
    CyclicDependency {
        /// Passes left unscheduled.
        passes: Vec<PassHandle>,
    },

    /// An invalid pass handle was encountered.
    #[error("invalid pass handle: {0:?}")]
    InvalidPassHandle(PassHandle),

    /// A pass refers to an attachment use that no longer exists.
    #[error("invalid attachment: {0:?}")]
    InvalidAttachment(AttachmentId),
}

impl From<GraphError> for GraphicsError {
    fn from(err: GraphError) -> Self {
        GraphicsError::InvalidParameter(err.to_string())
    }
}

/// Why one pass must run after another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// The consumer reads what the producer wrote.
    ReadAfterWrite,
    /// The consumer overwrites what the producer wrote.
    WriteAfterWrite,
    /// The consumer overwrites what the producer read.
    WriteAfterRead,
    /// Added with [`RenderGraph::add_dependency`].
    Explicit,
}

/// One ordering edge between two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// Pass that must finish first.
    pub producer: PassHandle,
    /// Pass that waits.
    pub consumer: PassHandle,
    /// Attachment the hazard is on; `None` for explicit edges.
    pub attachment: Option<AttachmentId>,
    /// Hazard classification.
    pub kind: DependencyKind,
    /// Consumer stages blocked by the edge.
    pub stages: PipelineStages,
}

/// A semaphore wait on a producer pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassWait {
    /// Pass whose completion is waited on.
    pub producer: PassHandle,
    /// Stages of the waiting pass that must not start earlier.
    pub stages: PipelineStages,
}

/// A memory or layout barrier issued before a pass starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Barrier {
    /// Attachment the barrier applies to.
    pub attachment: AttachmentId,
    /// Pass of the previous use.
    pub producer: PassHandle,
    /// Stages of the previous use.
    pub src_stages: PipelineStages,
    /// Stages of this use.
    pub dst_stages: PipelineStages,
    /// Access of the previous use.
    pub src_access: Access,
    /// Access of this use.
    pub dst_access: Access,
    /// Layout before the barrier, for images.
    pub old_layout: Option<ImageLayout>,
    /// Layout after the barrier, for images.
    pub new_layout: Option<ImageLayout>,
}

impl Barrier {
    /// Returns true if the barrier changes an image layout.
    pub fn is_transition(&self) -> bool {
        self.old_layout != self.new_layout
    }
}

/// Synchronization of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSync {
    waits: Vec<PassWait>,
    consumers: Vec<PassHandle>,
    barriers: Vec<Barrier>,
}

impl PassSync {
    /// Producers to wait on, in execution order.
    pub fn waits(&self) -> &[PassWait] {
        &self.waits
    }

    /// Passes waiting on this one, in execution order.
    pub fn consumers(&self) -> &[PassHandle] {
        &self.consumers
    }

    /// Whether any later pass waits on this one.
    pub fn signals(&self) -> bool {
        !self.consumers.is_empty()
    }

    /// Barriers to issue before the pass starts.
    pub fn barriers(&self) -> &[Barrier] {
        &self.barriers
    }
}

/// Positions in the pass order between which a transient is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LifetimeWindow {
    /// Position of the first pass using the resource.
    pub first: usize,
    /// Position of the last pass using the resource.
    pub last: usize,
}

impl LifetimeWindow {
    /// A window covering a single position.
    pub fn at(position: usize) -> Self {
        Self {
            first: position,
            last: position,
        }
    }

    /// Returns true if `position` lies in the window.
    pub fn contains(&self, position: usize) -> bool {
        self.first <= position && position <= self.last
    }

    /// Returns true if the windows share any position.
    pub fn overlaps(&self, other: &LifetimeWindow) -> bool {
        self.first <= other.last && other.first <= self.last
    }

    /// Returns true if the two resources may share memory.
    pub fn can_alias(&self, other: &LifetimeWindow) -> bool {
        !self.overlaps(other)
    }

    fn extend(&mut self, position: usize) {
        self.first = self.first.min(position);
        self.last = self.last.max(position);
    }
}

/// Lifetime and requirements of a transient image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLifetime {
    /// The transient.
    pub attachment: ImageAttachmentHandle,
    /// Where it is alive.
    pub window: LifetimeWindow,
    /// Maximal requirements over all uses.
    pub descriptor: ImageDescriptor,
    /// The first user reads contents nothing in this frame wrote.
    pub reads_before_write: bool,
}

impl ImageLifetime {
    /// Estimated bytes needed to back the image.
    pub fn size(&self) -> u64 {
        self.descriptor.estimated_size()
    }
}

/// Lifetime and requirements of a transient buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferLifetime {
    /// The transient.
    pub attachment: BufferAttachmentHandle,
    /// Where it is alive.
    pub window: LifetimeWindow,
    /// Size and usage over all uses.
    pub descriptor: BufferDescriptor,
    /// The first user reads contents nothing in this frame wrote.
    pub reads_before_write: bool,
}

/// How a frame touches an attachment that outlives it.
///
/// Imported and swapchain attachments carry state across frames: their
/// first user must wait for whatever happened before the frame, and their
/// last writer publishes the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalAccess {
    /// The attachment.
    pub attachment: AttachmentId,
    /// Imported or swapchain.
    pub lifetime: AttachmentLifetime,
    /// First pass in execution order using it.
    pub first_user: PassHandle,
    /// Stages of `first_user` touching it.
    pub first_stages: PipelineStages,
    /// Last pass in execution order writing it.
    pub last_writer: Option<PassHandle>,
}

/// A compiled render graph ready for execution.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompiledGraph {
    /// Execution order as handles.
    pass_order: Vec<PassHandle>,
    /// Position of each pass in `pass_order`, indexed by declaration.
    positions: Vec<usize>,
    dependencies: Vec<Dependency>,
    sync: Vec<PassSync>,
    image_lifetimes: Vec<ImageLifetime>,
    buffer_lifetimes: Vec<BufferLifetime>,
    external: Vec<ExternalAccess>,
    edge_count: usize,
}

impl CompiledGraph {
    /// Get the execution order as handles.
    pub fn pass_order(&self) -> &[PassHandle] {
        &self.pass_order
    }

    /// Get the number of passes in the compiled graph.
    pub fn pass_count(&self) -> usize {
        self.pass_order.len()
    }

    /// Check if the compiled graph is empty.
    pub fn is_empty(&self) -> bool {
        self.pass_order.is_empty()
    }

    /// Position of `pass` in the execution order.
    ///
    /// # Panics
    ///
    /// Panics if `pass` is not part of the graph.
    pub fn position(&self, pass: PassHandle) -> usize {
        self.positions[pass.index()]
    }

    /// Every ordering edge, including duplicates on different attachments.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Number of distinct producer/consumer pairs; each needs one semaphore.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Synchronization of `pass`.
    ///
    /// # Panics
    ///
    /// Panics if `pass` is not part of the graph.
    pub fn sync(&self, pass: PassHandle) -> &PassSync {
        &self.sync[pass.index()]
    }

    /// Transient image lifetimes.
    pub fn image_lifetimes(&self) -> &[ImageLifetime] {
        &self.image_lifetimes
    }

    /// Transient buffer lifetimes.
    pub fn buffer_lifetimes(&self) -> &[BufferLifetime] {
        &self.buffer_lifetimes
    }

    /// Lifetime of one transient image.
    pub fn image_lifetime(&self, attachment: ImageAttachmentHandle) -> Option<&ImageLifetime> {
        self.image_lifetimes
            .iter()
            .find(|lifetime| lifetime.attachment == attachment)
    }

    /// Lifetime of one transient buffer.
    pub fn buffer_lifetime(&self, attachment: BufferAttachmentHandle) -> Option<&BufferLifetime> {
        self.buffer_lifetimes
            .iter()
            .find(|lifetime| lifetime.attachment == attachment)
    }

    /// Imported and swapchain attachments used by the frame.
    pub fn external_accesses(&self) -> &[ExternalAccess] {
        &self.external
    }

    /// Assign transients to shared memory slots.
    pub fn aliasing_plan(&self) -> AliasingPlan {
        AliasingPlan::build(&self.image_lifetimes, &self.buffer_lifetimes)
    }
}

/// One use, flattened for hazard analysis.
#[derive(Clone, Copy)]
struct UseInfo {
    pass: PassHandle,
    access: Access,
    stages: PipelineStages,
    layout: Option<ImageLayout>,
    /// The use loads previous contents, whatever its access.
    loads: bool,
}

/// Compile a render graph into an execution plan.
///
/// # Returns
///
/// * `Ok(CompiledGraph)` - Pass order and synchronization ready for submission
/// * `Err(GraphError::CyclicDependency)` - If the graph contains a cycle
pub fn compile(graph: &RenderGraph) -> Result<CompiledGraph, GraphError> {
    let passes = graph.passes();
    let registry = graph.registry();
    let n = passes.len();

    for (index, pass) in passes.iter().enumerate() {
        for &handle in pass.image_uses() {
            let node = registry.image_use(handle).ok_or(GraphError::InvalidAttachment(
                AttachmentId::Image(Handle::INVALID),
            ))?;
            if node.pass().index() != index {
                return Err(GraphError::InvalidPassHandle(node.pass()));
            }
        }
        for &handle in pass.buffer_uses() {
            let node = registry.buffer_use(handle).ok_or(GraphError::InvalidAttachment(
                AttachmentId::Buffer(Handle::INVALID),
            ))?;
            if node.pass().index() != index {
                return Err(GraphError::InvalidPassHandle(node.pass()));
            }
        }
    }

    // Ordering edges
    let mut dependencies = Vec::new();
    let mut barriers = Vec::new();
    for &(dependent, dependency) in graph.edges() {
        for handle in [dependent, dependency] {
            if handle.index() >= n {
                return Err(GraphError::InvalidPassHandle(handle));
            }
        }
        dependencies.push(Dependency {
            producer: dependency,
            consumer: dependent,
            attachment: None,
            kind: DependencyKind::Explicit,
            stages: PipelineStages::all(),
        });
    }
    let mut scratch = Vec::new();
    for (handle, _) in registry.images() {
        scratch.clear();
        scratch.extend(registry.image_uses(handle).map(|(_, node)| UseInfo {
            pass: node.pass(),
            access: node.access(),
            stages: node.stages(),
            layout: Some(node.layout()),
            loads: node.load_op().reads_contents(),
        }));
        derive_hazards(
            AttachmentId::Image(handle),
            &scratch,
            n,
            &mut dependencies,
            &mut barriers,
        )?;
    }
    for (handle, _) in registry.buffers() {
        scratch.clear();
        scratch.extend(registry.buffer_uses(handle).map(|(_, node)| UseInfo {
            pass: node.pass(),
            access: node.access(),
            stages: node.stages(),
            layout: None,
            loads: false,
        }));
        derive_hazards(
            AttachmentId::Buffer(handle),
            &scratch,
            n,
            &mut dependencies,
            &mut barriers,
        )?;
    }

    // Distinct edges with the union of blocked stages, in a stable order.
    let mut edges: BTreeMap<(PassHandle, PassHandle), PipelineStages> = BTreeMap::new();
    for dependency in &dependencies {
        *edges
            .entry((dependency.producer, dependency.consumer))
            .or_default() |= dependency.stages;
    }

    // Kahn's algorithm; the ready set yields the lowest declaration index
    // first so independent passes keep their declared order.
    let mut in_degree = vec![0u32; n];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(producer, consumer) in edges.keys() {
        in_degree[consumer.index()] += 1;
        successors[producer.index()].push(consumer.index());
    }
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut pass_order = Vec::with_capacity(n);
    while let Some(index) = ready.pop_first() {
        pass_order.push(PassHandle::new(index as u32));
        for &next in &successors[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }
    if pass_order.len() != n {
        let passes: Vec<PassHandle> = (0..n)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| PassHandle::new(i as u32))
            .collect();
        log::warn!(
            "Graph: cycle among {:?}",
            passes
                .iter()
                .map(|pass| graph.passes()[pass.index()].name())
                .collect::<Vec<_>>()
        );
        return Err(GraphError::CyclicDependency { passes });
    }

    let mut positions = vec![0; n];
    for (position, pass) in pass_order.iter().enumerate() {
        positions[pass.index()] = position;
    }

    // Synchronization
    let mut sync = vec![PassSync::default(); n];
    for (&(producer, consumer), &stages) in &edges {
        sync[consumer.index()]
            .waits
            .push(PassWait { producer, stages });
        sync[producer.index()].consumers.push(consumer);
    }
    for pass_sync in &mut sync {
        pass_sync
            .waits
            .sort_by_key(|wait| positions[wait.producer.index()]);
        pass_sync
            .consumers
            .sort_by_key(|consumer| positions[consumer.index()]);
    }
    for (pass, barrier) in barriers {
        sync[pass.index()].barriers.push(barrier);
    }

    // Lifetimes and cross-frame accesses
    let mut image_lifetimes = Vec::new();
    let mut buffer_lifetimes = Vec::new();
    let mut external = Vec::new();
    for (handle, attachment) in registry.images() {
        scratch.clear();
        scratch.extend(registry.image_uses(handle).map(|(_, node)| UseInfo {
            pass: node.pass(),
            access: node.access(),
            stages: node.stages(),
            layout: None,
            loads: node.load_op().reads_contents(),
        }));
        let Some(summary) = summarize(&scratch, &positions) else {
            continue;
        };
        match attachment.lifetime() {
            AttachmentLifetime::Transient => {
                if !summary.first_writes {
                    log::warn!(
                        "Graph: transient '{}' is read before it is written",
                        attachment.name()
                    );
                }
                image_lifetimes.push(ImageLifetime {
                    attachment: handle,
                    window: summary.window,
                    descriptor: attachment.descriptor(),
                    reads_before_write: !summary.first_writes,
                });
            }
            lifetime => external.push(summary.external(AttachmentId::Image(handle), lifetime)),
        }
    }
    for (handle, attachment) in registry.buffers() {
        scratch.clear();
        scratch.extend(registry.buffer_uses(handle).map(|(_, node)| UseInfo {
            pass: node.pass(),
            access: node.access(),
            stages: node.stages(),
            layout: None,
            loads: false,
        }));
        let Some(summary) = summarize(&scratch, &positions) else {
            continue;
        };
        match attachment.lifetime() {
            AttachmentLifetime::Transient => {
                if !summary.first_writes {
                    log::warn!(
                        "Graph: transient '{}' is read before it is written",
                        attachment.name()
                    );
                }
                buffer_lifetimes.push(BufferLifetime {
                    attachment: handle,
                    window: summary.window,
                    descriptor: attachment.descriptor(),
                    reads_before_write: !summary.first_writes,
                });
            }
            lifetime => external.push(summary.external(AttachmentId::Buffer(handle), lifetime)),
        }
    }
    external.sort_by_key(|access| (positions[access.first_user.index()], access.attachment));

    log::debug!(
        "Compiled graph: {} passes, {} edges, {} transient images, {} transient buffers",
        n,
        edges.len(),
        image_lifetimes.len(),
        buffer_lifetimes.len()
    );

    Ok(CompiledGraph {
        pass_order,
        positions,
        dependencies,
        sync,
        image_lifetimes,
        buffer_lifetimes,
        external,
        edge_count: edges.len(),
    })
}

/// Walk one attachment's uses in declaration order, emitting hazard edges
/// and the barrier each use needs.
///
/// For images the first use in a new layout performs the transition, so it
/// is treated as a write: it must not race with earlier readers, and later
/// uses in that layout wait on it.
fn derive_hazards(
    attachment: AttachmentId,
    uses: &[UseInfo],
    pass_count: usize,
    dependencies: &mut Vec<Dependency>,
    barriers: &mut Vec<(PassHandle, Barrier)>,
) -> Result<(), GraphError> {
    let mut last_writer: Option<UseInfo> = None;
    let mut readers: Vec<PassHandle> = Vec::new();
    let mut previous: Option<UseInfo> = None;

    for &info in uses {
        if info.pass.index() >= pass_count {
            return Err(GraphError::InvalidPassHandle(info.pass));
        }
        let transition = info.layout.is_some()
            && previous.is_some_and(|prev| prev.layout != info.layout);
        let edge = |producer: PassHandle, kind: DependencyKind| Dependency {
            producer,
            consumer: info.pass,
            attachment: Some(attachment),
            kind,
            stages: info.stages,
        };

        if info.access.is_write() || transition {
            let before = dependencies.len();
            for &reader in &readers {
                if reader != info.pass {
                    dependencies.push(edge(reader, DependencyKind::WriteAfterRead));
                }
            }
            // With readers in between, the writer is already ordered first.
            if let Some(writer) = last_writer
                && writer.pass != info.pass
            {
                if info.access.is_read() {
                    dependencies.push(edge(writer.pass, DependencyKind::ReadAfterWrite));
                } else if dependencies.len() == before {
                    dependencies.push(edge(writer.pass, DependencyKind::WriteAfterWrite));
                }
            }
            if let Some(prev) = previous {
                barriers.push((info.pass, barrier(attachment, prev, info)));
            }
            last_writer = Some(info);
            readers.clear();
        } else {
            if let Some(writer) = last_writer {
                if writer.pass != info.pass {
                    dependencies.push(edge(writer.pass, DependencyKind::ReadAfterWrite));
                }
                barriers.push((info.pass, barrier(attachment, writer, info)));
            }
            if !readers.contains(&info.pass) {
                readers.push(info.pass);
            }
        }
        previous = Some(info);
    }
    Ok(())
}

fn barrier(attachment: AttachmentId, src: UseInfo, dst: UseInfo) -> Barrier {
    Barrier {
        attachment,
        producer: src.pass,
        src_stages: src.stages,
        dst_stages: dst.stages,
        src_access: src.access,
        dst_access: dst.access,
        old_layout: src.layout,
        new_layout: dst.layout,
    }
}

struct UseSummary {
    window: LifetimeWindow,
    first_user: PassHandle,
    first_stages: PipelineStages,
    first_writes: bool,
    last_writer: Option<(usize, PassHandle)>,
}

impl UseSummary {
    fn external(&self, attachment: AttachmentId, lifetime: AttachmentLifetime) -> ExternalAccess {
        ExternalAccess {
            attachment,
            lifetime,
            first_user: self.first_user,
            first_stages: self.first_stages,
            last_writer: self.last_writer.map(|(_, pass)| pass),
        }
    }
}

/// Window, first user and last writer of one attachment in execution order.
fn summarize(uses: &[UseInfo], positions: &[usize]) -> Option<UseSummary> {
    let first = uses.first()?;
    let position = positions[first.pass.index()];
    let mut summary = UseSummary {
        window: LifetimeWindow::at(position),
        first_user: first.pass,
        first_stages: PipelineStages::empty(),
        first_writes: false,
        last_writer: None,
    };
    for info in uses {
        let position = positions[info.pass.index()];
        summary.window.extend(position);
        if position < positions[summary.first_user.index()] {
            summary.first_user = info.pass;
            summary.first_stages = PipelineStages::empty();
            summary.first_writes = false;
        }
        if info.pass == summary.first_user {
            summary.first_stages |= info.stages;
            summary.first_writes |= info.access.is_write() && !info.loads;
        }
        if info.access.is_write() && summary.last_writer.is_none_or(|(last, _)| position > last) {
            summary.last_writer = Some((position, info.pass));
        }
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ImageUse, ImageUseKind, LoadOp, TransientImageDescriptor};
    use crate::types::ImageFormat;

    fn image(graph: &mut RenderGraph, name: &str) -> ImageAttachmentHandle {
        graph
            .create_transient_image(
                name,
                TransientImageDescriptor::new_2d(64, 64, ImageFormat::Rgba8Unorm),
            )
            .unwrap()
    }

    fn waits(compiled: &CompiledGraph, pass: PassHandle) -> Vec<PassHandle> {
        compiled
            .sync(pass)
            .waits()
            .iter()
            .map(|wait| wait.producer)
            .collect()
    }

    #[test]
    fn test_compile_empty_graph() {
        let graph = RenderGraph::new();
        let compiled = compile(&graph).unwrap();
        assert!(compiled.is_empty());
        assert_eq!(compiled.pass_count(), 0);
        assert_eq!(compiled.edge_count(), 0);
    }

    #[test]
    fn test_compile_linear_chain() {
        // A -> B -> C (A must come first, then B, then C)
        let mut graph = RenderGraph::new();
        let a = graph.add_graphics_pass("A");
        let b = graph.add_graphics_pass("B");
        let c = graph.add_graphics_pass("C");

        graph.add_dependency(b, a); // B depends on A
        graph.add_dependency(c, b); // C depends on B

        let compiled = compile(&graph).unwrap();
        assert_eq!(compiled.pass_order(), &[a, b, c]);
        assert_eq!(compiled.dependencies()[0].kind, DependencyKind::Explicit);
    }

    #[test]
    fn test_attachment_chain_orders_and_waits() {
        // Declared out of order: C reads Y, B reads X and writes Y, A writes X.
        let mut graph = RenderGraph::new();
        let x = image(&mut graph, "X");
        let y = image(&mut graph, "Y");
        let a = graph.add_graphics_pass("A");
        let b = graph.add_graphics_pass("B");
        let c = graph.add_graphics_pass("C");
        graph.use_render_target(a, x, LoadOp::DontCare).unwrap();
        graph.use_shader_input(b, x).unwrap();
        graph.use_render_target(b, y, LoadOp::DontCare).unwrap();
        graph.use_shader_input(c, y).unwrap();

        let compiled = compile(&graph).unwrap();
        assert_eq!(compiled.pass_order(), &[a, b, c]);
        assert_eq!(waits(&compiled, b), vec![a]);
        assert_eq!(waits(&compiled, c), vec![b]);
        assert!(waits(&compiled, a).is_empty());
        assert!(compiled.sync(a).signals());
        assert!(!compiled.sync(c).signals());
        assert_eq!(compiled.edge_count(), 2);

        let barrier = compiled.sync(b).barriers()[0];
        assert_eq!(barrier.producer, a);
        assert_eq!(barrier.old_layout, Some(ImageLayout::ColorAttachment));
        assert_eq!(barrier.new_layout, Some(ImageLayout::ShaderReadOnly));
        assert!(barrier.is_transition());
    }

    #[test]
    fn test_use_order_overrides_declaration_order() {
        // The consumer is declared first but uses the attachment after the
        // producer in the use list.
        let mut graph = RenderGraph::new();
        let x = image(&mut graph, "X");
        let late = graph.add_graphics_pass("late");
        let early = graph.add_graphics_pass("early");
        graph.use_render_target(early, x, LoadOp::DontCare).unwrap();
        graph.use_shader_input(late, x).unwrap();

        let compiled = compile(&graph).unwrap();
        assert_eq!(compiled.pass_order(), &[early, late]);
        assert_eq!(compiled.position(late), 1);
    }

    #[test]
    fn test_write_after_read() {
        let mut graph = RenderGraph::new();
        let x = image(&mut graph, "X");
        let writer = graph.add_compute_pass("writer");
        let reader = graph.add_compute_pass("reader");
        let rewriter = graph.add_compute_pass("rewriter");
        graph.use_storage_image(writer, x, Access::Write).unwrap();
        graph.use_storage_image(reader, x, Access::Read).unwrap();
        graph.use_storage_image(rewriter, x, Access::Write).unwrap();

        let compiled = compile(&graph).unwrap();
        assert_eq!(compiled.pass_order(), &[writer, reader, rewriter]);
        let kinds: Vec<_> = compiled.dependencies().iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DependencyKind::ReadAfterWrite, DependencyKind::WriteAfterRead]
        );
        assert_eq!(waits(&compiled, rewriter), vec![reader]);
    }

    #[test]
    fn test_independent_readers_keep_declaration_order() {
        let mut graph = RenderGraph::new();
        let x = image(&mut graph, "X");
        let write = graph.add_compute_pass("write");
        let r1 = graph.add_compute_pass("r1");
        let r2 = graph.add_compute_pass("r2");
        graph.use_storage_image(write, x, Access::Write).unwrap();
        graph.use_storage_image(r2, x, Access::Read).unwrap();
        graph.use_storage_image(r1, x, Access::Read).unwrap();

        let compiled = compile(&graph).unwrap();
        assert_eq!(compiled.pass_order(), &[write, r1, r2]);
        assert_eq!(waits(&compiled, r1), vec![write]);
        assert_eq!(waits(&compiled, r2), vec![write]);
        // Both readers see the write through their own barrier.
        for reader in [r1, r2] {
            let barriers = compiled.sync(reader).barriers();
            assert_eq!(barriers.len(), 1);
            assert_eq!(barriers[0].producer, write);
            assert!(!barriers[0].is_transition());
        }
    }

    #[test]
    fn test_layout_change_between_readers_is_ordered() {
        let mut graph = RenderGraph::new();
        let x = image(&mut graph, "X");
        let write = graph.add_graphics_pass("write");
        let copy = graph.add_transfer_pass("copy");
        let sample = graph.add_graphics_pass("sample");
        graph.use_render_target(write, x, LoadOp::DontCare).unwrap();
        graph.use_shader_input(sample, x).unwrap();
        graph
            .use_image_attachment(copy, x, ImageUse::new(ImageUseKind::CopySource, Access::Read))
            .unwrap();

        let compiled = compile(&graph).unwrap();
        assert_eq!(compiled.pass_order(), &[write, sample, copy]);
        assert_eq!(waits(&compiled, copy), vec![sample]);
        let barrier = compiled.sync(copy).barriers()[0];
        assert_eq!(barrier.old_layout, Some(ImageLayout::ShaderReadOnly));
        assert_eq!(barrier.new_layout, Some(ImageLayout::TransferSrc));
    }

    #[test]
    fn test_compile_cycle_reports_passes() {
        // A -> B -> C -> A (cycle), D independent
        let mut graph = RenderGraph::new();
        let a = graph.add_graphics_pass("A");
        let b = graph.add_graphics_pass("B");
        let c = graph.add_graphics_pass("C");
        let _d = graph.add_graphics_pass("D");

        graph.add_dependency(b, a);
        graph.add_dependency(c, b);
        graph.add_dependency(a, c);

        let result = compile(&graph);
        assert_eq!(
            result,
            Err(GraphError::CyclicDependency {
                passes: vec![a, b, c]
            })
        );
        let err: GraphicsError = result.unwrap_err().into();
        assert!(matches!(err, GraphicsError::InvalidParameter(_)));
    }

    #[test]
    fn test_attachment_cycle() {
        // B writes X before A reads it, but A must run before B explicitly.
        let mut graph = RenderGraph::new();
        let x = image(&mut graph, "X");
        let a = graph.add_graphics_pass("A");
        let b = graph.add_graphics_pass("B");
        graph.use_render_target(b, x, LoadOp::DontCare).unwrap();
        graph.use_shader_input(a, x).unwrap();
        graph.add_dependency(b, a);

        assert!(matches!(
            compile(&graph),
            Err(GraphError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_scratch_lifetime() {
        let mut graph = RenderGraph::new();
        let scratch = image(&mut graph, "Scratch");
        let other = image(&mut graph, "Other");
        let a = graph.add_graphics_pass("A");
        let b = graph.add_graphics_pass("B");
        let c = graph.add_graphics_pass("C");
        graph.use_render_target(a, scratch, LoadOp::DontCare).unwrap();
        graph.use_render_target(b, other, LoadOp::DontCare).unwrap();
        graph.use_shader_input(c, other).unwrap();

        let compiled = compile(&graph).unwrap();
        let scratch_window = compiled.image_lifetime(scratch).unwrap().window;
        let other_window = compiled.image_lifetime(other).unwrap().window;
        assert_eq!(scratch_window, LifetimeWindow::at(compiled.position(a)));
        assert_eq!(other_window.first, compiled.position(b));
        assert_eq!(other_window.last, compiled.position(c));
        assert!(scratch_window.can_alias(&other_window));

        let plan = compiled.aliasing_plan();
        assert_eq!(plan.image_slots().len(), 1);
        assert_eq!(plan.image_slot(scratch), plan.image_slot(other));
    }

    #[test]
    fn test_loaded_target_reads_before_write() {
        let mut graph = RenderGraph::new();
        let cleared = image(&mut graph, "cleared");
        let loaded = image(&mut graph, "loaded");
        let a = graph.add_graphics_pass("A");
        graph
            .use_render_target(a, cleared, LoadOp::clear_color(0.0, 0.0, 0.0, 1.0))
            .unwrap();
        let b = graph.add_graphics_pass("B");
        graph.use_render_target(b, loaded, LoadOp::Load).unwrap();

        let compiled = compile(&graph).unwrap();
        assert!(!compiled.image_lifetime(cleared).unwrap().reads_before_write);
        assert!(compiled.image_lifetime(loaded).unwrap().reads_before_write);
    }

    #[test]
    fn test_lifetime_requirements_are_maximal() {
        let mut graph = RenderGraph::new();
        let x = image(&mut graph, "X");
        let a = graph.add_graphics_pass("A");
        let b = graph.add_compute_pass("B");
        graph.use_render_target(a, x, LoadOp::DontCare).unwrap();
        graph
            .use_image_attachment(
                b,
                x,
                ImageUse::new(ImageUseKind::Storage, Access::Write)
                    .with_range(crate::types::SubresourceRange::mip(2)),
            )
            .unwrap();

        let compiled = compile(&graph).unwrap();
        let lifetime = compiled.image_lifetime(x).unwrap();
        assert_eq!(lifetime.descriptor.mip_level_count, 3);
        assert!(
            lifetime
                .descriptor
                .usage
                .contains(crate::types::ImageUsage::STORAGE | crate::types::ImageUsage::COLOR_ATTACHMENT)
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let build = || {
            let mut graph = RenderGraph::new();
            let names = ["a", "b", "c", "d", "e"];
            let images: Vec<_> = names.iter().map(|name| image(&mut graph, name)).collect();
            let passes: Vec<_> = names
                .iter()
                .map(|name| graph.add_compute_pass(format!("pass_{name}")))
                .collect();
            for (i, &pass) in passes.iter().enumerate() {
                graph
                    .use_storage_image(pass, images[i], Access::Write)
                    .unwrap();
                if i > 0 {
                    graph
                        .use_storage_image(pass, images[i - 1], Access::Read)
                        .unwrap();
                }
            }
            graph
        };
        let first = compile(&build()).unwrap();
        let second = compile(&build()).unwrap();
        assert_eq!(first, second);
    }
}
