//! Frame scheduling: frames in flight, submission and presentation.
//!
//! [`FrameScheduler`] turns a compiled [`RenderGraph`] into queue submissions
//! once per frame. It owns N frame slots, each with its own fence, command
//! pools and semaphores, so the CPU can record frame N+1 while the GPU is
//! still executing frame N.
//!
//! # Architecture
//!
//! | Layer | Type | Purpose |
//! |-------|------|---------|
//! | **Scheduler** | [`FrameScheduler`] | Frames in flight, submission (this module) |
//! | Graph | [`RenderGraph`] | Passes and attachment uses |
//! | Compiler | [`CompiledGraph`](crate::compiler::CompiledGraph) | Order, sync, lifetimes |
//! | Backend | [`GpuBackend`] | Queues, fences, semaphores |
//!
//! # Synchronization Model
//!
//! | Level | Primitive | Purpose |
//! |-------|-----------|---------|
//! | Pass → Pass | Semaphore per edge | Producer completion before consumer start |
//! | Pass → Pass | Barriers | Access and layout hazards on one attachment |
//! | Frame → Frame | Carried semaphores | Imported attachments written last frame |
//! | Frame → Frame | Fences | CPU-GPU sync when a slot is reused |
//!
//! # Frame Overlap
//!
//! With 2 frames in flight:
//!
//! ```text
//! Slot 0: [Frame 0] ──► [Frame 2] ──► [Frame 4] ──►
//! Slot 1: [Frame 1] ──► [Frame 3] ──► [Frame 5] ──►
//!
//! Frame 0: [record] [submit] ────────────────────────────────────►
//!                            [GPU frame 0] ──────────────────────►
//! Frame 1:          [record] [submit] ───────────────────────────►
//!                                     [GPU frame 1] ─────────────►
//! Frame 2:                   [wait F0] [record] [submit] ────────►
//! ```
//!
//! [`FrameScheduler::begin_frame`] is the only call that blocks.
//!
//! # Swapchains
//!
//! Every swapchain attachment written in a frame is acquired before the first
//! submission and presented after the last. An invalidated swapchain is
//! reported through [`FrameOutcome`] rather than as an error: at acquire the
//! frame is skipped, at present the work has already been submitted.
//!
//! # Example
//!
//! ```ignore
//! let mut scheduler = FrameScheduler::new(&device, SchedulerConfig::from_env())?;
//!
//! while running {
//!     scheduler.begin_frame()?;
//!
//!     let mut graph = RenderGraph::new();
//!     let backbuffer = graph.import_swapchain("backbuffer", &device, swapchain)?;
//!     let main = graph.add_graphics_pass("main");
//!     graph.use_render_target(main, backbuffer, LoadOp::clear_color(0.0, 0.0, 0.0, 1.0))?;
//!
//!     let outcome = scheduler.end_frame(&device, &mut graph)?;
//!     if outcome.needs_swapchain_recreation() {
//!         scheduler.wait_idle()?;
//!         device.resize_swapchain(swapchain, width, height)?;
//!     }
//! }
//!
//! scheduler.wait_idle()?;
//! ```

mod frame;
mod sync;

pub use sync::FenceStatus;

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{
    GpuBackend, GpuSemaphore, GpuSwapchain, PresentRequest, SemaphoreWait, Submission,
};
use crate::compiler::CompiledGraph;
use crate::device::Device;
use crate::error::GraphicsError;
use crate::graph::{
    AttachmentId, AttachmentLifetime, ImageAttachmentHandle, PassHandle, RenderGraph,
};
use crate::resources::{BufferHandle, ImageHandle, SwapchainHandle};
use crate::types::{PipelineStages, QueueType};

use frame::FrameContext;
use sync::CarryPool;

/// Largest accepted `frames_in_flight`.
pub const MAX_FRAMES_IN_FLIGHT: usize = 8;

/// Environment variable overriding `frames_in_flight`.
pub const FRAMES_IN_FLIGHT_ENV: &str = "EMBER_FRAMES_IN_FLIGHT";

// ============================================================================
// Configuration
// ============================================================================

/// Frame scheduler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of frames the CPU may record ahead of the GPU (1..=8).
    pub frames_in_flight: usize,
    /// Imported attachments written in one frame signal a semaphore that
    /// their first user in the next frame waits on.
    pub carry_imported_signals: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            carry_imported_signals: true,
        }
    }
}

impl SchedulerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of frames in flight.
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Enable or disable cross-frame semaphores for imported attachments.
    pub fn with_carry_imported_signals(mut self, carry: bool) -> Self {
        self.carry_imported_signals = carry;
        self
    }

    /// Default configuration with `EMBER_FRAMES_IN_FLIGHT` applied.
    ///
    /// Unparsable or out-of-range values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::default().with_env_override(std::env::var(FRAMES_IN_FLIGHT_ENV).ok().as_deref())
    }

    fn with_env_override(self, value: Option<&str>) -> Self {
        let Some(value) = value else {
            return self;
        };
        match value.trim().parse::<usize>() {
            Ok(frames) if (1..=MAX_FRAMES_IN_FLIGHT).contains(&frames) => {
                log::debug!("Scheduler: {FRAMES_IN_FLIGHT_ENV}={frames}");
                self.with_frames_in_flight(frames)
            }
            _ => {
                log::warn!(
                    "Scheduler: ignoring {FRAMES_IN_FLIGHT_ENV}={value:?}, expected 1..={MAX_FRAMES_IN_FLIGHT}"
                );
                self
            }
        }
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if !(1..=MAX_FRAMES_IN_FLIGHT).contains(&self.frames_in_flight) {
            return Err(GraphicsError::InvalidParameter(format!(
                "frames_in_flight must be in 1..={MAX_FRAMES_IN_FLIGHT}, got {}",
                self.frames_in_flight
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of presenting one swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    /// The image was queued for display.
    Presented,
    /// The swapchain no longer matches its surface and must be recreated.
    OutOfDate,
    /// The surface is gone.
    SurfaceLost,
}

/// One swapchain present of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentOutcome {
    /// The presented swapchain.
    pub swapchain: SwapchainHandle,
    /// Index of the presented image.
    pub image_index: u32,
    /// What happened.
    pub status: PresentStatus,
}

/// What [`FrameScheduler::end_frame`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    frame_index: u64,
    pass_count: usize,
    submission_count: usize,
    semaphore_count: usize,
    presents: Vec<PresentOutcome>,
    acquire_failure: Option<SwapchainHandle>,
}

impl FrameOutcome {
    fn skipped(frame_index: u64, swapchain: SwapchainHandle) -> Self {
        Self {
            frame_index,
            pass_count: 0,
            submission_count: 0,
            semaphore_count: 0,
            presents: Vec::new(),
            acquire_failure: Some(swapchain),
        }
    }

    /// Index of the frame.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Passes submitted.
    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    /// Queue submissions made, including the fence-only submission of an
    /// empty frame.
    pub fn submission_count(&self) -> usize {
        self.submission_count
    }

    /// Binary semaphores signaled, including swapchain acquires.
    pub fn semaphore_count(&self) -> usize {
        self.semaphore_count
    }

    /// Presents, one per swapchain written this frame.
    pub fn presents(&self) -> &[PresentOutcome] {
        &self.presents
    }

    /// Returns false if the frame was skipped because an acquire failed.
    pub fn is_submitted(&self) -> bool {
        self.acquire_failure.is_none()
    }

    /// Swapchain whose acquire failed, skipping the frame.
    pub fn acquire_failure(&self) -> Option<SwapchainHandle> {
        self.acquire_failure
    }

    /// Swapchains reported out of date or lost, at acquire or present.
    pub fn invalidated_swapchains(&self) -> Vec<SwapchainHandle> {
        self.acquire_failure
            .into_iter()
            .chain(
                self.presents
                    .iter()
                    .filter(|present| present.status != PresentStatus::Presented)
                    .map(|present| present.swapchain),
            )
            .collect()
    }

    /// Returns true if any swapchain must be recreated before the next frame.
    pub fn needs_swapchain_recreation(&self) -> bool {
        self.acquire_failure.is_some()
            || self
                .presents
                .iter()
                .any(|present| present.status != PresentStatus::Presented)
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Device resource a carried semaphore guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CarryKey {
    Image(ImageHandle),
    Buffer(BufferHandle),
}

/// A swapchain image acquired for the current frame.
#[derive(Debug)]
struct SwapchainTarget {
    attachment: ImageAttachmentHandle,
    swapchain: SwapchainHandle,
    first_user: PassHandle,
    first_stages: PipelineStages,
    last_writer: PassHandle,
}

struct AcquiredImage {
    swapchain: SwapchainHandle,
    raw: GpuSwapchain,
    image_index: u32,
    acquired: GpuSemaphore,
    render_finished: GpuSemaphore,
    first_user: PassHandle,
    first_stages: PipelineStages,
    last_writer: PassHandle,
}

/// Drives frames in flight.
///
/// # Frame Slots
///
/// Frame `i` records into slot `i % frames_in_flight`. Beginning a frame
/// blocks until the slot's previous frame has finished on the GPU, then
/// recycles the slot's command lists and semaphores.
///
/// # Thread Safety
///
/// `FrameScheduler` is owned by the render thread. It is `Send` so it can be
/// moved there.
///
/// # Shutdown
///
/// Call [`wait_idle`](Self::wait_idle) before dropping the scheduler or the
/// resources its frames use. Dropping releases the slot fences and semaphores
/// without waiting.
pub struct FrameScheduler {
    backend: Arc<dyn GpuBackend>,
    config: SchedulerConfig,
    frames: Vec<FrameContext>,
    frame_index: u64,
    recording: bool,
    carried: HashMap<CarryKey, GpuSemaphore>,
    carries: CarryPool,
}

impl FrameScheduler {
    /// Create a scheduler submitting to `device`'s backend.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `frames_in_flight` is outside 1..=8.
    pub fn new(device: &Device, config: SchedulerConfig) -> Result<Self, GraphicsError> {
        config.validate()?;
        let backend = Arc::clone(device.backend());
        let frames = (0..config.frames_in_flight)
            .map(|_| FrameContext::new(backend.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "Scheduler: created with {} frames in flight on {}",
            config.frames_in_flight,
            backend.name()
        );
        Ok(Self {
            backend,
            config,
            frames,
            frame_index: 0,
            recording: false,
            carried: HashMap::new(),
            carries: CarryPool::default(),
        })
    }

    /// The configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of frame slots.
    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Index of the frame being recorded, or of the next one.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Slot of the frame being recorded, or of the next one.
    pub fn current_slot(&self) -> usize {
        (self.frame_index % self.frames.len() as u64) as usize
    }

    /// Returns true between `begin_frame` and `end_frame`.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Fence status of a slot, refreshed from the backend.
    pub fn slot_status(&mut self, slot: usize) -> Option<FenceStatus> {
        let backend = self.backend.as_ref();
        self.frames.get_mut(slot).map(|frame| frame.poll(backend))
    }

    /// Cross-frame semaphores waiting for a consumer.
    pub fn pending_carries(&self) -> usize {
        self.carried.len()
    }

    /// Begin a frame.
    ///
    /// Blocks until the GPU has finished the frame that last used this slot,
    /// then resets the slot's fence, command pools and semaphores. Returns
    /// the frame index.
    pub fn begin_frame(&mut self) -> Result<u64, GraphicsError> {
        if self.recording {
            return Err(GraphicsError::InvalidParameter(
                "begin_frame called twice without end_frame".to_string(),
            ));
        }
        let slot = self.current_slot();
        self.frames[slot].recycle(self.backend.as_ref(), &mut self.carries, self.frame_index)?;
        self.recording = true;
        log::trace!("Scheduler: begin frame {} (slot {})", self.frame_index, slot);
        Ok(self.frame_index)
    }

    /// Compile `graph`, submit its passes in order and present the
    /// swapchains it wrote.
    ///
    /// Swapchain images are bound to their attachments before recording.
    /// The graph is left intact; call [`RenderGraph::reset`] before building
    /// the next frame.
    ///
    /// # Errors
    ///
    /// Compilation errors, backend failures and misuse of swapchain
    /// attachments. Swapchain invalidation is not an error; see
    /// [`FrameOutcome::needs_swapchain_recreation`].
    pub fn end_frame(
        &mut self,
        device: &Device,
        graph: &mut RenderGraph,
    ) -> Result<FrameOutcome, GraphicsError> {
        if !self.recording {
            return Err(GraphicsError::InvalidParameter(
                "end_frame called without begin_frame".to_string(),
            ));
        }
        self.recording = false;

        let compiled = graph.compile()?;
        let outcome = self.submit_frame(device, graph, &compiled)?;
        log::debug!(
            "Scheduler: frame {} done: {} passes, {} submissions, {} semaphores, {} presents",
            outcome.frame_index,
            outcome.pass_count,
            outcome.submission_count,
            outcome.semaphore_count,
            outcome.presents.len()
        );
        self.frame_index += 1;
        Ok(outcome)
    }

    /// Block until every slot's submitted frame has finished.
    pub fn wait_idle(&mut self) -> Result<(), GraphicsError> {
        log::trace!("Scheduler: waiting for idle ({} slots)", self.frames.len());
        for frame in &mut self.frames {
            frame.wait(self.backend.as_ref())?;
        }
        log::trace!("Scheduler: idle");
        Ok(())
    }

    fn submit_frame(
        &mut self,
        device: &Device,
        graph: &mut RenderGraph,
        compiled: &CompiledGraph,
    ) -> Result<FrameOutcome, GraphicsError> {
        let backend = Arc::clone(&self.backend);
        let backend = backend.as_ref();
        let frame_index = self.frame_index;
        let slot = self.current_slot();
        let frame = &mut self.frames[slot];
        let fence = frame.fence();

        // Swapchains first: a failed acquire skips the frame before any
        // state below is touched. Everything that can be rejected is checked
        // before the first image is acquired.
        let targets = swapchain_targets(device, graph, compiled)?;
        let mut acquired: Vec<AcquiredImage> = Vec::with_capacity(targets.len());
        let result = acquire_images(backend, frame, device, graph, &targets, &mut acquired);
        match result {
            Ok(None) => {}
            Ok(Some(invalidated)) => {
                log::warn!(
                    "Scheduler: {:?} invalidated at acquire, skipping frame {}",
                    invalidated,
                    frame_index
                );
                release_acquired(backend, &acquired)?;
                return Ok(FrameOutcome::skipped(frame_index, invalidated));
            }
            Err(error) => {
                // Leave no acquire semaphore signaled for the next attempt.
                if let Err(drain) = release_acquired(backend, &acquired) {
                    log::warn!("Scheduler: failed to drain acquired images: {}", drain);
                }
                return Err(error);
            }
        }

        let order = compiled.pass_order();
        let pass_slots = graph.pass_count();
        let mut waits: Vec<Vec<SemaphoreWait>> = vec![Vec::new(); pass_slots];
        let mut signals: Vec<Vec<GpuSemaphore>> = vec![Vec::new(); pass_slots];

        // One semaphore per producer/consumer edge. Producers precede their
        // consumers in `order`, so every wait finds its semaphore.
        let mut edges: HashMap<(PassHandle, PassHandle), GpuSemaphore> = HashMap::new();
        for &pass in order {
            let sync = compiled.sync(pass);
            for wait in sync.waits() {
                if let Some(&semaphore) = edges.get(&(wait.producer, pass)) {
                    waits[pass.index()].push(SemaphoreWait::new(semaphore, wait.stages));
                }
            }
            for &consumer in sync.consumers() {
                let semaphore = frame.semaphores.acquire(backend)?;
                signals[pass.index()].push(semaphore);
                edges.insert((pass, consumer), semaphore);
            }
        }

        for image in &acquired {
            waits[image.first_user.index()]
                .push(SemaphoreWait::new(image.acquired, image.first_stages));
            signals[image.last_writer.index()].push(image.render_finished);
        }

        // Imported attachments: wait on last frame's carry, signal the next.
        let mut consumed: Vec<GpuSemaphore> = Vec::new();
        let mut new_carries: Vec<(CarryKey, GpuSemaphore)> = Vec::new();
        for access in compiled.external_accesses() {
            if access.lifetime != AttachmentLifetime::Imported {
                continue;
            }
            let Some(key) = carry_key(graph, access.attachment) else {
                continue;
            };
            if let Some(semaphore) = self.carried.remove(&key) {
                waits[access.first_user.index()]
                    .push(SemaphoreWait::new(semaphore, access.first_stages));
                consumed.push(semaphore);
            }
            if self.config.carry_imported_signals
                && let Some(writer) = access.last_writer
            {
                let semaphore = self.carries.acquire(backend)?;
                signals[writer.index()].push(semaphore);
                new_carries.push((key, semaphore));
            }
        }
        // Carries of resources this frame does not touch are drained by the
        // first submission so none stays signaled.
        let mut stale: Vec<SemaphoreWait> = self
            .carried
            .drain()
            .map(|(_, semaphore)| SemaphoreWait::new(semaphore, PipelineStages::all()))
            .collect();
        consumed.extend(stale.iter().map(|wait| wait.semaphore));

        // Work on other queues must finish before the fence signals.
        if let Some(&final_pass) = order.last() {
            let final_queue = graph.passes()[final_pass.index()].queue();
            let mut tails: [Option<PassHandle>; QueueType::COUNT] = [None; QueueType::COUNT];
            for &pass in order {
                tails[graph.passes()[pass.index()].queue().index()] = Some(pass);
            }
            for (queue, tail) in QueueType::ALL.into_iter().zip(tails) {
                if let Some(tail) = tail
                    && queue != final_queue
                {
                    let semaphore = frame.semaphores.acquire(backend)?;
                    signals[tail.index()].push(semaphore);
                    waits[final_pass.index()]
                        .push(SemaphoreWait::new(semaphore, PipelineStages::all()));
                }
            }
            if let Some(&first_pass) = order.first() {
                waits[first_pass.index()].append(&mut stale);
            }
        }

        let mut submission_count = 0;
        let mut semaphore_count = acquired.len();
        if order.is_empty() {
            backend.submit(
                &Submission::new(QueueType::Graphics)
                    .with_waits(&stale)
                    .with_fence(fence),
            )?;
            submission_count += 1;
            log::trace!("Scheduler: frame {} is empty", frame_index);
        }
        for (position, &handle) in order.iter().enumerate() {
            let pass = graph.pass_mut(handle);
            let queue = pass.queue();
            let area = if pass.is_graphics() {
                pass.render_area()
            } else {
                None
            };
            let pool = frame.pool_mut(queue);
            let mark = pool.mark();

            let list = pool.acquire();
            list.set_label(pass.name());
            if let Some(area) = area {
                list.set_render_area(area);
            }
            pass.record(list);
            for recorded in pass.command_lists() {
                let list = pool.acquire();
                list.set_label(recorded.label().unwrap_or(pass.name()));
                if let Some(area) = area {
                    list.set_render_area(area);
                }
                list.extend_from(recorded);
            }

            let index = handle.index();
            let mut submission = Submission::new(queue)
                .with_command_lists(pool.batch(mark))
                .with_waits(&waits[index])
                .with_signals(&signals[index]);
            if position + 1 == order.len() {
                submission = submission.with_fence(fence);
            }
            log::trace!(
                "Scheduler: submit '{}' to {} queue ({} waits, {} signals)",
                pass.name(),
                queue.name(),
                waits[index].len(),
                signals[index].len()
            );
            backend.submit(&submission)?;
            submission_count += 1;
            semaphore_count += signals[index].len();
        }
        frame.mark_submitted();

        for semaphore in consumed {
            frame.retire_carry(semaphore);
        }
        self.carried.extend(new_carries);

        let mut presents = Vec::with_capacity(acquired.len());
        for image in &acquired {
            let request = PresentRequest {
                swapchain: image.raw,
                image_index: image.image_index,
                wait_semaphores: std::slice::from_ref(&image.render_finished),
            };
            let status = match backend.present(&request) {
                Ok(()) => PresentStatus::Presented,
                Err(GraphicsError::SwapchainOutOfDate) => PresentStatus::OutOfDate,
                Err(GraphicsError::SwapchainSurfaceLost) => PresentStatus::SurfaceLost,
                Err(error) => return Err(error),
            };
            if status != PresentStatus::Presented {
                log::warn!(
                    "Scheduler: present of {:?} failed: {:?}",
                    image.swapchain,
                    status
                );
            }
            presents.push(PresentOutcome {
                swapchain: image.swapchain,
                image_index: image.image_index,
                status,
            });
        }

        Ok(FrameOutcome {
            frame_index,
            pass_count: order.len(),
            submission_count,
            semaphore_count,
            presents,
            acquire_failure: None,
        })
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        let backend = self.backend.as_ref();
        for frame in &mut self.frames {
            if frame.poll(backend) == FenceStatus::Pending {
                log::warn!("Scheduler: dropped while a frame is in flight");
            }
            frame.destroy(backend, &mut self.carries);
        }
        for (_, semaphore) in self.carried.drain() {
            backend.destroy_semaphore(semaphore);
        }
        self.carries.destroy(backend);
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("frame_index", &self.frame_index)
            .field("recording", &self.recording)
            .field("pending_carries", &self.carried.len())
            .field("carry_semaphores", &self.carries.created())
            .finish()
    }
}

static_assertions::assert_impl_all!(FrameScheduler: Send);
static_assertions::assert_impl_all!(SchedulerConfig: Send, Sync);

/// Consume the acquire semaphores of a skipped frame.
/// Swapchain attachments used by the frame, validated.
fn swapchain_targets(
    device: &Device,
    graph: &RenderGraph,
    compiled: &CompiledGraph,
) -> Result<Vec<SwapchainTarget>, GraphicsError> {
    let mut targets: Vec<SwapchainTarget> = Vec::new();
    for access in compiled.external_accesses() {
        let AttachmentId::Image(attachment) = access.attachment else {
            continue;
        };
        if access.lifetime != AttachmentLifetime::Swapchain {
            continue;
        }
        let image = graph.registry().resolve_image(attachment);
        let Some(swapchain) = image.swapchain() else {
            continue;
        };
        let Some(last_writer) = access.last_writer else {
            return Err(GraphicsError::InvalidParameter(format!(
                "swapchain attachment '{}' is used but never written",
                image.name()
            )));
        };
        if targets.iter().any(|target| target.swapchain == swapchain) {
            return Err(GraphicsError::InvalidParameter(format!(
                "{swapchain:?} is imported by more than one attachment"
            )));
        }
        if device.swapchain(swapchain).is_none() {
            return Err(GraphicsError::InvalidHandle(format!("{swapchain:?}")));
        }
        targets.push(SwapchainTarget {
            attachment,
            swapchain,
            first_user: access.first_user,
            first_stages: access.first_stages,
            last_writer,
        });
    }
    Ok(targets)
}

/// Acquire and bind one image per target.
///
/// Returns the swapchain that was invalidated, if any. Images acquired
/// before a failure stay in `acquired` so the caller can drain them.
fn acquire_images(
    backend: &dyn GpuBackend,
    frame: &mut FrameContext,
    device: &Device,
    graph: &mut RenderGraph,
    targets: &[SwapchainTarget],
    acquired: &mut Vec<AcquiredImage>,
) -> Result<Option<SwapchainHandle>, GraphicsError> {
    for target in targets {
        let swapchain = device
            .swapchain(target.swapchain)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("{:?}", target.swapchain)))?;
        let semaphore = frame.semaphores.acquire(backend)?;
        let render_finished = frame.semaphores.acquire(backend)?;
        let image_index = match backend.acquire_next_image(swapchain.raw(), semaphore) {
            Ok(index) => index,
            Err(error) if error.is_swapchain_invalidated() => {
                log::trace!("Scheduler: acquire on {:?} failed: {}", target.swapchain, error);
                return Ok(Some(target.swapchain));
            }
            Err(error) => return Err(error),
        };
        acquired.push(AcquiredImage {
            swapchain: target.swapchain,
            raw: swapchain.raw(),
            image_index,
            acquired: semaphore,
            render_finished,
            first_user: target.first_user,
            first_stages: target.first_stages,
            last_writer: target.last_writer,
        });
        let image = swapchain.image(image_index).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!(
                "{:?} returned image index {image_index} out of range",
                target.swapchain
            ))
        })?;
        graph.registry_mut().bind_image(target.attachment, image)?;
        log::trace!(
            "Scheduler: acquired image {} of {:?}",
            image_index,
            target.swapchain
        );
    }
    Ok(None)
}

fn release_acquired(
    backend: &dyn GpuBackend,
    acquired: &[AcquiredImage],
) -> Result<(), GraphicsError> {
    if acquired.is_empty() {
        return Ok(());
    }
    let waits: Vec<SemaphoreWait> = acquired
        .iter()
        .map(|image| SemaphoreWait::new(image.acquired, PipelineStages::all()))
        .collect();
    backend.submit(&Submission::new(QueueType::Graphics).with_waits(&waits))
}

fn carry_key(graph: &RenderGraph, attachment: AttachmentId) -> Option<CarryKey> {
    match attachment {
        AttachmentId::Image(handle) => graph
            .registry()
            .image(handle)?
            .resource()
            .map(CarryKey::Image),
        AttachmentId::Buffer(handle) => graph
            .registry()
            .buffer(handle)?
            .resource()
            .map(CarryKey::Buffer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{CompletionMode, DummyBackend, DummyBackendConfig};
    use crate::device::DeviceParameters;
    use crate::graph::{
        Command, CommandList, DispatchCommand, DrawCommand, LoadOp, TransientImageDescriptor,
    };
    use crate::resources::SwapchainDescriptor;
    use crate::types::{
        Access, BufferDescriptor, BufferUsage, ImageFormat, ImageUsage, RenderArea,
    };

    fn setup(config: DummyBackendConfig) -> (Arc<DummyBackend>, Device) {
        let backend = Arc::new(DummyBackend::with_config(config));
        let device = Device::with_backend(backend.clone(), DeviceParameters::default());
        (backend, device)
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = SchedulerConfig::default();
        assert_eq!(config.frames_in_flight, 2);
        assert!(config.carry_imported_signals);
        assert!(config.validate().is_ok());

        assert!(SchedulerConfig::new().with_frames_in_flight(0).validate().is_err());
        assert!(SchedulerConfig::new().with_frames_in_flight(9).validate().is_err());
        assert!(SchedulerConfig::new().with_frames_in_flight(8).validate().is_ok());
    }

    #[test]
    fn test_env_override() {
        let config = SchedulerConfig::default();
        assert_eq!(config.with_env_override(Some("3")).frames_in_flight, 3);
        assert_eq!(config.with_env_override(Some(" 1 ")).frames_in_flight, 1);
        // Invalid values keep the default.
        assert_eq!(config.with_env_override(Some("0")).frames_in_flight, 2);
        assert_eq!(config.with_env_override(Some("twelve")).frames_in_flight, 2);
        assert_eq!(config.with_env_override(None).frames_in_flight, 2);
    }

    #[test]
    fn test_begin_end_pairing() {
        let (_backend, device) = setup(DummyBackendConfig::default());
        let mut scheduler = FrameScheduler::new(&device, SchedulerConfig::default()).unwrap();
        let mut graph = RenderGraph::new();

        assert!(scheduler.end_frame(&device, &mut graph).is_err());
        assert_eq!(scheduler.begin_frame().unwrap(), 0);
        assert!(scheduler.begin_frame().is_err());
        scheduler.end_frame(&device, &mut graph).unwrap();
        assert_eq!(scheduler.frame_index(), 1);
        assert_eq!(scheduler.current_slot(), 1);
    }

    #[test]
    fn test_empty_frame_submits_fence() {
        let (backend, device) = setup(DummyBackendConfig::default());
        let mut scheduler = FrameScheduler::new(&device, SchedulerConfig::default()).unwrap();
        let mut graph = RenderGraph::new();

        scheduler.begin_frame().unwrap();
        let outcome = scheduler.end_frame(&device, &mut graph).unwrap();
        assert_eq!(outcome.pass_count(), 0);
        assert_eq!(outcome.submission_count(), 1);
        assert!(outcome.is_submitted());

        let submissions = backend.submissions();
        assert_eq!(submissions.len(), 1);
        assert!(submissions[0].fence.is_some());
        assert!(submissions[0].command_lists.is_empty());
    }

    #[test]
    fn test_edge_semaphores() {
        let (backend, device) = setup(DummyBackendConfig::default());
        let mut scheduler = FrameScheduler::new(&device, SchedulerConfig::default()).unwrap();
        let mut graph = RenderGraph::new();

        let color = graph
            .create_transient_image(
                "color",
                TransientImageDescriptor::new_2d(64, 64, ImageFormat::Rgba8Unorm),
            )
            .unwrap();
        let draw = graph.add_graphics_pass("draw");
        graph.use_render_target(draw, color, LoadOp::DontCare).unwrap();
        let blur = graph.add_compute_pass("blur");
        graph.use_shader_input(blur, color).unwrap();

        scheduler.begin_frame().unwrap();
        let outcome = scheduler.end_frame(&device, &mut graph).unwrap();
        assert_eq!(outcome.pass_count(), 2);
        // One edge plus the graphics queue tail the compute pass waits on.
        assert_eq!(outcome.semaphore_count(), 2);

        let submissions = backend.submissions();
        assert_eq!(submissions[0].label(), Some("draw"));
        assert_eq!(submissions[0].signals.len(), 2);
        assert!(submissions[0].fence.is_none());
        assert_eq!(submissions[1].label(), Some("blur"));
        assert!(submissions[1].waits_on(submissions[0].signals[0]));
        assert!(submissions[1].fence.is_some());
    }

    #[test]
    fn test_graphics_lists_start_with_render_area() {
        let (backend, device) = setup(DummyBackendConfig::default());
        let mut scheduler = FrameScheduler::new(&device, SchedulerConfig::default()).unwrap();
        let mut graph = RenderGraph::new();

        let color = graph
            .create_transient_image(
                "color",
                TransientImageDescriptor::new_2d(128, 32, ImageFormat::Rgba8Unorm),
            )
            .unwrap();
        let draw = graph.add_graphics_pass("draw");
        graph.use_render_target(draw, color, LoadOp::DontCare).unwrap();
        graph.set_recorder(draw, |list: &mut CommandList| list.submit(DrawCommand::new(3)));
        graph
            .record(
                draw,
                CommandList::new(QueueType::Graphics).with_label("overlay"),
            )
            .unwrap();
        let compute = graph.add_compute_pass("compute");
        graph.set_recorder(compute, |list: &mut CommandList| {
            list.submit(DispatchCommand::new(8, 8, 1))
        });

        scheduler.begin_frame().unwrap();
        scheduler.end_frame(&device, &mut graph).unwrap();

        let submissions = backend.submissions();
        let lists = &submissions[0].command_lists;
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[1].label(), Some("overlay"));
        for list in lists {
            assert_eq!(
                list.commands()[0],
                Command::SetRenderArea(RenderArea::from_dimensions(128, 32))
            );
        }
        assert_eq!(lists[0].len(), 2);
        assert!(matches!(
            submissions[1].command_lists[0].commands(),
            [Command::Dispatch(_)]
        ));
    }

    #[test]
    fn test_imported_writes_carry_to_next_frame() {
        let (backend, mut device) = setup(DummyBackendConfig::default());
        let mut scheduler = FrameScheduler::new(&device, SchedulerConfig::default()).unwrap();
        let particles = device
            .create_buffer(&BufferDescriptor::new(4096, BufferUsage::STORAGE))
            .unwrap();

        let build = |graph: &mut RenderGraph, device: &Device| {
            let state = graph.import_buffer("particles", device, particles).unwrap();
            let simulate = graph.add_compute_pass("simulate");
            graph.use_storage_buffer(simulate, state, Access::ReadWrite).unwrap();
        };

        let mut graph = RenderGraph::new();
        scheduler.begin_frame().unwrap();
        build(&mut graph, &device);
        scheduler.end_frame(&device, &mut graph).unwrap();
        assert_eq!(scheduler.pending_carries(), 1);
        let carry = backend.submissions()[0].signals[0];

        graph.reset();
        scheduler.begin_frame().unwrap();
        build(&mut graph, &device);
        scheduler.end_frame(&device, &mut graph).unwrap();
        let submissions = backend.submissions();
        assert!(submissions[1].waits_on(carry));
        assert_eq!(scheduler.pending_carries(), 1);

        // A frame that ignores the buffer still drains the carry.
        graph.reset();
        scheduler.begin_frame().unwrap();
        scheduler.end_frame(&device, &mut graph).unwrap();
        assert_eq!(scheduler.pending_carries(), 0);
        assert_eq!(backend.submissions()[2].waits.len(), 1);
    }

    #[test]
    fn test_carry_disabled() {
        let (backend, mut device) = setup(DummyBackendConfig::default());
        let config = SchedulerConfig::new().with_carry_imported_signals(false);
        let mut scheduler = FrameScheduler::new(&device, config).unwrap();
        let particles = device
            .create_buffer(&BufferDescriptor::new(256, BufferUsage::STORAGE))
            .unwrap();

        let mut graph = RenderGraph::new();
        let state = graph.import_buffer("particles", &device, particles).unwrap();
        let simulate = graph.add_compute_pass("simulate");
        graph.use_storage_buffer(simulate, state, Access::Write).unwrap();

        scheduler.begin_frame().unwrap();
        scheduler.end_frame(&device, &mut graph).unwrap();
        assert_eq!(scheduler.pending_carries(), 0);
        assert!(backend.submissions()[0].signals.is_empty());
    }

    #[test]
    fn test_swapchain_acquire_and_present() {
        let (backend, mut device) = setup(DummyBackendConfig::default());
        let mut scheduler = FrameScheduler::new(&device, SchedulerConfig::default()).unwrap();
        let swapchain = device
            .create_swapchain(&SwapchainDescriptor::new(320, 240, ImageFormat::Bgra8Unorm))
            .unwrap();

        for frame in 0..3u32 {
            let mut graph = RenderGraph::new();
            let backbuffer = graph.import_swapchain("backbuffer", &device, swapchain).unwrap();
            let main = graph.add_graphics_pass("main");
            graph
                .use_render_target(main, backbuffer, LoadOp::clear_color(0.0, 0.0, 0.0, 1.0))
                .unwrap();

            scheduler.begin_frame().unwrap();
            let outcome = scheduler.end_frame(&device, &mut graph).unwrap();
            assert_eq!(outcome.presents().len(), 1);
            assert_eq!(outcome.presents()[0].status, PresentStatus::Presented);
            assert!(!outcome.needs_swapchain_recreation());

            let bound = graph.registry().resolve_image(backbuffer).resource();
            let index = outcome.presents()[0].image_index;
            assert_eq!(bound, device.resolve_swapchain(swapchain).image(index));
            assert_eq!(index, frame % device.resolve_swapchain(swapchain).images().len() as u32);
        }

        let presents = backend.presents();
        let submissions = backend.submissions();
        assert_eq!(presents.len(), 3);
        assert_eq!(submissions.len(), 3);
        // The present waits on what the writer signaled.
        assert_eq!(presents[0].waits, submissions[0].signals);
    }

    #[test]
    fn test_swapchain_must_be_written() {
        let (_backend, mut device) = setup(DummyBackendConfig::default());
        let mut scheduler = FrameScheduler::new(&device, SchedulerConfig::default()).unwrap();
        let swapchain = device
            .create_swapchain(
                &SwapchainDescriptor::new(64, 64, ImageFormat::Bgra8Unorm)
                    .with_usage(ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED),
            )
            .unwrap();

        let mut graph = RenderGraph::new();
        let backbuffer = graph.import_swapchain("backbuffer", &device, swapchain).unwrap();
        let read = graph.add_graphics_pass("read");
        graph.use_shader_input(read, backbuffer).unwrap();

        scheduler.begin_frame().unwrap();
        assert!(matches!(
            scheduler.end_frame(&device, &mut graph),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_depth_one_waits_every_frame() {
        let (backend, device) = setup(
            DummyBackendConfig::new().with_completion(CompletionMode::Manual),
        );
        let config = SchedulerConfig::new().with_frames_in_flight(1);
        let mut scheduler = FrameScheduler::new(&device, config).unwrap();
        let mut graph = RenderGraph::new();

        scheduler.begin_frame().unwrap();
        scheduler.end_frame(&device, &mut graph).unwrap();
        assert_eq!(scheduler.slot_status(0), Some(FenceStatus::Pending));

        backend.complete_all();
        assert_eq!(scheduler.slot_status(0), Some(FenceStatus::Signaled));
        scheduler.begin_frame().unwrap();
        assert_eq!(scheduler.slot_status(0), Some(FenceStatus::NotSubmitted));
        scheduler.end_frame(&device, &mut graph).unwrap();

        backend.complete_all();
        scheduler.wait_idle().unwrap();
        assert_eq!(backend.pending_count(), 0);
    }
}
