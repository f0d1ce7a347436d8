//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations but keeps enough state
//! to behave like a strict driver: fences, binary semaphores, buffer memory
//! and swapchain images are all tracked, and misuse is reported as an error.
//! Tests drive GPU completion through [`CompletionMode::Manual`].

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::{Condvar, Mutex};

use crate::error::GraphicsError;
use crate::graph::CommandList;
use crate::resources::{BufferViewDescriptor, ImageViewDescriptor, SwapchainDescriptor};
use crate::types::{BufferDescriptor, ImageDescriptor, QueueType, SamplerDescriptor};

use super::{
    GpuBackend, GpuBuffer, GpuBufferView, GpuFence, GpuImage, GpuImageView, GpuSampler,
    GpuSemaphore, GpuSwapchain, PresentRequest, SemaphoreWait, Submission,
};

/// When submitted work is considered complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompletionMode {
    /// Fences are signaled as soon as the submission is made.
    #[default]
    Immediate,
    /// Fences stay pending until [`DummyBackend::complete_next`] or
    /// [`DummyBackend::complete_all`] is called.
    Manual,
}

/// Configuration for the dummy backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DummyBackendConfig {
    /// Fence completion behavior.
    pub completion: CompletionMode,
    /// Simulated device memory in bytes; `None` is unlimited.
    pub memory_budget: Option<u64>,
}

impl DummyBackendConfig {
    /// Create a config with immediate completion and no budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the completion mode.
    pub fn with_completion(mut self, completion: CompletionMode) -> Self {
        self.completion = completion;
        self
    }

    /// Set the simulated memory budget.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }
}

/// A submission as observed by the dummy backend.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    /// Target queue.
    pub queue: QueueType,
    /// Command lists, in submission order.
    pub command_lists: Vec<CommandList>,
    /// Semaphores waited on.
    pub waits: Vec<SemaphoreWait>,
    /// Semaphores signaled.
    pub signals: Vec<GpuSemaphore>,
    /// Fence signaled on completion.
    pub fence: Option<GpuFence>,
}

impl SubmissionRecord {
    /// Label of the first command list, if any.
    pub fn label(&self) -> Option<&str> {
        self.command_lists.first().and_then(|list| list.label())
    }

    /// Returns true if this submission waits on `semaphore`.
    pub fn waits_on(&self, semaphore: GpuSemaphore) -> bool {
        self.waits.iter().any(|wait| wait.semaphore == semaphore)
    }
}

/// A present as observed by the dummy backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentRecord {
    /// Presented swapchain.
    pub swapchain: GpuSwapchain,
    /// Presented image index.
    pub image_index: u32,
    /// Semaphores waited on.
    pub waits: Vec<GpuSemaphore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwapchainHealth {
    Ok,
    OutOfDateAtPresent,
    OutOfDate,
}

#[derive(Debug)]
struct DummySwapchain {
    images: Vec<GpuImage>,
    next_image: u32,
    health: SwapchainHealth,
}

#[derive(Debug, Default)]
struct DummyBuffer {
    size: u64,
    mapped: bool,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct DummyState {
    next_id: u64,
    allocated: u64,
    images: HashMap<u64, u64>,
    buffers: HashMap<u64, DummyBuffer>,
    image_views: HashSet<u64>,
    buffer_views: HashSet<u64>,
    samplers: HashSet<u64>,
    fences: HashMap<u64, bool>,
    pending_fences: VecDeque<u64>,
    semaphores: HashMap<u64, bool>,
    swapchains: HashMap<u64, DummySwapchain>,
    submissions: Vec<SubmissionRecord>,
    presents: Vec<PresentRecord>,
}

impl DummyState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn reserve_memory(&mut self, bytes: u64, budget: Option<u64>) -> Result<(), GraphicsError> {
        let requested = self.allocated.saturating_add(bytes);
        if let Some(budget) = budget
            && requested > budget
        {
            log::warn!(
                "DummyBackend: allocation of {} bytes exceeds budget ({} of {} in use)",
                bytes,
                self.allocated,
                budget
            );
            return Err(GraphicsError::OutOfDeviceMemory);
        }
        self.allocated = requested;
        Ok(())
    }

    fn check_semaphore(&self, semaphore: GpuSemaphore, signaled: bool) -> Result<(), GraphicsError> {
        match self.semaphores.get(&semaphore.0) {
            None => Err(GraphicsError::InvalidHandle(format!("{semaphore:?}"))),
            Some(state) if *state != signaled => Err(GraphicsError::InvalidParameter(format!(
                "{semaphore:?} is {}",
                if *state { "already signaled" } else { "not signaled" }
            ))),
            Some(_) => Ok(()),
        }
    }

    fn signal_fence(&mut self, fence: u64) {
        if let Some(state) = self.fences.get_mut(&fence) {
            *state = true;
        }
    }

    fn buffer_mut(&mut self, buffer: GpuBuffer) -> Result<&mut DummyBuffer, GraphicsError> {
        self.buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("{buffer:?}")))
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    config: DummyBackendConfig,
    state: Mutex<DummyState>,
    fence_signaled: Condvar,
}

impl DummyBackend {
    /// Create a new dummy backend with immediate completion.
    pub fn new() -> Self {
        Self::with_config(DummyBackendConfig::default())
    }

    /// Create a dummy backend with the given configuration.
    pub fn with_config(config: DummyBackendConfig) -> Self {
        Self {
            config,
            state: Mutex::new(DummyState::default()),
            fence_signaled: Condvar::new(),
        }
    }

    /// The backend configuration.
    pub fn config(&self) -> &DummyBackendConfig {
        &self.config
    }

    /// Complete the oldest pending submission. Returns false if none is pending.
    pub fn complete_next(&self) -> bool {
        let mut state = self.state.lock();
        let Some(fence) = state.pending_fences.pop_front() else {
            return false;
        };
        state.signal_fence(fence);
        drop(state);
        self.fence_signaled.notify_all();
        true
    }

    /// Complete every pending submission. Returns how many were completed.
    pub fn complete_all(&self) -> usize {
        let mut state = self.state.lock();
        let pending: Vec<u64> = state.pending_fences.drain(..).collect();
        for fence in &pending {
            state.signal_fence(*fence);
        }
        drop(state);
        self.fence_signaled.notify_all();
        pending.len()
    }

    /// Number of fenced submissions not yet completed.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending_fences.len()
    }

    /// Make both acquire and present fail with `SwapchainOutOfDate`.
    pub fn invalidate_swapchain(&self, swapchain: GpuSwapchain) {
        if let Some(chain) = self.state.lock().swapchains.get_mut(&swapchain.0) {
            chain.health = SwapchainHealth::OutOfDate;
        }
    }

    /// Make the next present of `swapchain` fail with `SwapchainOutOfDate`.
    pub fn expire_swapchain_on_present(&self, swapchain: GpuSwapchain) {
        if let Some(chain) = self.state.lock().swapchains.get_mut(&swapchain.0) {
            chain.health = SwapchainHealth::OutOfDateAtPresent;
        }
    }

    /// All submissions made so far.
    pub fn submissions(&self) -> Vec<SubmissionRecord> {
        self.state.lock().submissions.clone()
    }

    /// Drain the submission log.
    pub fn take_submissions(&self) -> Vec<SubmissionRecord> {
        std::mem::take(&mut self.state.lock().submissions)
    }

    /// All presents made so far.
    pub fn presents(&self) -> Vec<PresentRecord> {
        self.state.lock().presents.clone()
    }

    /// Bytes of simulated device memory in use.
    pub fn allocated_bytes(&self) -> u64 {
        self.state.lock().allocated
    }

    /// Number of live images, including swapchain images.
    pub fn image_count(&self) -> usize {
        self.state.lock().images.len()
    }

    /// Number of live buffers.
    pub fn buffer_count(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Number of live semaphores.
    pub fn semaphore_count(&self) -> usize {
        self.state.lock().semaphores.len()
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<GpuImage, GraphicsError> {
        let bytes = descriptor.estimated_size();
        let mut state = self.state.lock();
        state.reserve_memory(bytes, self.config.memory_budget)?;
        let id = state.allocate_id();
        state.images.insert(id, bytes);
        log::trace!(
            "DummyBackend: creating image {:?} ({}x{}x{}, {} bytes)",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth,
            bytes
        );
        Ok(GpuImage(id))
    }

    fn destroy_image(&self, image: GpuImage) {
        let mut state = self.state.lock();
        if let Some(bytes) = state.images.remove(&image.0) {
            state.allocated -= bytes;
            log::trace!("DummyBackend: destroyed {:?}", image);
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError> {
        let mut state = self.state.lock();
        state.reserve_memory(descriptor.size, self.config.memory_budget)?;
        let id = state.allocate_id();
        state.buffers.insert(
            id,
            DummyBuffer {
                size: descriptor.size,
                ..Default::default()
            },
        );
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        Ok(GpuBuffer(id))
    }

    fn destroy_buffer(&self, buffer: GpuBuffer) {
        let mut state = self.state.lock();
        if let Some(removed) = state.buffers.remove(&buffer.0) {
            state.allocated -= removed.size;
            log::trace!("DummyBackend: destroyed {:?}", buffer);
        }
    }

    fn create_image_view(
        &self,
        image: GpuImage,
        descriptor: &ImageViewDescriptor,
    ) -> Result<GpuImageView, GraphicsError> {
        let mut state = self.state.lock();
        if !state.images.contains_key(&image.0) {
            return Err(GraphicsError::InvalidHandle(format!("{image:?}")));
        }
        let id = state.allocate_id();
        state.image_views.insert(id);
        log::trace!(
            "DummyBackend: creating view of {:?} (format: {:?}, range: {:?})",
            image,
            descriptor.format,
            descriptor.range
        );
        Ok(GpuImageView(id))
    }

    fn destroy_image_view(&self, view: GpuImageView) {
        self.state.lock().image_views.remove(&view.0);
    }

    fn create_buffer_view(
        &self,
        buffer: GpuBuffer,
        descriptor: &BufferViewDescriptor,
    ) -> Result<GpuBufferView, GraphicsError> {
        let mut state = self.state.lock();
        if !state.buffers.contains_key(&buffer.0) {
            return Err(GraphicsError::InvalidHandle(format!("{buffer:?}")));
        }
        let id = state.allocate_id();
        state.buffer_views.insert(id);
        log::trace!(
            "DummyBackend: creating view of {:?} (range: {:?})",
            buffer,
            descriptor.range
        );
        Ok(GpuBufferView(id))
    }

    fn destroy_buffer_view(&self, view: GpuBufferView) {
        self.state.lock().buffer_views.remove(&view.0);
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuSampler, GraphicsError> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.samplers.insert(id);
        log::trace!("DummyBackend: creating sampler {:?}", descriptor.label);
        Ok(GpuSampler(id))
    }

    fn destroy_sampler(&self, sampler: GpuSampler) {
        self.state.lock().samplers.remove(&sampler.0);
    }

    fn create_fence(&self, signaled: bool) -> Result<GpuFence, GraphicsError> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.fences.insert(id, signaled);
        Ok(GpuFence(id))
    }

    fn destroy_fence(&self, fence: GpuFence) {
        let mut state = self.state.lock();
        state.fences.remove(&fence.0);
        state.pending_fences.retain(|pending| *pending != fence.0);
    }

    fn wait_fence(&self, fence: GpuFence) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        loop {
            let signaled = state.fences.get(&fence.0).copied();
            match signaled {
                None => return Err(GraphicsError::InvalidHandle(format!("{fence:?}"))),
                Some(true) => return Ok(()),
                Some(false) if !state.pending_fences.contains(&fence.0) => {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "waiting on {fence:?} which has no pending submission"
                    )));
                }
                Some(false) => {
                    log::trace!("DummyBackend: blocking on {:?}", fence);
                    self.fence_signaled.wait(&mut state);
                }
            }
        }
    }

    fn is_fence_signaled(&self, fence: GpuFence) -> bool {
        self.state
            .lock()
            .fences
            .get(&fence.0)
            .copied()
            .unwrap_or(false)
    }

    fn reset_fence(&self, fence: GpuFence) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        if state.pending_fences.contains(&fence.0) {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot reset {fence:?} while its submission is pending"
            )));
        }
        match state.fences.get_mut(&fence.0) {
            Some(signaled) => {
                *signaled = false;
                Ok(())
            }
            None => Err(GraphicsError::InvalidHandle(format!("{fence:?}"))),
        }
    }

    fn create_semaphore(&self) -> Result<GpuSemaphore, GraphicsError> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.semaphores.insert(id, false);
        Ok(GpuSemaphore(id))
    }

    fn destroy_semaphore(&self, semaphore: GpuSemaphore) {
        self.state.lock().semaphores.remove(&semaphore.0);
    }

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<(GpuSwapchain, Vec<GpuImage>), GraphicsError> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        let images: Vec<GpuImage> = (0..descriptor.image_count)
            .map(|_| {
                let image = state.allocate_id();
                state.images.insert(image, 0);
                GpuImage(image)
            })
            .collect();
        state.swapchains.insert(
            id,
            DummySwapchain {
                images: images.clone(),
                next_image: 0,
                health: SwapchainHealth::Ok,
            },
        );
        log::trace!(
            "DummyBackend: creating swapchain {:?} ({}x{}, {} images)",
            descriptor.label,
            descriptor.extent.width,
            descriptor.extent.height,
            descriptor.image_count
        );
        Ok((GpuSwapchain(id), images))
    }

    fn destroy_swapchain(&self, swapchain: GpuSwapchain) {
        let mut state = self.state.lock();
        if let Some(chain) = state.swapchains.remove(&swapchain.0) {
            for image in chain.images {
                state.images.remove(&image.0);
            }
        }
    }

    fn acquire_next_image(
        &self,
        swapchain: GpuSwapchain,
        signal: GpuSemaphore,
    ) -> Result<u32, GraphicsError> {
        let mut state = self.state.lock();
        state.check_semaphore(signal, false)?;
        let chain = state
            .swapchains
            .get_mut(&swapchain.0)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("{swapchain:?}")))?;
        if chain.health == SwapchainHealth::OutOfDate {
            return Err(GraphicsError::SwapchainOutOfDate);
        }
        let index = chain.next_image;
        chain.next_image = (index + 1) % chain.images.len().max(1) as u32;
        state.semaphores.insert(signal.0, true);
        log::trace!("DummyBackend: acquired image {} of {:?}", index, swapchain);
        Ok(index)
    }

    fn map_buffer(&self, buffer: GpuBuffer) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        let entry = state.buffer_mut(buffer)?;
        if entry.mapped {
            return Err(GraphicsError::InvalidParameter(format!(
                "{buffer:?} is already mapped"
            )));
        }
        if entry.data.len() as u64 != entry.size {
            entry.data.resize(entry.size as usize, 0);
        }
        entry.mapped = true;
        Ok(())
    }

    fn unmap_buffer(&self, buffer: GpuBuffer) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        let entry = state.buffer_mut(buffer)?;
        if !entry.mapped {
            return Err(GraphicsError::InvalidParameter(format!(
                "{buffer:?} is not mapped"
            )));
        }
        entry.mapped = false;
        Ok(())
    }

    fn write_mapped(
        &self,
        buffer: GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        let entry = state.buffer_mut(buffer)?;
        if !entry.mapped {
            return Err(GraphicsError::InvalidParameter(format!(
                "{buffer:?} is not mapped"
            )));
        }
        let end = offset + data.len() as u64;
        if end > entry.size {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at {} overruns {:?} ({} bytes)",
                data.len(),
                offset,
                buffer,
                entry.size
            )));
        }
        entry.data[offset as usize..end as usize].copy_from_slice(data);
        log::trace!(
            "DummyBackend: write_mapped offset={} len={}",
            offset,
            data.len()
        );
        Ok(())
    }

    fn read_mapped(
        &self,
        buffer: GpuBuffer,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, GraphicsError> {
        let mut state = self.state.lock();
        let entry = state.buffer_mut(buffer)?;
        if !entry.mapped {
            return Err(GraphicsError::InvalidParameter(format!(
                "{buffer:?} is not mapped"
            )));
        }
        let end = offset + size;
        if end > entry.size {
            return Err(GraphicsError::InvalidParameter(format!(
                "read of {} bytes at {} overruns {:?} ({} bytes)",
                size, offset, buffer, entry.size
            )));
        }
        Ok(entry.data[offset as usize..end as usize].to_vec())
    }

    fn submit(&self, submission: &Submission<'_>) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        for wait in submission.wait_semaphores {
            state.check_semaphore(wait.semaphore, true)?;
        }
        for signal in submission.signal_semaphores {
            state.check_semaphore(*signal, false)?;
        }
        if let Some(fence) = submission.fence {
            match state.fences.get(&fence.0) {
                None => return Err(GraphicsError::InvalidHandle(format!("{fence:?}"))),
                Some(true) => {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "{fence:?} submitted while signaled"
                    )));
                }
                Some(false) => {}
            }
        }

        for wait in submission.wait_semaphores {
            state.semaphores.insert(wait.semaphore.0, false);
        }
        for signal in submission.signal_semaphores {
            state.semaphores.insert(signal.0, true);
        }

        log::trace!(
            "DummyBackend: submit to {} queue ({} lists, {} waits, {} signals, fence: {:?})",
            submission.queue.name(),
            submission.command_lists.len(),
            submission.wait_semaphores.len(),
            submission.signal_semaphores.len(),
            submission.fence
        );
        state.submissions.push(SubmissionRecord {
            queue: submission.queue,
            command_lists: submission.command_lists.to_vec(),
            waits: submission.wait_semaphores.to_vec(),
            signals: submission.signal_semaphores.to_vec(),
            fence: submission.fence,
        });

        let mut signaled = false;
        if let Some(fence) = submission.fence {
            match self.config.completion {
                CompletionMode::Immediate => {
                    state.signal_fence(fence.0);
                    signaled = true;
                }
                CompletionMode::Manual => state.pending_fences.push_back(fence.0),
            }
        }
        drop(state);
        if signaled {
            self.fence_signaled.notify_all();
        }
        Ok(())
    }

    fn present(&self, request: &PresentRequest<'_>) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        for wait in request.wait_semaphores {
            state.check_semaphore(*wait, true)?;
        }
        let health = match state.swapchains.get(&request.swapchain.0) {
            Some(chain) => chain.health,
            None => {
                return Err(GraphicsError::InvalidHandle(format!(
                    "{:?}",
                    request.swapchain
                )));
            }
        };
        for wait in request.wait_semaphores {
            state.semaphores.insert(wait.0, false);
        }
        match health {
            SwapchainHealth::Ok => {
                state.presents.push(PresentRecord {
                    swapchain: request.swapchain,
                    image_index: request.image_index,
                    waits: request.wait_semaphores.to_vec(),
                });
                log::trace!(
                    "DummyBackend: presented image {} of {:?}",
                    request.image_index,
                    request.swapchain
                );
                Ok(())
            }
            SwapchainHealth::OutOfDateAtPresent | SwapchainHealth::OutOfDate => {
                if let Some(chain) = state.swapchains.get_mut(&request.swapchain.0) {
                    chain.health = SwapchainHealth::OutOfDate;
                }
                Err(GraphicsError::SwapchainOutOfDate)
            }
        }
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send, Sync);
