//! Per-slot frame state.

use crate::backend::{GpuBackend, GpuFence, GpuSemaphore};
use crate::error::GraphicsError;
use crate::graph::CommandList;
use crate::types::QueueType;

use super::sync::{CarryPool, FenceStatus, SemaphorePool};

/// Command lists for one queue, recycled once per frame.
///
/// Lists are handed out in batches: a pass takes a contiguous run of lists
/// and submits them as one slice.
#[derive(Debug)]
pub(crate) struct CommandPool {
    queue: QueueType,
    lists: Vec<CommandList>,
    used: usize,
}

impl CommandPool {
    pub(crate) fn new(queue: QueueType) -> Self {
        Self {
            queue,
            lists: Vec::new(),
            used: 0,
        }
    }

    /// Start of the next batch.
    pub(crate) fn mark(&self) -> usize {
        self.used
    }

    /// Take a cleared list.
    pub(crate) fn acquire(&mut self) -> &mut CommandList {
        if self.used == self.lists.len() {
            self.lists.push(CommandList::new(self.queue));
        }
        let list = &mut self.lists[self.used];
        list.reset_for(self.queue);
        self.used += 1;
        list
    }

    /// Lists acquired since `mark`.
    pub(crate) fn batch(&self, mark: usize) -> &[CommandList] {
        &self.lists[mark..self.used]
    }

    /// Lists acquired this frame.
    pub(crate) fn in_use(&self) -> usize {
        self.used
    }

    pub(crate) fn reset(&mut self) {
        self.used = 0;
    }
}

/// Everything a frame in flight owns.
///
/// A slot is reused every `frames_in_flight` frames. Its fence guards the
/// command pools, semaphores and retired carries: none of them may be
/// touched until the fence signals.
#[derive(Debug)]
pub(crate) struct FrameContext {
    fence: GpuFence,
    status: FenceStatus,
    frame_index: Option<u64>,
    pools: [CommandPool; QueueType::COUNT],
    pub(crate) semaphores: SemaphorePool,
    retired_carries: Vec<GpuSemaphore>,
}

impl FrameContext {
    pub(crate) fn new(backend: &dyn GpuBackend) -> Result<Self, GraphicsError> {
        Ok(Self {
            fence: backend.create_fence(false)?,
            status: FenceStatus::NotSubmitted,
            frame_index: None,
            pools: QueueType::ALL.map(CommandPool::new),
            semaphores: SemaphorePool::default(),
            retired_carries: Vec::new(),
        })
    }

    pub(crate) fn fence(&self) -> GpuFence {
        self.fence
    }

    /// Current status, refreshed from the backend.
    pub(crate) fn poll(&mut self, backend: &dyn GpuBackend) -> FenceStatus {
        if self.status == FenceStatus::Pending && backend.is_fence_signaled(self.fence) {
            self.status = FenceStatus::Signaled;
        }
        self.status
    }

    pub(crate) fn pool_mut(&mut self, queue: QueueType) -> &mut CommandPool {
        &mut self.pools[queue.index()]
    }

    /// Block until the slot's submission completes.
    pub(crate) fn wait(&mut self, backend: &dyn GpuBackend) -> Result<(), GraphicsError> {
        if self.status == FenceStatus::Pending {
            backend.wait_fence(self.fence)?;
            self.status = FenceStatus::Signaled;
        }
        Ok(())
    }

    /// Wait for the slot, then make it ready to record `frame_index`.
    pub(crate) fn recycle(
        &mut self,
        backend: &dyn GpuBackend,
        carries: &mut CarryPool,
        frame_index: u64,
    ) -> Result<(), GraphicsError> {
        if let Some(previous) = self.frame_index
            && self.status == FenceStatus::Pending
        {
            log::trace!(
                "FrameContext: frame {} waits for frame {}",
                frame_index,
                previous
            );
        }
        self.wait(backend)?;
        if self.status == FenceStatus::Signaled {
            backend.reset_fence(self.fence)?;
            self.status = FenceStatus::NotSubmitted;
        }
        log::trace!(
            "FrameContext: recycling {} of {} semaphores, {} command lists",
            self.semaphores.in_use(),
            self.semaphores.capacity(),
            self.pools.iter().map(CommandPool::in_use).sum::<usize>()
        );
        for pool in &mut self.pools {
            pool.reset();
        }
        self.semaphores.reset();
        carries.release(self.retired_carries.drain(..));
        self.frame_index = Some(frame_index);
        Ok(())
    }

    /// A carry waited in this frame; reusable after the fence.
    pub(crate) fn retire_carry(&mut self, semaphore: GpuSemaphore) {
        self.retired_carries.push(semaphore);
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.status = FenceStatus::Pending;
    }

    pub(crate) fn destroy(&mut self, backend: &dyn GpuBackend, carries: &mut CarryPool) {
        self.semaphores.destroy(backend);
        carries.release(self.retired_carries.drain(..));
        backend.destroy_fence(self.fence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Submission;
    use crate::backend::dummy::{CompletionMode, DummyBackend, DummyBackendConfig};

    #[test]
    fn test_command_pool_batches() {
        let mut pool = CommandPool::new(QueueType::Compute);
        let mark = pool.mark();
        pool.acquire().set_label("a");
        pool.acquire().set_label("b");
        assert_eq!(pool.batch(mark).len(), 2);

        let second = pool.mark();
        pool.acquire();
        assert_eq!(pool.batch(second).len(), 1);
        assert_eq!(pool.in_use(), 3);

        pool.reset();
        assert_eq!(pool.in_use(), 0);
        // Labels survive until the list is relabeled; commands do not.
        assert!(pool.acquire().is_empty());
    }

    #[test]
    fn test_recycle_waits_and_resets_fence() {
        let backend = DummyBackend::with_config(
            DummyBackendConfig::new().with_completion(CompletionMode::Manual),
        );
        let mut carries = CarryPool::default();
        let mut frame = FrameContext::new(&backend).unwrap();
        frame.recycle(&backend, &mut carries, 0).unwrap();

        backend
            .submit(&Submission::new(QueueType::Graphics).with_fence(frame.fence()))
            .unwrap();
        frame.mark_submitted();
        assert_eq!(frame.poll(&backend), FenceStatus::Pending);

        backend.complete_all();
        assert_eq!(frame.poll(&backend), FenceStatus::Signaled);

        frame.recycle(&backend, &mut carries, 2).unwrap();
        assert_eq!(frame.poll(&backend), FenceStatus::NotSubmitted);
        assert!(!backend.is_fence_signaled(frame.fence()));
        assert_eq!(frame.frame_index, Some(2));
    }

    #[test]
    fn test_retired_carries_return_on_recycle() {
        let backend = DummyBackend::new();
        let mut carries = CarryPool::default();
        let mut frame = FrameContext::new(&backend).unwrap();

        let carry = carries.acquire(&backend).unwrap();
        frame.retire_carry(carry);
        frame.recycle(&backend, &mut carries, 1).unwrap();
        assert_eq!(carries.acquire(&backend).unwrap(), carry);
    }
}
