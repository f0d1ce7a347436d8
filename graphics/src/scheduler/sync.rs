//! Semaphore recycling.
//!
//! Binary semaphores are signaled once and waited once. A frame slot hands
//! them out from its pool while recording and takes them all back when the
//! slot's fence has signaled, at which point every wait recorded in that
//! frame has completed.

use crate::backend::{GpuBackend, GpuSemaphore};
use crate::error::GraphicsError;

/// Status of a frame slot's fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FenceStatus {
    /// Nothing was submitted with the fence since its last reset.
    #[default]
    NotSubmitted,
    /// Submitted; the GPU has not finished the frame yet.
    Pending,
    /// The GPU finished the frame.
    Signaled,
}

/// Per-slot pool of binary semaphores.
///
/// Semaphores are created lazily and reused in the same order every frame,
/// so a steady-state graph allocates nothing after the first frames.
#[derive(Debug, Default)]
pub(crate) struct SemaphorePool {
    semaphores: Vec<GpuSemaphore>,
    cursor: usize,
}

impl SemaphorePool {
    /// Hand out the next free semaphore, creating one if the pool is dry.
    pub(crate) fn acquire(
        &mut self,
        backend: &dyn GpuBackend,
    ) -> Result<GpuSemaphore, GraphicsError> {
        if self.cursor == self.semaphores.len() {
            let semaphore = backend.create_semaphore()?;
            log::trace!("SemaphorePool: created {:?}", semaphore);
            self.semaphores.push(semaphore);
        }
        let semaphore = self.semaphores[self.cursor];
        self.cursor += 1;
        Ok(semaphore)
    }

    /// Semaphores handed out since the last reset.
    pub(crate) fn in_use(&self) -> usize {
        self.cursor
    }

    /// Total semaphores owned.
    pub(crate) fn capacity(&self) -> usize {
        self.semaphores.len()
    }

    /// Make every semaphore available again.
    pub(crate) fn reset(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn destroy(&mut self, backend: &dyn GpuBackend) {
        for semaphore in self.semaphores.drain(..) {
            backend.destroy_semaphore(semaphore);
        }
        self.cursor = 0;
    }
}

/// Semaphores carried between frames for imported attachments.
///
/// A carry is signaled by the last writer of an imported resource and waited
/// by the first user in a later frame. Once waited it is retired into the
/// waiting frame's slot and only returns to the free list after that slot's
/// fence signals.
#[derive(Debug, Default)]
pub(crate) struct CarryPool {
    free: Vec<GpuSemaphore>,
    created: usize,
}

impl CarryPool {
    pub(crate) fn acquire(
        &mut self,
        backend: &dyn GpuBackend,
    ) -> Result<GpuSemaphore, GraphicsError> {
        match self.free.pop() {
            Some(semaphore) => Ok(semaphore),
            None => {
                self.created += 1;
                backend.create_semaphore()
            }
        }
    }

    pub(crate) fn release(&mut self, semaphores: impl IntoIterator<Item = GpuSemaphore>) {
        self.free.extend(semaphores);
    }

    /// Carry semaphores ever created.
    pub(crate) fn created(&self) -> usize {
        self.created
    }

    pub(crate) fn destroy(&mut self, backend: &dyn GpuBackend) {
        for semaphore in self.free.drain(..) {
            backend.destroy_semaphore(semaphore);
        }
    }
}
