//! Transient memory aliasing.
//!
//! Transients whose lifetime windows do not overlap can share memory. The
//! plan assigns every transient to a slot, greedily: lifetimes are visited
//! by first use, and a slot is reused when its current occupant ended
//! strictly before the newcomer starts. Images and buffers get separate
//! slot lists.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::graph::{BufferAttachmentHandle, ImageAttachmentHandle};

use super::{BufferLifetime, ImageLifetime, LifetimeWindow};

/// A memory slot shared by transients with disjoint windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasSlot<H> {
    size: u64,
    members: Vec<(H, LifetimeWindow)>,
}

impl<H: Copy> AliasSlot<H> {
    /// Bytes needed to back every member.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Members in assignment order, with their windows.
    pub fn members(&self) -> &[(H, LifetimeWindow)] {
        &self.members
    }
}

/// Slot assignment for every transient of a compiled graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasingPlan {
    image_slots: Vec<AliasSlot<ImageAttachmentHandle>>,
    buffer_slots: Vec<AliasSlot<BufferAttachmentHandle>>,
    image_assignments: HashMap<ImageAttachmentHandle, usize>,
    buffer_assignments: HashMap<BufferAttachmentHandle, usize>,
}

impl AliasingPlan {
    /// Build a plan for the given lifetimes.
    pub fn build(images: &[ImageLifetime], buffers: &[BufferLifetime]) -> Self {
        let (image_slots, image_assignments) = assign(
            images
                .iter()
                .map(|lifetime| (lifetime.attachment, lifetime.window, lifetime.size())),
        );
        let (buffer_slots, buffer_assignments) = assign(
            buffers
                .iter()
                .map(|lifetime| (lifetime.attachment, lifetime.window, lifetime.descriptor.size)),
        );
        log::debug!(
            "Aliasing: {} images in {} slots, {} buffers in {} slots",
            images.len(),
            image_slots.len(),
            buffers.len(),
            buffer_slots.len()
        );
        Self {
            image_slots,
            buffer_slots,
            image_assignments,
            buffer_assignments,
        }
    }

    /// Image slots.
    pub fn image_slots(&self) -> &[AliasSlot<ImageAttachmentHandle>] {
        &self.image_slots
    }

    /// Buffer slots.
    pub fn buffer_slots(&self) -> &[AliasSlot<BufferAttachmentHandle>] {
        &self.buffer_slots
    }

    /// Slot index of a transient image.
    pub fn image_slot(&self, attachment: ImageAttachmentHandle) -> Option<usize> {
        self.image_assignments.get(&attachment).copied()
    }

    /// Slot index of a transient buffer.
    pub fn buffer_slot(&self, attachment: BufferAttachmentHandle) -> Option<usize> {
        self.buffer_assignments.get(&attachment).copied()
    }

    /// Bytes needed for all image slots.
    pub fn image_bytes(&self) -> u64 {
        self.image_slots.iter().map(AliasSlot::size).sum()
    }

    /// Bytes needed for all buffer slots.
    pub fn buffer_bytes(&self) -> u64 {
        self.buffer_slots.iter().map(AliasSlot::size).sum()
    }
}

fn assign<H>(
    lifetimes: impl Iterator<Item = (H, LifetimeWindow, u64)>,
) -> (Vec<AliasSlot<H>>, HashMap<H, usize>)
where
    H: Copy + Eq + std::hash::Hash,
{
    let mut sorted: Vec<_> = lifetimes.collect();
    sorted.sort_by_key(|&(_, window, _)| window.first);

    let mut slots: Vec<AliasSlot<H>> = Vec::new();
    let mut assignments = HashMap::with_capacity(sorted.len());
    // Min-heap of (window end, slot index) for slots waiting to be reused.
    let mut busy: BinaryHeap<Reverse<(usize, usize)>> = BinaryHeap::new();

    for (handle, window, size) in sorted {
        let reusable = match busy.peek() {
            Some(&Reverse((end, index))) if end < window.first => {
                busy.pop();
                Some(index)
            }
            _ => None,
        };
        let index = match reusable {
            Some(index) => {
                let slot = &mut slots[index];
                slot.size = slot.size.max(size);
                slot.members.push((handle, window));
                index
            }
            None => {
                slots.push(AliasSlot {
                    size,
                    members: vec![(handle, window)],
                });
                slots.len() - 1
            }
        };
        assignments.insert(handle, index);
        busy.push(Reverse((window.last, index)));
    }
    (slots, assignments)
}
