//! Arena-linked use lists.
//!
//! Every use of an attachment is a node in a [`HandlePool`]. Nodes store the
//! handles of their neighbours, and the attachment stores the handles of the
//! first and last node, so appending and unlinking are O(1) and never move
//! other nodes.

use std::fmt;

use ember_core::{Handle, HandlePool};

/// Previous/next links stored inside a use node.
pub struct UseLinks<T> {
    /// The use declared before this one on the same attachment.
    pub prev: Handle<T>,
    /// The use declared after this one on the same attachment.
    pub next: Handle<T>,
}

impl<T> Default for UseLinks<T> {
    fn default() -> Self {
        Self {
            prev: Handle::INVALID,
            next: Handle::INVALID,
        }
    }
}

impl<T> Clone for UseLinks<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for UseLinks<T> {}

impl<T> fmt::Debug for UseLinks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseLinks")
            .field("prev", &self.prev)
            .field("next", &self.next)
            .finish()
    }
}

/// A node that can live in a [`UseChain`].
pub trait UseNode: Sized {
    /// Links to the neighbouring nodes.
    fn links(&self) -> &UseLinks<Self>;

    /// Mutable links to the neighbouring nodes.
    fn links_mut(&mut self) -> &mut UseLinks<Self>;
}

/// Head, tail and length of one attachment's use list.
pub struct UseChain<T> {
    first: Handle<T>,
    last: Handle<T>,
    len: u32,
}

impl<T> Default for UseChain<T> {
    fn default() -> Self {
        Self {
            first: Handle::INVALID,
            last: Handle::INVALID,
            len: 0,
        }
    }
}

impl<T> Clone for UseChain<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for UseChain<T> {}

impl<T> fmt::Debug for UseChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseChain")
            .field("first", &self.first)
            .field("last", &self.last)
            .field("len", &self.len)
            .finish()
    }
}

impl<T: UseNode> UseChain<T> {
    /// First node, or [`Handle::INVALID`] for an empty list.
    pub fn first(&self) -> Handle<T> {
        self.first
    }

    /// Last node, or [`Handle::INVALID`] for an empty list.
    pub fn last(&self) -> Handle<T> {
        self.last
    }

    /// Number of linked nodes.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Returns true if no node is linked.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `node` at the end of the list.
    ///
    /// # Panics
    ///
    /// Panics if `node` or the current tail is not live in `nodes`.
    pub fn push_back(&mut self, nodes: &mut HandlePool<T>, node: Handle<T>) {
        let tail = self.last;
        *nodes[node].links_mut() = UseLinks {
            prev: tail,
            next: Handle::INVALID,
        };
        if tail.is_invalid() {
            self.first = node;
        } else {
            nodes[tail].links_mut().next = node;
        }
        self.last = node;
        self.len += 1;
    }

    /// Detach `node`, joining its neighbours. The node stays in the pool.
    ///
    /// # Panics
    ///
    /// Panics if `node` or one of its neighbours is not live in `nodes`.
    pub fn unlink(&mut self, nodes: &mut HandlePool<T>, node: Handle<T>) {
        let UseLinks { prev, next } = *nodes[node].links();
        if prev.is_invalid() {
            self.first = next;
        } else {
            nodes[prev].links_mut().next = next;
        }
        if next.is_invalid() {
            self.last = prev;
        } else {
            nodes[next].links_mut().prev = prev;
        }
        *nodes[node].links_mut() = UseLinks::default();
        self.len -= 1;
    }

    /// Iterate the list front to back.
    pub fn iter<'a>(&self, nodes: &'a HandlePool<T>) -> UseIter<'a, T> {
        UseIter {
            nodes,
            cursor: self.first,
        }
    }
}

/// Front-to-back iterator over a [`UseChain`].
pub struct UseIter<'a, T> {
    nodes: &'a HandlePool<T>,
    cursor: Handle<T>,
}

impl<'a, T: UseNode> Iterator for UseIter<'a, T> {
    type Item = (Handle<T>, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor;
        let node = self.nodes.get(handle)?;
        self.cursor = node.links().next;
        Some((handle, node))
    }
}
