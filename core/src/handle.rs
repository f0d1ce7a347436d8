//! Generational handles.
//!
//! A [`Handle<T>`] is an opaque 64-bit reference into a
//! [`HandlePool<T>`](crate::pool::HandlePool): the low 48 bits hold the slot
//! index, the high 16 bits hold the slot generation at the time the handle was
//! issued. Handles are never dereferenced directly; they are always resolved
//! through the pool that issued them, which rejects handles whose generation no
//! longer matches the slot.
//!
//! The default handle is the [`INVALID`](Handle::INVALID) sentinel (all bits
//! set), which no pool ever resolves.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Number of bits used for the slot index.
pub const INDEX_BITS: u32 = 48;

/// Number of bits used for the generation counter.
pub const GENERATION_BITS: u32 = 16;

const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Largest slot index a handle can address.
///
/// The all-ones index is reserved for the invalid sentinel.
pub const MAX_INDEX: u64 = INDEX_MASK - 1;

/// Largest generation a live slot can carry.
///
/// Slots whose generation would step past this value are retired instead of
/// wrapping, so a stale handle can never alias a later occupant.
pub const MAX_GENERATION: u16 = u16::MAX - 1;

/// Typed generational reference to a value stored in a `HandlePool<T>`.
///
/// `Handle<T>` is `Copy`, 8 bytes wide, and is `Send + Sync` regardless of
/// `T`, since it carries no data of type `T`.
pub struct Handle<T> {
    bits: u64,
    _marker: PhantomData<fn() -> T>,
}

static_assertions::assert_eq_size!(Handle<u8>, u64);
static_assertions::assert_impl_all!(Handle<std::rc::Rc<u8>>: Send, Sync, Copy);

impl<T> Handle<T> {
    /// The invalid sentinel handle (all bits set).
    pub const INVALID: Self = Self {
        bits: u64::MAX,
        _marker: PhantomData,
    };

    /// Build a handle from an index and generation.
    ///
    /// # Panics
    ///
    /// Panics if `index` exceeds [`MAX_INDEX`].
    pub fn new(index: u64, generation: u16) -> Self {
        assert!(index <= MAX_INDEX, "handle index {index} out of range");
        Self {
            bits: ((generation as u64) << INDEX_BITS) | index,
            _marker: PhantomData,
        }
    }

    /// Rebuild a handle from its packed representation.
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            bits,
            _marker: PhantomData,
        }
    }

    /// Packed 64-bit representation.
    pub const fn to_bits(self) -> u64 {
        self.bits
    }

    /// Slot index (low 48 bits).
    pub const fn index(self) -> u64 {
        self.bits & INDEX_MASK
    }

    /// Generation counter (high 16 bits).
    pub const fn generation(self) -> u16 {
        (self.bits >> INDEX_BITS) as u16
    }

    /// Whether this is the invalid sentinel.
    ///
    /// A handle that is not the sentinel may still be stale; only the owning
    /// pool can tell.
    pub const fn is_invalid(self) -> bool {
        self.bits == u64::MAX
    }

    /// Reinterpret this handle as a handle to another type.
    ///
    /// Used by wrappers that store `T` inside a differently-typed pool.
    pub const fn cast<U>(self) -> Handle<U> {
        Handle::from_bits(self.bits)
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index()
            .cmp(&other.index())
            .then(self.generation().cmp(&other.generation()))
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "Handle(invalid)")
        } else {
            write!(f, "Handle({}v{})", self.index(), self.generation())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_invalid() {
        let handle = Handle::<u32>::default();
        assert!(handle.is_invalid());
        assert_eq!(handle, Handle::INVALID);
        assert_eq!(handle.to_bits(), u64::MAX);
    }

    #[test]
    fn test_pack_unpack() {
        let handle = Handle::<u32>::new(0x1234_5678_9abc, 0xbeef);
        assert_eq!(handle.index(), 0x1234_5678_9abc);
        assert_eq!(handle.generation(), 0xbeef);
        assert!(!handle.is_invalid());
    }

    #[test]
    fn test_equality_compares_generation() {
        let a = Handle::<u32>::new(7, 1);
        let b = Handle::<u32>::new(7, 2);
        assert_ne!(a, b);
        assert_eq!(a, Handle::new(7, 1));
    }

    #[test]
    fn test_bits_round_trip() {
        let handle = Handle::<u32>::new(42, 3);
        assert_eq!(Handle::<u32>::from_bits(handle.to_bits()), handle);
    }

    #[test]
    fn test_ordering_by_index_first() {
        let a = Handle::<u32>::new(1, 9);
        let b = Handle::<u32>::new(2, 1);
        assert!(a < b);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_overflow_panics() {
        let _ = Handle::<u32>::new(MAX_INDEX + 1, 1);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", Handle::<u32>::new(3, 2)), "Handle(3v2)");
        assert_eq!(format!("{:?}", Handle::<u32>::INVALID), "Handle(invalid)");
    }
}
