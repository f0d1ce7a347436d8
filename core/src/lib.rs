//! # Ember Core
//!
//! Leaf data structures shared by the Ember crates:
//!
//! - [`handle::Handle`] - packed 48-bit index / 16-bit generation reference
//! - [`pool::HandlePool`] - generational slot allocator resolving those handles

pub mod handle;
pub mod pool;

pub use handle::Handle;
pub use pool::HandlePool;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Ember Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
