//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, synchronization enums and
//! descriptor structs used throughout the graphics system.

mod buffer;
mod common;
mod image;
mod sampler;
mod sync;

pub use buffer::{BufferDescriptor, BufferRange, BufferUsage};
pub use common::{ClearValue, Extent3d, RenderArea};
pub use image::{ImageDescriptor, ImageDimension, ImageFormat, ImageUsage, SubresourceRange};
pub use sampler::{AddressMode, CompareFunction, FilterMode, SamplerDescriptor};
pub use sync::{Access, ImageLayout, PipelineStages, QueueType};
