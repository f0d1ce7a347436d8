//! GPU resources.
//!
//! This module contains the resource records stored by [`Device`]:
//! - [`Image`] - GPU image
//! - [`Buffer`] - GPU memory buffer
//! - [`ImageView`] / [`BufferView`] - typed views of images and buffers
//! - [`Sampler`] - image sampler
//! - [`Swapchain`] - presentable image chain
//!
//! Each record lives in one of the device's handle pools and is referenced
//! through a generational [`Handle`](ember_core::Handle); the record keeps the
//! descriptor it was created from together with the backend object id.
//!
//! [`Device`]: crate::Device

mod buffer;
mod image;
mod sampler;
mod swapchain;
mod view;

pub use buffer::Buffer;
pub use image::Image;
pub use sampler::Sampler;
pub use swapchain::{Swapchain, SwapchainDescriptor};
pub use view::{BufferView, BufferViewDescriptor, ImageView, ImageViewDescriptor};

use ember_core::Handle;

/// Handle to an [`Image`] owned by a device.
pub type ImageHandle = Handle<Image>;
/// Handle to a [`Buffer`] owned by a device.
pub type BufferHandle = Handle<Buffer>;
/// Handle to an [`ImageView`] owned by a device.
pub type ImageViewHandle = Handle<ImageView>;
/// Handle to a [`BufferView`] owned by a device.
pub type BufferViewHandle = Handle<BufferView>;
/// Handle to a [`Sampler`] owned by a device.
pub type SamplerHandle = Handle<Sampler>;
/// Handle to a [`Swapchain`] owned by a device.
pub type SwapchainHandle = Handle<Swapchain>;
