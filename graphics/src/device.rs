//! Graphics device.
//!
//! The [`Device`] owns the backend and one [`HandlePool`] per resource kind.
//! It is passed explicitly to every component that needs it; there is no
//! global device. The pools have no internal synchronization, so creation and
//! destruction take `&mut self`.

use std::sync::Arc;

use bytemuck::Pod;
use ember_core::HandlePool;

use crate::backend::{BackendType, GpuBackend, create_backend};
use crate::error::GraphicsError;
use crate::resources::{
    Buffer, BufferHandle, BufferView, BufferViewDescriptor, BufferViewHandle, Image, ImageHandle,
    ImageView, ImageViewDescriptor, ImageViewHandle, Sampler, SamplerHandle, Swapchain,
    SwapchainDescriptor, SwapchainHandle,
};
use crate::types::{BufferDescriptor, ImageDescriptor, ImageDimension, SamplerDescriptor};

/// Capabilities of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum image dimension along any axis.
    pub max_image_dimension: u32,
    /// Maximum buffer size.
    pub max_buffer_size: u64,
    /// Maximum number of mip levels.
    pub max_mip_levels: u32,
    /// Maximum number of array layers.
    pub max_array_layers: u32,
    /// Maximum number of swapchain images.
    pub max_swapchain_images: u32,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_image_dimension: 16384,
            max_buffer_size: 1 << 30, // 1 GB
            max_mip_levels: 15,
            max_array_layers: 2048,
            max_swapchain_images: 8,
        }
    }
}

/// Parameters for creating a [`Device`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DeviceParameters {
    /// Backend selection.
    pub backend: BackendType,
    /// Limits enforced on resource descriptors.
    pub capabilities: DeviceCapabilities,
    /// Debug label.
    pub label: Option<String>,
}

impl DeviceParameters {
    /// Default parameters: automatic backend, default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Override the device limits.
    pub fn with_capabilities(mut self, capabilities: DeviceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A graphics device for creating GPU resources.
///
/// # Example
///
/// ```ignore
/// let mut device = Device::new(DeviceParameters::new())?;
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))?;
/// let image = device.create_image(&ImageDescriptor::new_2d(
///     1920, 1080,
///     ImageFormat::Rgba8Unorm,
///     ImageUsage::COLOR_ATTACHMENT,
/// ))?;
/// ```
pub struct Device {
    backend: Arc<dyn GpuBackend>,
    label: Option<String>,
    capabilities: DeviceCapabilities,
    images: HandlePool<Image>,
    buffers: HandlePool<Buffer>,
    image_views: HandlePool<ImageView>,
    buffer_views: HandlePool<BufferView>,
    samplers: HandlePool<Sampler>,
    swapchains: HandlePool<Swapchain>,
}

impl Device {
    /// Create a device on the backend selected by `parameters`.
    pub fn new(parameters: DeviceParameters) -> Result<Self, GraphicsError> {
        let backend = create_backend(parameters.backend)?;
        Ok(Self::with_backend(backend, parameters))
    }

    /// Create a device on an existing backend.
    pub fn with_backend(backend: Arc<dyn GpuBackend>, parameters: DeviceParameters) -> Self {
        log::info!(
            "Device {:?} created on {}",
            parameters.label,
            backend.name()
        );
        Self {
            backend,
            label: parameters.label,
            capabilities: parameters.capabilities,
            images: HandlePool::new(),
            buffers: HandlePool::new(),
            image_views: HandlePool::new(),
            buffer_views: HandlePool::new(),
            samplers: HandlePool::new(),
            swapchains: HandlePool::new(),
        }
    }

    /// The backend this device records to.
    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// Backend name.
    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Validate an image descriptor against the device limits.
    pub fn validate_image(&self, descriptor: &ImageDescriptor) -> Result<(), GraphicsError> {
        let caps = &self.capabilities;
        let size = descriptor.size;
        if size.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "image dimensions cannot be zero".to_string(),
            ));
        }
        if size.max_dimension() > caps.max_image_dimension {
            return Err(GraphicsError::InvalidParameter(format!(
                "image dimension exceeds maximum {}",
                caps.max_image_dimension
            )));
        }
        if descriptor.dimension != ImageDimension::D3 && size.depth != 1 {
            return Err(GraphicsError::InvalidParameter(
                "only 3D images may have depth greater than one".to_string(),
            ));
        }
        let max_mips = caps.max_mip_levels.min(size.full_mip_count());
        if descriptor.mip_level_count == 0 || descriptor.mip_level_count > max_mips {
            return Err(GraphicsError::InvalidParameter(format!(
                "mip level count {} outside 1..={}",
                descriptor.mip_level_count, max_mips
            )));
        }
        if descriptor.array_layer_count == 0 || descriptor.array_layer_count > caps.max_array_layers
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "array layer count {} outside 1..={}",
                descriptor.array_layer_count, caps.max_array_layers
            )));
        }
        if !descriptor.sample_count.is_power_of_two() || descriptor.sample_count > 16 {
            return Err(GraphicsError::InvalidParameter(format!(
                "unsupported sample count {}",
                descriptor.sample_count
            )));
        }
        if descriptor.usage.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "image usage cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a GPU image.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor exceeds device limits or allocation fails.
    pub fn create_image(
        &mut self,
        descriptor: &ImageDescriptor,
    ) -> Result<ImageHandle, GraphicsError> {
        self.validate_image(descriptor)?;
        let raw = self.backend.create_image(descriptor)?;
        let handle = self.images.insert(Image::new(descriptor.clone(), raw));
        log::trace!(
            "Device: created image {:?} {:?}, size={}x{}",
            handle,
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height
        );
        Ok(handle)
    }

    /// Destroy an image and every view of it.
    pub fn destroy_image(&mut self, handle: ImageHandle) -> Result<(), GraphicsError> {
        let image = self
            .images
            .get(handle)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("image {handle:?}")))?;
        if image.swapchain().is_some() {
            return Err(GraphicsError::InvalidParameter(format!(
                "image {handle:?} is owned by a swapchain"
            )));
        }
        self.remove_image(handle);
        Ok(())
    }

    fn remove_image(&mut self, handle: ImageHandle) {
        let views: Vec<ImageViewHandle> = self
            .image_views
            .iter()
            .filter(|(_, view)| view.image() == handle)
            .map(|(view, _)| view)
            .collect();
        for view in views {
            if let Some(view) = self.image_views.remove(view) {
                self.backend.destroy_image_view(view.raw());
            }
        }
        if let Some(image) = self.images.remove(handle) {
            if image.swapchain().is_none() {
                self.backend.destroy_image(image.raw());
            }
            log::trace!("Device: destroyed image {:?}", handle);
        }
    }

    /// Get an image, or `None` if the handle is stale.
    pub fn image(&self, handle: ImageHandle) -> Option<&Image> {
        self.images.get(handle)
    }

    /// Get an image, panicking if the handle is stale.
    pub fn resolve_image(&self, handle: ImageHandle) -> &Image {
        &self.images[handle]
    }

    /// Number of live images, including swapchain images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    // ========================================================================
    // Buffers
    // ========================================================================

    /// Validate a buffer descriptor against the device limits.
    pub fn validate_buffer(&self, descriptor: &BufferDescriptor) -> Result<(), GraphicsError> {
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer size exceeds device limits or allocation fails.
    pub fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferHandle, GraphicsError> {
        self.validate_buffer(descriptor)?;
        let raw = self.backend.create_buffer(descriptor)?;
        let handle = self.buffers.insert(Buffer::new(descriptor.clone(), raw));
        log::trace!(
            "Device: created buffer {:?} {:?}, size={}",
            handle,
            descriptor.label,
            descriptor.size
        );
        Ok(handle)
    }

    /// Destroy a buffer and every view of it. A mapped buffer is unmapped first.
    pub fn destroy_buffer(&mut self, handle: BufferHandle) -> Result<(), GraphicsError> {
        if !self.buffers.contains(handle) {
            return Err(GraphicsError::InvalidHandle(format!("buffer {handle:?}")));
        }
        let views: Vec<BufferViewHandle> = self
            .buffer_views
            .iter()
            .filter(|(_, view)| view.buffer() == handle)
            .map(|(view, _)| view)
            .collect();
        for view in views {
            if let Some(view) = self.buffer_views.remove(view) {
                self.backend.destroy_buffer_view(view.raw());
            }
        }
        if let Some(buffer) = self.buffers.remove(handle) {
            if buffer.is_mapped() {
                self.backend.unmap_buffer(buffer.raw())?;
            }
            self.backend.destroy_buffer(buffer.raw());
            log::trace!("Device: destroyed buffer {:?}", handle);
        }
        Ok(())
    }

    /// Get a buffer, or `None` if the handle is stale.
    pub fn buffer(&self, handle: BufferHandle) -> Option<&Buffer> {
        self.buffers.get(handle)
    }

    /// Get a buffer, panicking if the handle is stale.
    pub fn resolve_buffer(&self, handle: BufferHandle) -> &Buffer {
        &self.buffers[handle]
    }

    /// Number of live buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    // ========================================================================
    // Buffer mapping
    // ========================================================================

    fn live_buffer_mut(&mut self, handle: BufferHandle) -> Result<&mut Buffer, GraphicsError> {
        self.buffers
            .get_mut(handle)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("buffer {handle:?}")))
    }

    /// Map a buffer for host access.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the buffer is not mappable or already mapped.
    pub fn map_buffer(&mut self, handle: BufferHandle) -> Result<(), GraphicsError> {
        let buffer = self.live_buffer_mut(handle)?;
        if !buffer.usage().is_mappable() {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer {handle:?} was not created with MAP_READ or MAP_WRITE"
            )));
        }
        if buffer.is_mapped() {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer {handle:?} is already mapped"
            )));
        }
        let raw = buffer.raw();
        self.backend.map_buffer(raw)?;
        self.buffers[handle].set_mapped(true);
        Ok(())
    }

    /// Unmap a mapped buffer.
    pub fn unmap_buffer(&mut self, handle: BufferHandle) -> Result<(), GraphicsError> {
        let buffer = self.live_buffer_mut(handle)?;
        if !buffer.is_mapped() {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer {handle:?} is not mapped"
            )));
        }
        let raw = buffer.raw();
        self.backend.unmap_buffer(raw)?;
        self.buffers[handle].set_mapped(false);
        Ok(())
    }

    fn mapped_raw(
        &self,
        handle: BufferHandle,
        offset: u64,
        len: u64,
    ) -> Result<crate::backend::GpuBuffer, GraphicsError> {
        let buffer = self
            .buffers
            .get(handle)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("buffer {handle:?}")))?;
        if !buffer.is_mapped() {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer {handle:?} is not mapped"
            )));
        }
        if offset.saturating_add(len) > buffer.size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "range {}..{} outside buffer of {} bytes",
                offset,
                offset.saturating_add(len),
                buffer.size()
            )));
        }
        Ok(buffer.raw())
    }

    /// Write typed data into a mapped buffer at a byte offset.
    pub fn write_buffer<T: Pod>(
        &self,
        handle: BufferHandle,
        offset: u64,
        data: &[T],
    ) -> Result<(), GraphicsError> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let raw = self.mapped_raw(handle, offset, bytes.len() as u64)?;
        self.backend.write_mapped(raw, offset, bytes)
    }

    /// Read `count` values of `T` from a mapped buffer at a byte offset.
    pub fn read_buffer<T: Pod>(
        &self,
        handle: BufferHandle,
        offset: u64,
        count: usize,
    ) -> Result<Vec<T>, GraphicsError> {
        let len = (count * std::mem::size_of::<T>()) as u64;
        let raw = self.mapped_raw(handle, offset, len)?;
        let bytes = self.backend.read_mapped(raw, offset, len)?;
        let mut values = vec![T::zeroed(); count];
        bytemuck::cast_slice_mut::<T, u8>(&mut values).copy_from_slice(&bytes);
        Ok(values)
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Create a view of an image.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the range exceeds the image or the format cannot
    /// reinterpret the image's format.
    pub fn create_image_view(
        &mut self,
        image: ImageHandle,
        descriptor: &ImageViewDescriptor,
    ) -> Result<ImageViewHandle, GraphicsError> {
        let record = self
            .images
            .get(image)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("image {image:?}")))?;
        let range = descriptor.range;
        let image_desc = record.descriptor();
        if range.mip_level_count == 0
            || range.array_layer_count == 0
            || range.mip_end().is_none_or(|end| end > image_desc.mip_level_count)
            || range.layer_end().is_none_or(|end| end > image_desc.array_layer_count)
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "view range {range:?} outside image {image:?}"
            )));
        }
        let format = descriptor.format.unwrap_or(image_desc.format);
        if !format.is_view_compatible(image_desc.format) {
            return Err(GraphicsError::InvalidParameter(format!(
                "view format {:?} cannot reinterpret {:?}",
                format, image_desc.format
            )));
        }
        let raw = self.backend.create_image_view(record.raw(), descriptor)?;
        Ok(self
            .image_views
            .insert(ImageView::new(image, *descriptor, format, raw)))
    }

    /// Destroy an image view.
    pub fn destroy_image_view(&mut self, handle: ImageViewHandle) -> Result<(), GraphicsError> {
        let view = self
            .image_views
            .remove(handle)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("image view {handle:?}")))?;
        self.backend.destroy_image_view(view.raw());
        Ok(())
    }

    /// Get an image view, or `None` if the handle is stale.
    pub fn image_view(&self, handle: ImageViewHandle) -> Option<&ImageView> {
        self.image_views.get(handle)
    }

    /// Create a view of a buffer.
    pub fn create_buffer_view(
        &mut self,
        buffer: BufferHandle,
        descriptor: &BufferViewDescriptor,
    ) -> Result<BufferViewHandle, GraphicsError> {
        let record = self
            .buffers
            .get(buffer)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("buffer {buffer:?}")))?;
        let end = descriptor.range.end(record.size());
        if end.is_none_or(|end| descriptor.range.offset >= end || end > record.size()) {
            return Err(GraphicsError::InvalidParameter(format!(
                "view range {:?} outside buffer of {} bytes",
                descriptor.range,
                record.size()
            )));
        }
        let raw = self.backend.create_buffer_view(record.raw(), descriptor)?;
        Ok(self
            .buffer_views
            .insert(BufferView::new(buffer, *descriptor, raw)))
    }

    /// Destroy a buffer view.
    pub fn destroy_buffer_view(&mut self, handle: BufferViewHandle) -> Result<(), GraphicsError> {
        let view = self
            .buffer_views
            .remove(handle)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("buffer view {handle:?}")))?;
        self.backend.destroy_buffer_view(view.raw());
        Ok(())
    }

    /// Get a buffer view, or `None` if the handle is stale.
    pub fn buffer_view(&self, handle: BufferViewHandle) -> Option<&BufferView> {
        self.buffer_views.get(handle)
    }

    // ========================================================================
    // Samplers
    // ========================================================================

    /// Create an image sampler.
    pub fn create_sampler(
        &mut self,
        descriptor: &SamplerDescriptor,
    ) -> Result<SamplerHandle, GraphicsError> {
        if descriptor.lod_min_clamp > descriptor.lod_max_clamp {
            return Err(GraphicsError::InvalidParameter(format!(
                "lod clamp {}..{} is empty",
                descriptor.lod_min_clamp, descriptor.lod_max_clamp
            )));
        }
        let raw = self.backend.create_sampler(descriptor)?;
        Ok(self.samplers.insert(Sampler::new(descriptor.clone(), raw)))
    }

    /// Destroy a sampler.
    pub fn destroy_sampler(&mut self, handle: SamplerHandle) -> Result<(), GraphicsError> {
        let sampler = self
            .samplers
            .remove(handle)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("sampler {handle:?}")))?;
        self.backend.destroy_sampler(sampler.raw());
        Ok(())
    }

    /// Get a sampler, or `None` if the handle is stale.
    pub fn sampler(&self, handle: SamplerHandle) -> Option<&Sampler> {
        self.samplers.get(handle)
    }

    /// Number of live samplers.
    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    // ========================================================================
    // Swapchains
    // ========================================================================

    fn validate_swapchain(&self, descriptor: &SwapchainDescriptor) -> Result<(), GraphicsError> {
        if descriptor.extent.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "swapchain extent cannot be zero".to_string(),
            ));
        }
        if descriptor.extent.max_dimension() > self.capabilities.max_image_dimension {
            return Err(GraphicsError::InvalidParameter(format!(
                "swapchain extent exceeds maximum {}",
                self.capabilities.max_image_dimension
            )));
        }
        if descriptor.image_count == 0
            || descriptor.image_count > self.capabilities.max_swapchain_images
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "swapchain image count {} outside 1..={}",
                descriptor.image_count, self.capabilities.max_swapchain_images
            )));
        }
        Ok(())
    }

    fn swapchain_images(
        &mut self,
        swapchain: SwapchainHandle,
        descriptor: &SwapchainDescriptor,
        raw_images: Vec<crate::backend::GpuImage>,
    ) -> Vec<ImageHandle> {
        raw_images
            .into_iter()
            .enumerate()
            .map(|(i, raw)| {
                let mut image_desc = ImageDescriptor::new_2d(
                    descriptor.extent.width,
                    descriptor.extent.height,
                    descriptor.format,
                    descriptor.usage,
                );
                image_desc.label = descriptor
                    .label
                    .as_ref()
                    .map(|label| format!("{label}[{i}]"));
                self.images
                    .insert(Image::for_swapchain(image_desc, raw, swapchain))
            })
            .collect()
    }

    /// Create a swapchain and register its images.
    pub fn create_swapchain(
        &mut self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<SwapchainHandle, GraphicsError> {
        self.validate_swapchain(descriptor)?;
        let (raw, raw_images) = self.backend.create_swapchain(descriptor)?;
        let handle = self
            .swapchains
            .insert(Swapchain::new(descriptor.clone(), raw));
        let images = self.swapchain_images(handle, descriptor, raw_images);
        self.swapchains[handle].set_images(images);
        log::info!(
            "Device: created swapchain {:?} {}x{} with {} images",
            handle,
            descriptor.extent.width,
            descriptor.extent.height,
            descriptor.image_count
        );
        Ok(handle)
    }

    /// Rebuild a swapchain at a new size.
    ///
    /// Every image handle of the old chain becomes stale; attachments built
    /// from them must be re-imported.
    pub fn resize_swapchain(
        &mut self,
        handle: SwapchainHandle,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError> {
        let swapchain = self
            .swapchains
            .get(handle)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("swapchain {handle:?}")))?;
        let mut descriptor = swapchain.descriptor().clone();
        descriptor.extent.width = width;
        descriptor.extent.height = height;
        self.validate_swapchain(&descriptor)?;

        let old_raw = swapchain.raw();
        let (raw, raw_images) = self.backend.create_swapchain(&descriptor)?;
        self.backend.destroy_swapchain(old_raw);
        let images = self.swapchain_images(handle, &descriptor, raw_images);
        let old_images = self.swapchains[handle].replace(descriptor, raw, images);
        for image in old_images {
            self.remove_image(image);
        }
        log::info!(
            "Device: resized swapchain {:?} to {}x{}",
            handle,
            width,
            height
        );
        Ok(())
    }

    /// Destroy a swapchain and its images.
    pub fn destroy_swapchain(&mut self, handle: SwapchainHandle) -> Result<(), GraphicsError> {
        let swapchain = self
            .swapchains
            .remove(handle)
            .ok_or_else(|| GraphicsError::InvalidHandle(format!("swapchain {handle:?}")))?;
        for image in swapchain.images() {
            self.remove_image(*image);
        }
        self.backend.destroy_swapchain(swapchain.raw());
        Ok(())
    }

    /// Get a swapchain, or `None` if the handle is stale.
    pub fn swapchain(&self, handle: SwapchainHandle) -> Option<&Swapchain> {
        self.swapchains.get(handle)
    }

    /// Get a swapchain, panicking if the handle is stale.
    pub fn resolve_swapchain(&self, handle: SwapchainHandle) -> &Swapchain {
        &self.swapchains[handle]
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        for (_, view) in self.image_views.iter() {
            self.backend.destroy_image_view(view.raw());
        }
        for (_, view) in self.buffer_views.iter() {
            self.backend.destroy_buffer_view(view.raw());
        }
        for (_, sampler) in self.samplers.iter() {
            self.backend.destroy_sampler(sampler.raw());
        }
        for (_, buffer) in self.buffers.iter() {
            self.backend.destroy_buffer(buffer.raw());
        }
        for (_, image) in self.images.iter() {
            if image.swapchain().is_none() {
                self.backend.destroy_image(image.raw());
            }
        }
        for (_, swapchain) in self.swapchains.iter() {
            self.backend.destroy_swapchain(swapchain.raw());
        }
        log::debug!("Device {:?} dropped", self.label);
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("backend", &self.backend.name())
            .field("label", &self.label)
            .field("images", &self.images.len())
            .field("buffers", &self.buffers.len())
            .field("swapchains", &self.swapchains.len())
            .finish()
    }
}

// Ensure Device is Send + Sync
static_assertions::assert_impl_all!(Device: Send, Sync);
