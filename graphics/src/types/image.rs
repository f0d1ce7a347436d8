//! Image types and descriptors.

use bitflags::bitflags;

use super::Extent3d;

/// Image format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ImageFormat {
    // 8-bit formats
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit red channel, unsigned integer.
    R8Uint,

    // 16-bit formats
    /// 16-bit red channel, float.
    R16Float,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,

    // 32-bit formats
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,
    /// Packed 10-bit RGB with 2-bit alpha.
    Rgb10a2Unorm,

    // 64-bit formats
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RG channels, float.
    Rg32Float,

    // 128-bit formats
    /// 32-bit RGBA channels, float.
    Rgba32Float,

    // Depth/stencil formats
    /// 16-bit depth.
    Depth16Unorm,
    /// 24-bit depth.
    Depth24Plus,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit depth, float.
    Depth32Float,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,
    /// 8-bit stencil only.
    Stencil8,
}

impl ImageFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        self.has_depth() || self.has_stencil()
    }

    /// Returns true if this format has a depth component.
    pub fn has_depth(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm
                | Self::Depth24Plus
                | Self::Depth24PlusStencil8
                | Self::Depth32Float
                | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8 | Self::Stencil8
        )
    }

    /// Returns true for sRGB-encoded color formats.
    pub fn is_srgb(&self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm | Self::R8Uint | Self::Stencil8 => 1,
            Self::R16Float | Self::Rg8Unorm | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Rgb10a2Unorm
            | Self::Depth24Plus
            | Self::Depth24PlusStencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float | Self::Rg32Float | Self::Depth32FloatStencil8 => 8,
            Self::Rgba32Float => 16,
        }
    }

    /// Whether a view of `self` may reinterpret an image created as `other`.
    ///
    /// Reinterpretation is limited to formats of the same pixel size and the
    /// same depth/stencil class.
    pub fn is_view_compatible(&self, other: ImageFormat) -> bool {
        if *self == other {
            return true;
        }
        !self.is_depth_stencil()
            && !other.is_depth_stencil()
            && self.block_size() == other.block_size()
    }
}

bitflags! {
    /// Usage flags for images.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImageUsage: u32 {
        /// Image can be copied from.
        const COPY_SRC = 1 << 0;
        /// Image can be copied to.
        const COPY_DST = 1 << 1;
        /// Image can be sampled in a shader.
        const SAMPLED = 1 << 2;
        /// Image can be used as a storage image.
        const STORAGE = 1 << 3;
        /// Image can be used as a color render target.
        const COLOR_ATTACHMENT = 1 << 4;
        /// Image can be used as a depth/stencil target.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
        /// Image can be presented.
        const PRESENT = 1 << 6;
    }
}

/// Image dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageDimension {
    /// One-dimensional image.
    D1,
    /// Two-dimensional image (optionally arrayed).
    #[default]
    D2,
    /// Three-dimensional image.
    D3,
}

/// Descriptor for creating an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    /// Debug label for the image.
    pub label: Option<String>,
    /// Dimensionality.
    pub dimension: ImageDimension,
    /// Size of the image.
    pub size: Extent3d,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Array layer count.
    pub array_layer_count: u32,
    /// Sample count for multisampling.
    pub sample_count: u32,
    /// Image format.
    pub format: ImageFormat,
    /// Usage flags.
    pub usage: ImageUsage,
}

impl ImageDescriptor {
    /// Create a new 2D image descriptor.
    pub fn new_2d(width: u32, height: u32, format: ImageFormat, usage: ImageUsage) -> Self {
        Self {
            label: None,
            dimension: ImageDimension::D2,
            size: Extent3d::new_2d(width, height),
            mip_level_count: 1,
            array_layer_count: 1,
            sample_count: 1,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// Set the array layer count.
    pub fn with_array_layers(mut self, count: u32) -> Self {
        self.array_layer_count = count;
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Rough byte footprint of the full mip chain and all layers.
    ///
    /// Used for memory budgeting and aliasing plans; ignores alignment.
    pub fn estimated_size(&self) -> u64 {
        let mut total = 0u64;
        for mip in 0..self.mip_level_count.max(1) {
            let extent = self.size.mip_level(mip);
            total += extent.width as u64 * extent.height as u64 * extent.depth as u64;
        }
        total
            * self.format.block_size() as u64
            * self.array_layer_count.max(1) as u64
            * self.sample_count.max(1) as u64
    }
}

impl Default for ImageDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            dimension: ImageDimension::D2,
            size: Extent3d::default(),
            mip_level_count: 1,
            array_layer_count: 1,
            sample_count: 1,
            format: ImageFormat::default(),
            usage: ImageUsage::empty(),
        }
    }
}

/// Range of mip levels and array layers addressed by a view or use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    /// First mip level.
    pub base_mip_level: u32,
    /// Number of mip levels.
    pub mip_level_count: u32,
    /// First array layer.
    pub base_array_layer: u32,
    /// Number of array layers.
    pub array_layer_count: u32,
}

impl SubresourceRange {
    /// The first mip of the first layer.
    pub const BASE: Self = Self {
        base_mip_level: 0,
        mip_level_count: 1,
        base_array_layer: 0,
        array_layer_count: 1,
    };

    /// Create a range covering `mips` levels and `layers` layers from zero.
    pub fn new(mip_level_count: u32, array_layer_count: u32) -> Self {
        Self {
            base_mip_level: 0,
            mip_level_count,
            base_array_layer: 0,
            array_layer_count,
        }
    }

    /// Restrict to a single mip level.
    pub fn mip(level: u32) -> Self {
        Self {
            base_mip_level: level,
            ..Self::BASE
        }
    }

    /// Set the mip level range.
    pub fn with_mip_levels(mut self, base: u32, count: u32) -> Self {
        self.base_mip_level = base;
        self.mip_level_count = count;
        self
    }

    /// Set the array layer range.
    pub fn with_array_layers(mut self, base: u32, count: u32) -> Self {
        self.base_array_layer = base;
        self.array_layer_count = count;
        self
    }

    /// One past the last mip level addressed, or `None` on overflow.
    pub fn mip_end(&self) -> Option<u32> {
        self.base_mip_level.checked_add(self.mip_level_count)
    }

    /// One past the last array layer addressed, or `None` on overflow.
    pub fn layer_end(&self) -> Option<u32> {
        self.base_array_layer.checked_add(self.array_layer_count)
    }
}

impl Default for SubresourceRange {
    fn default() -> Self {
        Self::BASE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_stencil_classification() {
        assert!(ImageFormat::Depth32Float.is_depth_stencil());
        assert!(ImageFormat::Stencil8.is_depth_stencil());
        assert!(!ImageFormat::Stencil8.has_depth());
        assert!(ImageFormat::Depth24PlusStencil8.has_stencil());
        assert!(!ImageFormat::Rgba8Unorm.is_depth_stencil());
    }

    #[test]
    fn test_view_compatibility() {
        assert!(ImageFormat::Rgba8UnormSrgb.is_view_compatible(ImageFormat::Rgba8Unorm));
        assert!(ImageFormat::R32Float.is_view_compatible(ImageFormat::R32Uint));
        assert!(!ImageFormat::Rgba16Float.is_view_compatible(ImageFormat::Rgba8Unorm));
        assert!(!ImageFormat::Depth32Float.is_view_compatible(ImageFormat::R32Float));
    }

    #[test]
    fn test_estimated_size_with_mips() {
        let desc = ImageDescriptor::new_2d(4, 4, ImageFormat::Rgba8Unorm, ImageUsage::SAMPLED)
            .with_mip_levels(3);
        // 16 + 4 + 1 pixels at 4 bytes each
        assert_eq!(desc.estimated_size(), 84);
    }

    #[test]
    fn test_subresource_range_ends() {
        let range = SubresourceRange::BASE
            .with_mip_levels(2, 3)
            .with_array_layers(1, 4);
        assert_eq!(range.mip_end(), Some(5));
        assert_eq!(range.layer_end(), Some(5));
    }
}
