//! Sampler resource.

use crate::backend::GpuSampler;
use crate::types::SamplerDescriptor;

/// A sampler resource.
#[derive(Debug)]
pub struct Sampler {
    descriptor: SamplerDescriptor,
    raw: GpuSampler,
}

impl Sampler {
    pub(crate) fn new(descriptor: SamplerDescriptor, raw: GpuSampler) -> Self {
        Self { descriptor, raw }
    }

    /// Get the sampler descriptor.
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }

    /// Backend object id.
    pub fn raw(&self) -> GpuSampler {
        self.raw
    }

    /// Get the sampler label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}
