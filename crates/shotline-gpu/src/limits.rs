//! Device capability snapshot used to pick a starting tier.

use serde::{Deserialize, Serialize};

use crate::profile::ProfileName;

/// Bytes in one uniform slot (a vec4 of f32).
const UNIFORM_VEC4_BYTES: u32 = 16;

/// Capabilities the arbiter classifies a device by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceLimits {
    pub max_texture_size: u32,
    /// Uniform capacity of one kernel, in vec4 slots.
    pub max_fragment_uniform_vectors: u32,
}

impl DeviceLimits {
    pub fn new(max_texture_size: u32, max_fragment_uniform_vectors: u32) -> Self {
        Self {
            max_texture_size,
            max_fragment_uniform_vectors,
        }
    }

    pub fn from_wgpu(limits: &wgpu::Limits) -> Self {
        Self {
            max_texture_size: limits.max_texture_dimension_2d,
            max_fragment_uniform_vectors: limits.max_uniform_buffer_binding_size
                / UNIFORM_VEC4_BYTES,
        }
    }

    /// Starting tier for these limits. Detection never picks above medium.
    pub fn classify(&self) -> ProfileName {
        let tex = self.max_texture_size;
        let uniforms = self.max_fragment_uniform_vectors;
        if tex >= 4096 && uniforms >= 256 {
            ProfileName::Medium
        } else if tex >= 2048 && uniforms >= 128 {
            ProfileName::Low
        } else {
            ProfileName::UltraLow
        }
    }
}

impl Default for DeviceLimits {
    /// Conservative limits of a baseline GLES3-class device.
    fn default() -> Self {
        Self::from_wgpu(&wgpu::Limits::downlevel_webgl2_defaults())
    }
}
