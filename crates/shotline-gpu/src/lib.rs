//! Shotline GPU - Resource arbitration and device probing
//!
//! Provides:
//! - The resource arbiter owning the shared-device allocation ledger
//! - Performance tiers and their selection from device limits
//! - Rolling FPS monitoring and tier recommendations
//! - wgpu device probing

pub mod arbiter;
pub mod context;
pub mod limits;
pub mod monitor;
pub mod profile;

pub use arbiter::{
    limit_enabled_effects, BufferHandle, FramebufferHandle, GpuMemoryUsage, ResourceArbiter,
    ResourceKind, ShaderHandle, TextureHandle,
};
pub use context::GpuContext;
pub use limits::DeviceLimits;
pub use monitor::{FpsWindow, PerformanceReport, TierAdvice, TierAdvisor};
pub use profile::{PerformanceProfile, PowerPreference, ProfileName, ShaderComplexity};
