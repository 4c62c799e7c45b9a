//! GPU resource arbiter.
//!
//! Single authority for GPU-side allocations and the current performance
//! tier. Every texture, framebuffer, kernel program and uniform buffer the
//! compositor uses is recorded in one keyed ledger under a hard memory
//! ceiling, because the device is shared with another heavyweight local
//! process.
//!
//! Exhaustion is not an error: allocation calls return `None` and leave
//! the ledger untouched, and the caller skips the corresponding stage.

use serde::Serialize;
use shotline_core::memory_budget::{
    GPU_MEMORY_CEILING, MAX_FRAMEBUFFERS, TEXTURE_BYTES_PER_PIXEL,
};
use shotline_core::{sort_stack, AppliedEffect, Listeners, Result, ShotlineError};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::limits::DeviceLimits;
use crate::monitor::{FpsWindow, PerformanceReport};
use crate::profile::{PerformanceProfile, ProfileName};

/// Estimated device footprint of one compiled kernel program.
pub const SHADER_PROGRAM_BYTES: usize = 16 * 1024;

/// Kind of a tracked allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Texture,
    Framebuffer,
    Shader,
    Buffer,
}

/// Running allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GpuMemoryUsage {
    pub textures: usize,
    pub framebuffers: usize,
    pub shaders: usize,
    pub buffers: usize,
    pub total_bytes: usize,
}

impl GpuMemoryUsage {
    pub fn total_mb(&self) -> f64 {
        self.total_bytes as f64 / (1024.0 * 1024.0)
    }

    fn count_mut(&mut self, kind: ResourceKind) -> &mut usize {
        match kind {
            ResourceKind::Texture => &mut self.textures,
            ResourceKind::Framebuffer => &mut self.framebuffers,
            ResourceKind::Shader => &mut self.shaders,
            ResourceKind::Buffer => &mut self.buffers,
        }
    }

    fn acquire(&mut self, kind: ResourceKind, bytes: usize) {
        *self.count_mut(kind) += 1;
        self.total_bytes += bytes;
    }

    fn release(&mut self, kind: ResourceKind, bytes: usize) {
        let count = self.count_mut(kind);
        *count = count.saturating_sub(1);
        self.total_bytes = self.total_bytes.saturating_sub(bytes);
    }
}

/// Handle of an RGBA8 texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

impl TextureHandle {
    pub fn memory_size(&self) -> usize {
        self.width as usize * self.height as usize * TEXTURE_BYTES_PER_PIXEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferHandle {
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle {
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    pub id: u64,
    pub bytes: usize,
}

#[derive(Debug, Clone)]
struct Allocation {
    id: u64,
    kind: ResourceKind,
    bytes: usize,
    /// Texture extent, zero for other kinds.
    extent: (u32, u32),
}

/// Owns the allocation ledger and the current performance profile.
pub struct ResourceArbiter {
    ceiling_bytes: usize,
    ledger: HashMap<String, Allocation>,
    usage: GpuMemoryUsage,
    next_id: u64,
    profile: PerformanceProfile,
    limits: Option<DeviceLimits>,
    fps_window: FpsWindow,
    performance_listeners: Listeners<PerformanceReport>,
}

impl ResourceArbiter {
    /// Create an arbiter with the given memory ceiling in bytes.
    pub fn new(ceiling_bytes: usize) -> Self {
        Self {
            ceiling_bytes,
            ledger: HashMap::new(),
            usage: GpuMemoryUsage::default(),
            next_id: 1,
            profile: PerformanceProfile::default(),
            limits: None,
            fps_window: FpsWindow::new(),
            performance_listeners: Listeners::new(),
        }
    }

    /// Pick the starting tier from device limits.
    pub fn initialize(&mut self, limits: DeviceLimits) {
        let name = limits.classify();
        self.profile = PerformanceProfile::preset(name).conservative();
        self.limits = Some(limits);
        info!(
            "GPU arbiter initialized: profile={}, max_texture={}, uniform_vectors={}, ceiling={}MB",
            name,
            limits.max_texture_size,
            limits.max_fragment_uniform_vectors,
            self.ceiling_bytes / (1024 * 1024)
        );
    }

    pub fn device_limits(&self) -> DeviceLimits {
        self.limits.unwrap_or_default()
    }

    pub fn performance_profile(&self) -> &PerformanceProfile {
        &self.profile
    }

    /// Switch to a named tier. Device policy (low power, no antialiasing)
    /// is applied to every tier.
    pub fn set_performance_profile(&mut self, name: &str) -> Result<()> {
        let name = name
            .parse::<ProfileName>()
            .map_err(|e| ShotlineError::InvalidParameter(e.to_string()))?;
        self.apply_profile(name);
        Ok(())
    }

    /// Typed form of [`ResourceArbiter::set_performance_profile`].
    pub fn apply_profile(&mut self, name: ProfileName) {
        if self.profile.name != name {
            info!("Performance profile {} -> {}", self.profile.name, name);
        }
        self.profile = PerformanceProfile::preset(name).conservative();
        self.fps_window.reset();
    }

    pub fn memory_usage(&self) -> GpuMemoryUsage {
        self.usage
    }

    fn admit(&mut self, key: &str, kind: ResourceKind, bytes: usize, extent: (u32, u32)) -> Option<u64> {
        let replaced = self.ledger.get(key).map_or(0, |a| a.bytes);
        let projected = (self.usage.total_bytes - replaced).checked_add(bytes)?;
        if projected > self.ceiling_bytes {
            warn!(
                "GPU allocation '{}' rejected: {} bytes would exceed ceiling ({} of {} in use)",
                key, bytes, self.usage.total_bytes, self.ceiling_bytes
            );
            return None;
        }

        if let Some(old) = self.ledger.remove(key) {
            self.usage.release(old.kind, old.bytes);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.usage.acquire(kind, bytes);
        self.ledger.insert(
            key.to_string(),
            Allocation {
                id,
                kind,
                bytes,
                extent,
            },
        );
        debug!("GPU allocation '{}' ({:?}, {} bytes)", key, kind, bytes);
        Some(id)
    }

    /// Allocate an RGBA8 texture of `width × height`.
    ///
    /// Re-allocating an existing key replaces it; the old allocation is
    /// released only if the new one fits.
    pub fn allocate_texture(&mut self, key: &str, width: u32, height: u32) -> Option<TextureHandle> {
        if width == 0 || height == 0 {
            return None;
        }
        let bytes = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(TEXTURE_BYTES_PER_PIXEL)?;
        self.admit(key, ResourceKind::Texture, bytes, (width, height))
            .map(|id| TextureHandle { id, width, height })
    }

    /// Allocate a framebuffer object. At most [`MAX_FRAMEBUFFERS`] may be
    /// alive at once, regardless of the byte budget.
    pub fn allocate_framebuffer(&mut self, key: &str) -> Option<FramebufferHandle> {
        let replacing = self
            .ledger
            .get(key)
            .is_some_and(|a| a.kind == ResourceKind::Framebuffer);
        if !replacing && self.usage.framebuffers >= MAX_FRAMEBUFFERS {
            warn!(
                "GPU framebuffer '{}' rejected: {} framebuffers already allocated",
                key, MAX_FRAMEBUFFERS
            );
            return None;
        }
        self.admit(key, ResourceKind::Framebuffer, 0, (0, 0))
            .map(|id| FramebufferHandle { id })
    }

    /// Record a compiled kernel program. Programs are cached by key, so a
    /// repeated request returns the existing handle without charging again.
    pub fn allocate_shader(&mut self, key: &str) -> Option<ShaderHandle> {
        if let Some(existing) = self.ledger.get(key).filter(|a| a.kind == ResourceKind::Shader) {
            return Some(ShaderHandle { id: existing.id });
        }
        self.admit(key, ResourceKind::Shader, SHADER_PROGRAM_BYTES, (0, 0))
            .map(|id| ShaderHandle { id })
    }

    /// Allocate a uniform/vertex buffer of `bytes`.
    pub fn allocate_buffer(&mut self, key: &str, bytes: usize) -> Option<BufferHandle> {
        self.admit(key, ResourceKind::Buffer, bytes, (0, 0))
            .map(|id| BufferHandle { id, bytes })
    }

    /// Release the allocation under `key`. Unknown keys are ignored.
    pub fn deallocate_resource(&mut self, key: &str) {
        if let Some(old) = self.ledger.remove(key) {
            self.usage.release(old.kind, old.bytes);
            debug!("GPU release '{}' ({:?}, {} bytes)", key, old.kind, old.bytes);
        }
    }

    /// Current texture allocated under `key`.
    pub fn texture(&self, key: &str) -> Option<TextureHandle> {
        self.ledger
            .get(key)
            .filter(|a| a.kind == ResourceKind::Texture)
            .map(|a| TextureHandle {
                id: a.id,
                width: a.extent.0,
                height: a.extent.1,
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ledger.contains_key(key)
    }

    /// Release every tracked allocation.
    pub fn cleanup(&mut self) {
        let count = self.ledger.len();
        self.ledger.clear();
        self.usage = GpuMemoryUsage::default();
        info!("GPU arbiter released {} allocations", count);
    }

    /// Cap the number of enabled effects at the profile's `max_effects`.
    pub fn optimize_effects_for_gpu(&self, stack: &[AppliedEffect]) -> Vec<AppliedEffect> {
        limit_enabled_effects(stack, self.profile.max_effects)
    }

    /// Register a callback for per-window performance reports.
    pub fn monitor_performance(&mut self, callback: impl Fn(&PerformanceReport) + Send + Sync + 'static) {
        self.performance_listeners.add(callback);
    }

    /// Snapshot of the performance listeners, for emitting outside a lock.
    pub fn performance_listeners(&self) -> Listeners<PerformanceReport> {
        self.performance_listeners.clone()
    }

    /// Count a presented frame. Returns a report when a window closes.
    /// The profile is never changed here.
    pub fn record_frame(&mut self, now: Instant) -> Option<PerformanceReport> {
        let fps = self.fps_window.record(now)?;
        Some(PerformanceReport {
            fps,
            memory_usage: self.usage,
            profile: self.profile.name,
        })
    }
}

impl Default for ResourceArbiter {
    fn default() -> Self {
        Self::new(GPU_MEMORY_CEILING)
    }
}

/// Sort `stack` by order and disable enabled effects from the end until at
/// most `max_enabled` remain enabled.
pub fn limit_enabled_effects(stack: &[AppliedEffect], max_enabled: usize) -> Vec<AppliedEffect> {
    let mut out = stack.to_vec();
    sort_stack(&mut out);

    let mut enabled = out.iter().filter(|e| e.enabled).count();
    for effect in out.iter_mut().rev() {
        if enabled <= max_enabled {
            break;
        }
        if effect.enabled {
            effect.enabled = false;
            enabled -= 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shotline_core::{Effect, EffectCategory, KernelKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const MB: usize = 1024 * 1024;

    fn effect(order: i32, enabled: bool) -> AppliedEffect {
        let mut applied = AppliedEffect::new(
            Effect {
                id: format!("e{}", order),
                name: "Invert".into(),
                category: EffectCategory::Color,
                kernel: KernelKind::Invert,
                parameters: vec![],
            },
            order,
        );
        applied.enabled = enabled;
        applied
    }

    #[test]
    fn test_initialize_forces_device_policy() {
        let mut arbiter = ResourceArbiter::default();
        arbiter.initialize(DeviceLimits::new(8192, 4096));
        let p = arbiter.performance_profile();
        assert_eq!(p.name, ProfileName::Medium);
        assert!(!p.antialiasing);
        assert_eq!(p.power_preference, crate::profile::PowerPreference::LowPower);
    }

    #[test]
    fn test_set_profile_by_name() {
        let mut arbiter = ResourceArbiter::default();
        arbiter.set_performance_profile("ultra-high").unwrap();
        assert_eq!(arbiter.performance_profile().max_effects, 12);
        assert!(!arbiter.performance_profile().antialiasing);

        let err = arbiter.set_performance_profile("warp").unwrap_err();
        assert!(matches!(err, ShotlineError::InvalidParameter(_)));
        assert_eq!(arbiter.performance_profile().name, ProfileName::UltraHigh);
    }

    #[test]
    fn test_texture_accounting() {
        let mut arbiter = ResourceArbiter::new(16 * MB);
        let tex = arbiter.allocate_texture("a", 512, 512).unwrap();
        assert_eq!(tex.memory_size(), MB);
        assert_eq!(arbiter.memory_usage().textures, 1);
        assert_eq!(arbiter.memory_usage().total_bytes, MB);

        arbiter.deallocate_resource("a");
        assert_eq!(arbiter.memory_usage(), GpuMemoryUsage::default());
    }

    #[test]
    fn test_ceiling_rejects_without_mutation() {
        let mut arbiter = ResourceArbiter::new(3 * MB);
        assert!(arbiter.allocate_texture("a", 512, 512).is_some());
        assert!(arbiter.allocate_texture("b", 512, 512).is_some());
        assert!(arbiter.allocate_texture("c", 512, 512).is_some());
        let before = arbiter.memory_usage();

        assert!(arbiter.allocate_texture("d", 512, 512).is_none());
        assert_eq!(arbiter.memory_usage(), before);
        assert!(!arbiter.contains("d"));
    }

    #[test]
    fn test_replacing_key_is_atomic() {
        let mut arbiter = ResourceArbiter::new(2 * MB);
        let first = arbiter.allocate_texture("input", 512, 512).unwrap();

        // Too large even after releasing the old one: old stays
        assert!(arbiter.allocate_texture("input", 1024, 1024).is_none());
        assert_eq!(arbiter.texture("input"), Some(first));

        // Fits once the old one is released
        let second = arbiter.allocate_texture("input", 724, 724).unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(arbiter.memory_usage().textures, 1);
        assert_eq!(arbiter.memory_usage().total_bytes, 724 * 724 * 4);
    }

    #[test]
    fn test_zero_sized_texture_rejected() {
        let mut arbiter = ResourceArbiter::default();
        assert!(arbiter.allocate_texture("z", 0, 10).is_none());
        assert_eq!(arbiter.memory_usage().textures, 0);
    }

    #[test]
    fn test_framebuffer_cap() {
        let mut arbiter = ResourceArbiter::default();
        for i in 0..MAX_FRAMEBUFFERS {
            assert!(arbiter.allocate_framebuffer(&format!("fb{}", i)).is_some());
        }
        assert!(arbiter.allocate_framebuffer("fb-extra").is_none());
        // Replacing an existing framebuffer is still allowed
        assert!(arbiter.allocate_framebuffer("fb0").is_some());
        assert_eq!(arbiter.memory_usage().framebuffers, MAX_FRAMEBUFFERS);
    }

    #[test]
    fn test_shader_cache_charges_once() {
        let mut arbiter = ResourceArbiter::default();
        let a = arbiter.allocate_shader("kernel.blur.low").unwrap();
        let b = arbiter.allocate_shader("kernel.blur.low").unwrap();
        assert_eq!(a, b);
        assert_eq!(arbiter.memory_usage().shaders, 1);
        assert_eq!(arbiter.memory_usage().total_bytes, SHADER_PROGRAM_BYTES);
    }

    #[test]
    fn test_unknown_deallocation_is_noop() {
        let mut arbiter = ResourceArbiter::default();
        arbiter.allocate_buffer("u", 256).unwrap();
        arbiter.deallocate_resource("missing");
        assert_eq!(arbiter.memory_usage().buffers, 1);
    }

    #[test]
    fn test_cleanup_releases_everything() {
        let mut arbiter = ResourceArbiter::default();
        arbiter.allocate_texture("t", 64, 64).unwrap();
        arbiter.allocate_framebuffer("f").unwrap();
        arbiter.allocate_shader("s").unwrap();
        arbiter.cleanup();
        assert_eq!(arbiter.memory_usage(), GpuMemoryUsage::default());
        assert!(arbiter.texture("t").is_none());
    }

    #[test]
    fn test_optimizer_disables_from_the_end() {
        let stack: Vec<_> = [5, 0, 3, 1, 4, 2].iter().map(|o| effect(*o, true)).collect();
        let out = limit_enabled_effects(&stack, 4);
        let enabled: Vec<i32> = out.iter().filter(|e| e.enabled).map(|e| e.order).collect();
        assert_eq!(enabled, vec![0, 1, 2, 3]);
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn test_optimizer_keeps_disabled_effects_disabled() {
        let stack = vec![effect(0, false), effect(1, true), effect(2, true)];
        let out = limit_enabled_effects(&stack, 1);
        let enabled: Vec<i32> = out.iter().filter(|e| e.enabled).map(|e| e.order).collect();
        assert_eq!(enabled, vec![1]);
    }

    #[test]
    fn test_record_frame_reports_without_changing_profile() {
        let mut arbiter = ResourceArbiter::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        arbiter.monitor_performance(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let t0 = Instant::now();
        let mut reports = Vec::new();
        for i in 0..=10u64 {
            if let Some(r) = arbiter.record_frame(t0 + Duration::from_millis(i * 100)) {
                reports.push(r);
            }
        }
        assert_eq!(reports.len(), 1);
        assert!((reports[0].fps - 11.0).abs() < 1e-9);
        assert_eq!(reports[0].profile, ProfileName::Low);

        arbiter.performance_listeners().emit(&reports[0]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(arbiter.performance_profile().name, ProfileName::Low);
    }

    proptest! {
        #[test]
        fn prop_optimizer_caps_and_is_idempotent(
            flags in prop::collection::vec(any::<bool>(), 0..16),
            max in 0usize..10,
        ) {
            let stack: Vec<_> = flags.iter().enumerate().map(|(i, on)| effect(i as i32, *on)).collect();
            let once = limit_enabled_effects(&stack, max);
            let enabled = once.iter().filter(|e| e.enabled).count();
            let before = stack.iter().filter(|e| e.enabled).count();
            prop_assert_eq!(enabled, before.min(max));
            prop_assert_eq!(limit_enabled_effects(&once, max), once);
        }
    }
}
