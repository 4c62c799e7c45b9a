//! Integration tests for the resource arbiter.
//!
//! Exercises CPU-side bookkeeping only, no actual GPU required.

use crate::support::{catalog_effect, MB};
use shotline_core::KernelKind;
use shotline_gpu::{DeviceLimits, ProfileName, ResourceArbiter};

#[test]
fn optimizer_keeps_profile_budget_of_six_effects() {
    let mut arbiter = ResourceArbiter::default();
    arbiter.apply_profile(ProfileName::Low);
    let kinds = [
        KernelKind::Brightness,
        KernelKind::Contrast,
        KernelKind::Saturation,
        KernelKind::Sepia,
        KernelKind::Invert,
        KernelKind::Grayscale,
    ];
    let stack: Vec<_> = kinds
        .iter()
        .enumerate()
        .map(|(i, k)| catalog_effect(*k, i as i32))
        .collect();

    let optimized = arbiter.optimize_effects_for_gpu(&stack);
    let enabled: Vec<_> = optimized.iter().filter(|e| e.enabled).map(|e| e.order).collect();
    assert_eq!(enabled, vec![0, 1, 2, 3]);
    assert_eq!(arbiter.optimize_effects_for_gpu(&optimized), optimized);
}

#[test]
fn rejected_allocation_leaves_counters_unchanged() {
    let mut arbiter = ResourceArbiter::new(4 * MB);
    arbiter.allocate_texture("frame", 1024, 1024).unwrap();
    let before = arbiter.memory_usage();

    assert!(arbiter.allocate_texture("extra", 1, 1).is_none());
    assert!(arbiter.allocate_buffer("uniforms", 16).is_none());
    assert_eq!(arbiter.memory_usage(), before);
}

#[test]
fn device_limits_pick_tier() {
    let cases = [
        (DeviceLimits::new(8192, 1024), ProfileName::Medium),
        (DeviceLimits::new(2048, 128), ProfileName::Low),
        (DeviceLimits::new(1024, 64), ProfileName::UltraLow),
    ];
    for (limits, expected) in cases {
        let mut arbiter = ResourceArbiter::default();
        arbiter.initialize(limits);
        assert_eq!(arbiter.performance_profile().name, expected, "{:?}", limits);
    }
}

#[test]
fn cleanup_returns_usage_to_zero() {
    let mut arbiter = ResourceArbiter::default();
    arbiter.allocate_texture("t", 64, 64).unwrap();
    arbiter.allocate_framebuffer("f").unwrap();
    arbiter.allocate_shader("kernel.invert.low").unwrap();
    arbiter.cleanup();
    assert_eq!(arbiter.memory_usage().total_bytes, 0);
    assert_eq!(arbiter.memory_usage().framebuffers, 0);
}
