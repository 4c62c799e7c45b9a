//! Integration tests for compositing through a render context.

use crate::support::{catalog_effect, context, MB};
use shotline_core::{Color, KernelKind, Shot, Transition, TransitionDirection, TransitionKind};
use shotline_effects::FrameRequest;
use shotline_timeline::ShotSequence;

#[test]
fn effect_stack_applies_to_presented_frame() {
    let (mut ctx, surface) = context(256 * MB);
    let shot = Shot::new(0, 2.0, "a").with_effect(catalog_effect(KernelKind::Invert, 0));

    let metrics = ctx.render(&FrameRequest::shot(&shot, 0.5));
    assert_eq!(metrics.effect_count, 1);
    assert_eq!(surface.pixel(8, 4), Some([255, 255, 255, 255]));
    assert!(metrics.gpu_memory_mb > 0.0);
}

#[test]
fn exhausted_budget_presents_background() {
    let (mut ctx, surface) = context(0);
    ctx.compositor.set_background(Color::rgb(0.0, 0.0, 1.0));
    let shot = Shot::new(0, 2.0, "b");

    ctx.render(&FrameRequest::shot(&shot, 0.0));
    assert_eq!(surface.pixel(0, 0), Some([0, 0, 255, 255]));
    assert_eq!(ctx.arbiter.memory_usage().total_bytes, 0);
}

#[test]
fn wipe_left_through_sequence_lookup() {
    let (mut ctx, surface) = context(256 * MB);
    let seq = ShotSequence::new(vec![
        Shot::new(0, 1.0, "a").with_transition(
            Transition::new(TransitionKind::Wipe, 1.0).with_direction(TransitionDirection::Left),
        ),
        Shot::new(1, 1.0, "b"),
    ]);

    let at = seq.shot_at_time(1.5).unwrap();
    ctx.render(&at.frame_request());
    // Incoming white covers the left half of the 16px canvas
    assert_eq!(surface.pixel(3, 4), Some([255, 255, 255, 255]));
    assert_eq!(surface.pixel(12, 4), Some([0, 0, 0, 255]));
}

#[test]
fn release_returns_every_resource() {
    let (mut ctx, _surface) = context(256 * MB);
    let shot = Shot::new(0, 2.0, "a").with_effect(catalog_effect(KernelKind::Sepia, 0));
    ctx.render(&FrameRequest::shot(&shot, 0.0));
    assert!(ctx.arbiter.memory_usage().total_bytes > 0);

    ctx.release();
    assert_eq!(ctx.arbiter.memory_usage().total_bytes, 0);
}
