//! Integration tests for keyframe evaluation through shots.

use proptest::prelude::*;
use shotline_core::{interpolate, Easing, KeyValue, Keyframe, KeyframeTrack, PropertyKind, Shot};

#[test]
fn linear_keyframes_are_exact() {
    let track = KeyframeTrack::from_keyframes([Keyframe::new(0.0, 0.0), Keyframe::new(2.0, 100.0)]);
    assert_eq!(track.evaluate(0.5), Some(KeyValue::Scalar(25.0)));
    assert_eq!(track.evaluate(1.0), Some(KeyValue::Scalar(50.0)));
}

#[test]
fn shot_opacity_follows_track_and_clamps() {
    let shot = Shot::new(0, 4.0, "a").with_animation(
        PropertyKind::Opacity,
        KeyframeTrack::from_keyframes([Keyframe::new(1.0, 0.0), Keyframe::new(3.0, 2.0)]),
    );
    assert_eq!(shot.properties_at(0.0).opacity, 0.0);
    assert_eq!(shot.properties_at(2.0).opacity, 1.0);
    assert_eq!(shot.properties_at(2.5).opacity, 1.0);
    assert_eq!(shot.properties_at(1.5).opacity, 0.5);
}

#[test]
fn eased_segment_uses_previous_keyframe_easing() {
    let track = KeyframeTrack::from_keyframes([
        Keyframe::with_easing(0.0, 0.0, Easing::EaseIn),
        Keyframe::new(1.0, 1.0),
    ]);
    assert_eq!(track.evaluate(0.5), Some(KeyValue::Scalar(0.25)));
}

proptest! {
    #[test]
    fn values_clamp_outside_the_keyed_range(
        t0 in -100.0f64..100.0,
        span in 0.01f64..50.0,
        v0 in -1e3f64..1e3,
        v1 in -1e3f64..1e3,
        before in 0.0f64..1e3,
        after in 0.0f64..1e3,
    ) {
        let kfs = [Keyframe::new(t0, v0), Keyframe::new(t0 + span, v1)];
        prop_assert_eq!(interpolate(&kfs, t0 - before), Some(KeyValue::Scalar(v0)));
        prop_assert_eq!(interpolate(&kfs, t0 + span + after), Some(KeyValue::Scalar(v1)));
    }
}
