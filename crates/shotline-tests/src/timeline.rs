//! Integration tests for sequencing and playback.

use crate::support::{context, MB};
use shotline_core::{Shot, Transition, TransitionKind};
use shotline_timeline::{PlayState, Sequencer, ShotListFile, ShotSequence};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn five_then_three(fade: bool) -> Vec<Shot> {
    let mut first = Shot::new(0, 5.0, "a");
    if fade {
        first = first.with_transition(Transition::new(TransitionKind::Fade, 1.0));
    }
    vec![first, Shot::new(1, 3.0, "b")]
}

#[test]
fn total_duration_is_additive() {
    assert_eq!(ShotSequence::new(five_then_three(true)).total_duration(), 9.0);
    assert_eq!(ShotSequence::new(five_then_three(false)).total_duration(), 8.0);
}

#[test]
fn mid_transition_seek_blends_both_shots() {
    let (ctx, surface) = context(256 * MB);
    let sequencer = Sequencer::manual(ctx);
    sequencer.set_shots(five_then_three(true));

    let seq = ShotSequence::new(sequencer.shots());
    let at = seq.shot_at_time(5.5).unwrap();
    assert!(at.is_in_transition);
    assert!((at.transition_progress - 0.5).abs() < 1e-12);
    assert_eq!(at.current.pixel_source.as_str(), "a");
    assert_eq!(at.next.unwrap().pixel_source.as_str(), "b");

    sequencer.seek(5.5);
    assert_eq!(surface.pixel(8, 4), Some([128, 128, 128, 255]));
}

#[test]
fn seek_clamps_to_timeline() {
    let (ctx, _surface) = context(256 * MB);
    let sequencer = Sequencer::manual(ctx);
    sequencer.set_shots(five_then_three(true));
    assert_eq!(sequencer.seek(100.0), 9.0);
    assert_eq!(sequencer.seek(-5.0), 0.0);
}

#[test]
fn short_shot_plays_to_stopped() {
    let (ctx, surface) = context(256 * MB);
    let sequencer = Sequencer::new(ctx);
    sequencer.set_shots(vec![Shot::new(0, 0.05, "a")]);

    let stops = Arc::new(parking_lot::Mutex::new(0));
    let sink = Arc::clone(&stops);
    sequencer.on_play_state(move |state| {
        if state == PlayState::Stopped {
            *sink.lock() += 1;
        }
    });

    sequencer.play();
    let deadline = Instant::now() + Duration::from_secs(2);
    while sequencer.play_state() != PlayState::Stopped && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(sequencer.play_state(), PlayState::Stopped);
    assert_eq!(sequencer.current_time(), 0.0);
    assert_eq!(*stops.lock(), 1);
    assert!(surface.presents() >= 1);
}

#[test]
fn seek_then_play_resumes_from_sought_time() {
    let (ctx, _surface) = context(256 * MB);
    let sequencer = Sequencer::manual(ctx);
    sequencer.set_shots(five_then_three(true));
    sequencer.seek(6.0);
    sequencer.play();
    sequencer.step(0.5);
    assert_eq!(sequencer.current_time(), 6.5);
}

#[test]
fn shot_list_file_feeds_sequencer() {
    let file = ShotListFile::new("demo", five_then_three(true));
    let loaded = ShotListFile::from_json(&file.to_json().unwrap()).unwrap();

    let (ctx, _surface) = context(256 * MB);
    let sequencer = Sequencer::manual(ctx);
    sequencer.set_shots(loaded.shots);
    assert_eq!(sequencer.total_duration(), 9.0);
}

#[test]
fn legacy_bare_array_loads() {
    let raw = serde_json::json!([
        {"position": 1, "duration": 3.0, "pixel_source": "b"},
        {"position": 0, "duration": 5.0, "pixel_source": "a",
         "transition_out": {"type": "fade", "duration": 1.0}},
    ]);
    let file = ShotListFile::from_json(&serde_json::to_vec(&raw).unwrap()).unwrap();
    let seq = ShotSequence::new(file.shots);
    assert_eq!(seq.total_duration(), 9.0);
    assert_eq!(seq.shots()[0].pixel_source.as_str(), "a");
}
