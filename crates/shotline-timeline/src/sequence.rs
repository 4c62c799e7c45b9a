//! Ordered shot list and timeline lookup.
//!
//! The timeline is the concatenation, in `position` order, of each shot
//! followed by its outgoing transition. The last shot's transition has no
//! incoming shot and contributes no time.

use shotline_core::Shot;
use shotline_effects::{FrameRequest, TransitionRequest};

/// Where a timeline instant falls.
#[derive(Debug, Clone, Copy)]
pub struct ShotAtTime<'a> {
    pub index: usize,
    pub current: &'a Shot,
    /// Incoming shot, set only during a transition.
    pub next: Option<&'a Shot>,
    /// Time relative to the current shot's start. During a transition this
    /// is the shot's full duration.
    pub shot_time: f64,
    pub is_in_transition: bool,
    /// Linear progress through the transition, before easing.
    pub transition_progress: f64,
}

impl<'a> ShotAtTime<'a> {
    /// Compositor request for this instant.
    pub fn frame_request(&self) -> FrameRequest<'a> {
        let current = self.current;
        let transition = match (self.is_in_transition, &current.transition_out, self.next) {
            (true, Some(transition), Some(incoming)) => Some(TransitionRequest {
                transition,
                incoming,
                progress: self.transition_progress,
            }),
            _ => None,
        };
        FrameRequest {
            shot: current,
            shot_time: self.shot_time,
            transition,
        }
    }
}

/// Shots sorted by `position`.
#[derive(Debug, Clone, Default)]
pub struct ShotSequence {
    shots: Vec<Shot>,
}

impl ShotSequence {
    pub fn new(shots: Vec<Shot>) -> Self {
        let mut seq = Self::default();
        seq.set_shots(shots);
        seq
    }

    /// Replace the list, re-sorting by position. Ties keep input order.
    pub fn set_shots(&mut self, mut shots: Vec<Shot>) {
        shots.sort_by_key(|s| s.position);
        self.shots = shots;
    }

    pub fn shots(&self) -> &[Shot] {
        &self.shots
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    /// Transition time contributed after shot `index`.
    fn transition_span(&self, index: usize) -> f64 {
        if index + 1 >= self.shots.len() {
            return 0.0;
        }
        self.shots[index]
            .transition_out
            .as_ref()
            .map_or(0.0, |t| t.effective_duration())
    }

    /// Sum of all shot durations plus every transition except the last
    /// shot's.
    pub fn total_duration(&self) -> f64 {
        self.start_of(self.shots.len())
    }

    /// Timeline time at which shot `index` starts.
    pub fn shot_start(&self, index: usize) -> Option<f64> {
        (index < self.shots.len()).then(|| self.start_of(index))
    }

    /// Accumulated in the same order as [`Self::shot_at_time`] walks, so
    /// the two agree to the last bit.
    fn start_of(&self, index: usize) -> f64 {
        let mut accum = 0.0;
        for (i, shot) in self.shots.iter().enumerate().take(index) {
            accum += shot.effective_duration();
            accum += self.transition_span(i);
        }
        accum
    }

    /// Resolve timeline time `t`. `None` outside `[0, total)`.
    pub fn shot_at_time(&self, t: f64) -> Option<ShotAtTime<'_>> {
        if !(t >= 0.0) {
            return None;
        }
        let mut accum = 0.0;
        for (i, shot) in self.shots.iter().enumerate() {
            let duration = shot.effective_duration();
            if t < accum + duration {
                return Some(ShotAtTime {
                    index: i,
                    current: shot,
                    next: None,
                    shot_time: t - accum,
                    is_in_transition: false,
                    transition_progress: 0.0,
                });
            }
            accum += duration;

            let span = self.transition_span(i);
            if t < accum + span {
                return Some(ShotAtTime {
                    index: i,
                    current: shot,
                    next: self.shots.get(i + 1),
                    shot_time: duration,
                    is_in_transition: true,
                    transition_progress: ((t - accum) / span).clamp(0.0, 1.0),
                });
            }
            accum += span;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shotline_core::{Transition, TransitionKind};

    fn two_shots(fade: bool) -> ShotSequence {
        let mut a = Shot::new(0, 5.0, "a");
        if fade {
            a = a.with_transition(Transition::new(TransitionKind::Fade, 1.0));
        }
        ShotSequence::new(vec![Shot::new(1, 3.0, "b"), a])
    }

    #[test]
    fn test_sorted_by_position() {
        let seq = two_shots(false);
        assert_eq!(seq.shots()[0].pixel_source.as_str(), "a");
    }

    #[test]
    fn test_total_duration_additive() {
        assert_eq!(two_shots(true).total_duration(), 9.0);
        assert_eq!(two_shots(false).total_duration(), 8.0);
    }

    #[test]
    fn test_last_shot_transition_ignored() {
        let seq = ShotSequence::new(vec![
            Shot::new(0, 2.0, "a"),
            Shot::new(1, 2.0, "b").with_transition(Transition::new(TransitionKind::Fade, 5.0)),
        ]);
        assert_eq!(seq.total_duration(), 4.0);
        assert!(seq.shot_at_time(4.5).is_none());
    }

    #[test]
    fn test_transition_midpoint() {
        let seq = two_shots(true);
        let at = seq.shot_at_time(5.5).unwrap();
        assert_eq!(at.current.pixel_source.as_str(), "a");
        assert_eq!(at.next.unwrap().pixel_source.as_str(), "b");
        assert!(at.is_in_transition);
        assert!((at.transition_progress - 0.5).abs() < 1e-12);
        assert_eq!(at.shot_time, 5.0);

        let req = at.frame_request();
        assert!(req.transition.is_some());
    }

    #[test]
    fn test_no_next_shot_inside_a_shot() {
        let seq = two_shots(true);
        let at = seq.shot_at_time(1.0).unwrap();
        assert!(!at.is_in_transition);
        assert!(at.next.is_none());
        assert!(at.frame_request().transition.is_none());
    }

    #[test]
    fn test_incoming_shot_after_transition() {
        let seq = two_shots(true);
        let at = seq.shot_at_time(6.25).unwrap();
        assert_eq!(at.current.pixel_source.as_str(), "b");
        assert!((at.shot_time - 0.25).abs() < 1e-12);
        assert!(!at.is_in_transition);
        assert_eq!(seq.shot_start(1), Some(6.0));
    }

    #[test]
    fn test_out_of_range() {
        let seq = two_shots(true);
        assert!(seq.shot_at_time(9.0).is_none());
        assert!(seq.shot_at_time(-0.1).is_none());
        assert!(seq.shot_at_time(f64::NAN).is_none());
        assert!(ShotSequence::default().shot_at_time(0.0).is_none());
    }

    #[test]
    fn test_invalid_durations_count_as_zero() {
        let seq = ShotSequence::new(vec![
            Shot::new(0, -1.0, "neg"),
            Shot::new(1, f64::NAN, "nan"),
            Shot::new(2, 2.0, "ok"),
        ]);
        assert_eq!(seq.total_duration(), 2.0);
        assert_eq!(seq.shot_at_time(0.0).unwrap().current.pixel_source.as_str(), "ok");
    }

    fn arb_sequence() -> impl Strategy<Value = ShotSequence> {
        prop::collection::vec((0.1f64..10.0, prop::option::of(0.1f64..3.0)), 1..8).prop_map(|specs| {
            ShotSequence::new(
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (dur, td))| {
                        let shot = Shot::new(i as i32, dur, format!("s{}", i));
                        match td {
                            Some(td) => shot.with_transition(Transition::new(TransitionKind::Fade, td)),
                            None => shot,
                        }
                    })
                    .collect(),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_partition_covers_timeline(seq in arb_sequence(), frac in 0.0f64..1.0) {
            let total = seq.total_duration();
            let t = total * frac;
            prop_assume!(t < total);
            let at = seq.shot_at_time(t).expect("every t in [0, total) resolves");
            let start = seq.shot_start(at.index).unwrap();
            let dur = at.current.effective_duration();
            if at.is_in_transition {
                prop_assert!(at.next.is_some());
                prop_assert_eq!(at.shot_time, dur);
                prop_assert!((0.0..=1.0).contains(&at.transition_progress));
                prop_assert!(t >= start + dur);
            } else {
                prop_assert!(at.next.is_none());
                prop_assert!(at.shot_time >= 0.0 && at.shot_time < dur);
                prop_assert!((start + at.shot_time - t).abs() < 1e-9);
            }
        }
    }
}
