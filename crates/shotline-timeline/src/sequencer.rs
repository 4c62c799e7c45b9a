//! The sequencer: owns the shot list, the clock and the render context, and
//! runs the frame-budgeted render loop.
//!
//! All state lives behind one `parking_lot::Mutex`. The loop thread and
//! caller threads take turns on it, so arbiter mutations and compositing
//! never overlap. Listener callbacks are collected while locked and invoked
//! after the lock is released.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use shotline_core::{Listeners, Shot};
use shotline_effects::{FrameMetrics, FrameRequest};
use shotline_gpu::PerformanceReport;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::clock::{PlayState, PlaybackClock, TickOutcome};
use crate::context::RenderContext;
use crate::sequence::ShotSequence;

/// How playback time is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    /// `play()` spawns a loop thread paced by the profile's target FPS.
    Thread,
    /// No thread; the caller advances time with [`Sequencer::step`].
    Manual,
}

/// Control handles of one running loop. Each loop gets its own stop flag,
/// so a loop that outlives a pause/play cycle never resumes.
struct LoopControl {
    stop: Arc<AtomicBool>,
    wake: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl LoopControl {
    fn halt(&mut self) -> Option<JoinHandle<()>> {
        self.stop.store(true, Ordering::Release);
        let _ = self.wake.try_send(());
        self.thread.take()
    }
}

/// Listener calls deferred until the lock is released.
#[derive(Default)]
struct Notify {
    time: Option<(Listeners<f64>, f64)>,
    state: Option<(Listeners<PlayState>, PlayState)>,
    metrics: Option<(Listeners<FrameMetrics>, FrameMetrics)>,
    performance: Option<(Listeners<PerformanceReport>, PerformanceReport)>,
}

impl Notify {
    fn emit(self) {
        if let Some((listeners, state)) = self.state {
            listeners.emit(&state);
        }
        if let Some((listeners, metrics)) = self.metrics {
            listeners.emit(&metrics);
        }
        if let Some((listeners, report)) = self.performance {
            listeners.emit(&report);
        }
        if let Some((listeners, t)) = self.time {
            listeners.emit(&t);
        }
    }
}

struct Inner {
    sequence: ShotSequence,
    clock: PlaybackClock,
    ctx: RenderContext,
    time_listeners: Listeners<f64>,
    state_listeners: Listeners<PlayState>,
    active_loop: Option<LoopControl>,
}

impl Inner {
    fn state_changed(&self, notify: &mut Notify) {
        notify.state = Some((self.state_listeners.clone(), self.clock.state()));
    }

    fn time_changed(&self, notify: &mut Notify) {
        notify.time = Some((self.time_listeners.clone(), self.clock.current_time()));
    }

    /// Halt the running loop, if any, without waiting for it.
    fn halt_loop(&mut self) {
        if let Some(mut control) = self.active_loop.take() {
            // Detached: the thread exits at its next stop-flag check.
            drop(control.halt());
        }
    }

    /// Enter `Playing` once the loop (if any) is running. A loop that failed
    /// to spawn leaves the clock untouched so a later `play()` can retry.
    fn start(&mut self, spawned: Option<io::Result<LoopControl>>, notify: &mut Notify) -> bool {
        match spawned {
            Some(Err(e)) => {
                warn!("Failed to spawn render loop, staying {}: {}", self.clock.state(), e);
                return false;
            }
            Some(Ok(control)) => self.active_loop = Some(control),
            None => {}
        }
        self.clock.play();
        info!("Playback started at {:.3}s", self.clock.current_time());
        self.state_changed(notify);
        true
    }

    /// Composite the frame at the clock's current time.
    fn composite(&mut self, notify: &mut Notify) {
        let t = self.clock.current_time();
        let request = match resolve(&self.sequence, t) {
            Some(request) => request,
            None => {
                debug!("Nothing to composite at {:.3}s", t);
                return;
            }
        };
        let metrics = self.ctx.render(&request);
        notify.metrics = Some((self.ctx.compositor.metrics_listeners(), metrics));
        if let Some(report) = self.ctx.arbiter.record_frame(Instant::now()) {
            notify.performance = Some((self.ctx.arbiter.performance_listeners(), report));
        }
    }

    /// Advance one tick of `elapsed` wall seconds.
    fn tick(&mut self, elapsed: f64, notify: &mut Notify) -> TickOutcome {
        let outcome = self.clock.advance(elapsed);
        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Advanced(_) => {
                self.composite(notify);
                self.time_changed(notify);
            }
            TickOutcome::Ended => {
                info!("Playback reached the end of the sequence");
                self.active_loop = None;
                self.state_changed(notify);
                self.time_changed(notify);
            }
        }
        outcome
    }
}

/// Plays an ordered shot list through a [`RenderContext`].
pub struct Sequencer {
    inner: Arc<Mutex<Inner>>,
    drive: Drive,
}

impl Sequencer {
    /// Sequencer whose `play()` runs a loop thread.
    pub fn new(ctx: RenderContext) -> Self {
        Self::with_drive(ctx, Drive::Thread)
    }

    /// Sequencer advanced only through [`Sequencer::step`].
    pub fn manual(ctx: RenderContext) -> Self {
        Self::with_drive(ctx, Drive::Manual)
    }

    pub fn with_drive(ctx: RenderContext, drive: Drive) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                sequence: ShotSequence::default(),
                clock: PlaybackClock::default(),
                ctx,
                time_listeners: Listeners::new(),
                state_listeners: Listeners::new(),
                active_loop: None,
            })),
            drive,
        }
    }

    pub fn drive(&self) -> Drive {
        self.drive
    }

    /// Replace the shot list. The current time is kept, clamped to the new
    /// duration.
    pub fn set_shots(&self, shots: Vec<Shot>) {
        let mut notify = Notify::default();
        {
            let mut inner = self.inner.lock();
            inner.sequence.set_shots(shots);
            let total = inner.sequence.total_duration();
            let before = inner.clock.current_time();
            inner.clock.set_total(total);
            info!("Sequence set: {} shots, {:.3}s", inner.sequence.len(), total);
            if inner.clock.current_time() != before {
                inner.time_changed(&mut notify);
            }
            if !inner.clock.is_playing() {
                inner.composite(&mut notify);
            }
        }
        notify.emit();
    }

    pub fn shots(&self) -> Vec<Shot> {
        self.inner.lock().sequence.shots().to_vec()
    }

    pub fn total_duration(&self) -> f64 {
        self.inner.lock().sequence.total_duration()
    }

    pub fn current_time(&self) -> f64 {
        self.inner.lock().clock.current_time()
    }

    pub fn play_state(&self) -> PlayState {
        self.inner.lock().clock.state()
    }

    pub fn playback_speed(&self) -> f64 {
        self.inner.lock().clock.speed()
    }

    /// Start playback from the current time. No-op when already playing.
    pub fn play(&self) {
        let mut notify = Notify::default();
        {
            let mut inner = self.inner.lock();
            if inner.clock.is_playing() {
                return;
            }
            // The new loop blocks on this lock until the clock is playing.
            let spawned = (self.drive == Drive::Thread).then(|| spawn_loop(Arc::clone(&self.inner)));
            if !inner.start(spawned, &mut notify) {
                return;
            }
        }
        notify.emit();
    }

    /// Halt and keep the current time.
    pub fn pause(&self) {
        let mut notify = Notify::default();
        {
            let mut inner = self.inner.lock();
            inner.halt_loop();
            if inner.clock.pause() {
                info!("Playback paused at {:.3}s", inner.clock.current_time());
                inner.state_changed(&mut notify);
            }
        }
        notify.emit();
    }

    /// Halt and rewind to 0.
    pub fn stop(&self) {
        let mut notify = Notify::default();
        {
            let mut inner = self.inner.lock();
            inner.halt_loop();
            let moved = inner.clock.current_time() != 0.0;
            if inner.clock.stop() {
                info!("Playback stopped");
                inner.state_changed(&mut notify);
            }
            if moved {
                inner.time_changed(&mut notify);
            }
        }
        notify.emit();
    }

    /// Jump to `t`, clamped to `[0, total]`. Composites once unless playing;
    /// the play state is unchanged.
    pub fn seek(&self, t: f64) -> f64 {
        let mut notify = Notify::default();
        let time = {
            let mut inner = self.inner.lock();
            let time = inner.clock.seek(t);
            debug!("Seek to {:.3}s (requested {})", time, t);
            if !inner.clock.is_playing() {
                inner.composite(&mut notify);
            }
            inner.time_changed(&mut notify);
            time
        };
        notify.emit();
        time
    }

    /// Clamp into `[0.25, 2.0]` and return the applied speed.
    pub fn set_playback_speed(&self, speed: f64) -> f64 {
        let applied = self.inner.lock().clock.set_speed(speed);
        if applied != speed {
            debug!("Playback speed {} clamped to {}", speed, applied);
        }
        applied
    }

    /// Advance one tick with an explicit delta, as the loop thread does.
    pub fn step(&self, elapsed: f64) -> TickOutcome {
        let mut notify = Notify::default();
        let outcome = self.inner.lock().tick(elapsed, &mut notify);
        notify.emit();
        outcome
    }

    /// Volume of the shot under the playhead, 0 when nothing is there.
    pub fn current_volume(&self) -> f64 {
        let inner = self.inner.lock();
        let t = inner.clock.current_time();
        inner
            .sequence
            .shot_at_time(t)
            .map_or(0.0, |at| at.current.properties_at(at.shot_time).volume)
    }

    pub fn on_time(&self, callback: impl Fn(f64) + Send + Sync + 'static) {
        self.inner.lock().time_listeners.add(move |t: &f64| callback(*t));
    }

    pub fn on_play_state(&self, callback: impl Fn(PlayState) + Send + Sync + 'static) {
        self.inner
            .lock()
            .state_listeners
            .add(move |s: &PlayState| callback(*s));
    }

    pub fn on_metrics(&self, callback: impl Fn(&FrameMetrics) + Send + Sync + 'static) {
        self.inner.lock().ctx.compositor.on_metrics(callback);
    }

    pub fn monitor_performance(&self, callback: impl Fn(&PerformanceReport) + Send + Sync + 'static) {
        self.inner.lock().ctx.arbiter.monitor_performance(callback);
    }

    /// Run `f` with the render context locked. `f` must not call back into
    /// this sequencer.
    pub fn with_context<R>(&self, f: impl FnOnce(&mut RenderContext) -> R) -> R {
        f(&mut self.inner.lock().ctx)
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        let handle = {
            let mut inner = self.inner.lock();
            let handle = inner.active_loop.take().and_then(|mut control| control.halt());
            inner.ctx.release();
            handle
        };
        // A listener holding the last reference can drop us on the loop
        // thread itself; that thread exits on its own.
        if let Some(handle) = handle.filter(|h| h.thread().id() != std::thread::current().id()) {
            if handle.join().is_err() {
                warn!("Render loop thread panicked");
            }
        }
    }
}

/// What to draw at `t`. The end of the timeline shows the last shot's final
/// frame.
fn resolve(sequence: &ShotSequence, t: f64) -> Option<FrameRequest<'_>> {
    if let Some(at) = sequence.shot_at_time(t) {
        return Some(at.frame_request());
    }
    let last = sequence.shots().last()?;
    (t >= sequence.total_duration()).then(|| FrameRequest::shot(last, last.effective_duration()))
}

fn spawn_loop(inner: Arc<Mutex<Inner>>) -> io::Result<LoopControl> {
    let stop = Arc::new(AtomicBool::new(false));
    let (wake_tx, wake_rx) = bounded(1);
    let flag = Arc::clone(&stop);
    let thread = std::thread::Builder::new()
        .name("shotline-render".into())
        .spawn(move || run_loop(inner, flag, wake_rx))?;
    Ok(LoopControl {
        stop,
        wake: wake_tx,
        thread: Some(thread),
    })
}

fn run_loop(inner: Arc<Mutex<Inner>>, stop: Arc<AtomicBool>, wake: Receiver<()>) {
    debug!("Render loop started");
    let mut last = Instant::now();
    loop {
        let (notify, budget, outcome) = {
            let mut guard = inner.lock();
            if stop.load(Ordering::Acquire) {
                break;
            }
            let now = Instant::now();
            let elapsed = now.duration_since(last).as_secs_f64();
            last = now;
            let mut notify = Notify::default();
            let outcome = guard.tick(elapsed, &mut notify);
            let budget = guard.ctx.arbiter.performance_profile().frame_budget();
            (notify, budget, outcome)
        };
        notify.emit();

        if !matches!(outcome, TickOutcome::Advanced(_)) {
            break;
        }

        let deadline = last + budget;
        match wake.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(()) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Render loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotline_core::{Color, FrameBuffer, Transition, TransitionKind};
    use shotline_effects::{Compositor, MemorySurface, StaticSourceProvider};
    use shotline_gpu::{DeviceLimits, ResourceArbiter};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn context() -> RenderContext {
        let mut arbiter = ResourceArbiter::default();
        arbiter.initialize(DeviceLimits::new(4096, 256));
        let provider = StaticSourceProvider::new()
            .with_frame("a", FrameBuffer::filled(32, 18, Color::WHITE))
            .with_frame("b", FrameBuffer::filled(32, 18, Color::BLACK));
        RenderContext::new(
            arbiter,
            Compositor::default(),
            Box::new(provider),
            Box::new(MemorySurface::new(32, 18)),
        )
    }

    fn shots() -> Vec<Shot> {
        vec![
            Shot::new(0, 5.0, "a").with_transition(Transition::new(TransitionKind::Fade, 1.0)),
            Shot::new(1, 3.0, "b"),
        ]
    }

    #[test]
    fn test_seek_clamps_and_keeps_state() {
        let seq = Sequencer::manual(context());
        seq.set_shots(shots());
        assert_eq!(seq.total_duration(), 9.0);
        assert_eq!(seq.seek(100.0), 9.0);
        assert_eq!(seq.seek(-5.0), 0.0);
        assert_eq!(seq.play_state(), PlayState::Stopped);
    }

    #[test]
    fn test_seek_composites_when_not_playing() {
        let seq = Sequencer::manual(context());
        let frames = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&frames);
        seq.on_metrics(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        seq.set_shots(shots());
        let after_set = frames.load(Ordering::SeqCst);
        seq.seek(2.0);
        assert_eq!(frames.load(Ordering::SeqCst), after_set + 1);

        seq.play();
        seq.seek(3.0);
        assert_eq!(frames.load(Ordering::SeqCst), after_set + 1);
    }

    #[test]
    fn test_manual_step_reaches_end() {
        let seq = Sequencer::manual(context());
        seq.set_shots(vec![Shot::new(0, 0.05, "a")]);
        let states = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        seq.on_play_state(move |s| sink.lock().push(s));

        seq.play();
        assert!(matches!(seq.step(1.0 / 30.0), TickOutcome::Advanced(_)));
        assert_eq!(seq.step(1.0 / 30.0), TickOutcome::Ended);
        assert_eq!(seq.play_state(), PlayState::Stopped);
        assert_eq!(seq.current_time(), 0.0);
        assert_eq!(*states.lock(), vec![PlayState::Playing, PlayState::Stopped]);
    }

    #[test]
    fn test_pause_keeps_time_and_stop_rewinds() {
        let seq = Sequencer::manual(context());
        seq.set_shots(shots());
        seq.pause();
        assert_eq!(seq.play_state(), PlayState::Stopped);

        seq.play();
        seq.step(1.25);
        seq.pause();
        assert_eq!(seq.play_state(), PlayState::Paused);
        assert_eq!(seq.current_time(), 1.25);
        assert_eq!(seq.step(1.0), TickOutcome::Idle);

        seq.stop();
        assert_eq!(seq.current_time(), 0.0);
        assert_eq!(seq.play_state(), PlayState::Stopped);
    }

    #[test]
    fn test_failed_loop_spawn_leaves_clock_stopped() {
        let seq = Sequencer::manual(context());
        seq.set_shots(shots());
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        seq.on_play_state(move |s| sink.lock().push(s));

        let mut notify = Notify::default();
        let started = seq
            .inner
            .lock()
            .start(Some(Err(io::Error::other("no threads left"))), &mut notify);
        notify.emit();
        assert!(!started);
        assert_eq!(seq.play_state(), PlayState::Stopped);
        assert!(states.lock().is_empty());

        // A later play is not swallowed as "already playing".
        seq.play();
        assert_eq!(seq.play_state(), PlayState::Playing);
        assert_eq!(*states.lock(), vec![PlayState::Playing]);
    }

    #[test]
    fn test_set_shots_clamps_clock() {
        let seq = Sequencer::manual(context());
        seq.set_shots(shots());
        seq.seek(8.0);
        seq.set_shots(vec![Shot::new(0, 2.0, "a")]);
        assert_eq!(seq.current_time(), 2.0);
    }

    #[test]
    fn test_speed_clamped() {
        let seq = Sequencer::manual(context());
        assert_eq!(seq.set_playback_speed(4.0), 2.0);
        assert_eq!(seq.set_playback_speed(0.1), 0.25);
        assert_eq!(seq.playback_speed(), 0.25);
    }

    #[test]
    fn test_listener_may_reenter() {
        let seq = Arc::new(Sequencer::manual(context()));
        seq.set_shots(shots());
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let (handle, sink) = (Arc::downgrade(&seq), Arc::clone(&seen));
        seq.on_time(move |_| {
            if let Some(seq) = handle.upgrade() {
                *sink.lock() = Some(seq.current_time());
            }
        });
        seq.seek(4.0);
        assert_eq!(*seen.lock(), Some(4.0));
    }

    #[test]
    fn test_threaded_play_reaches_stopped() {
        let seq = Sequencer::new(context());
        seq.set_shots(vec![Shot::new(0, 0.05, "a")]);
        seq.play();
        let deadline = Instant::now() + Duration::from_secs(2);
        while seq.play_state() != PlayState::Stopped && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(seq.play_state(), PlayState::Stopped);
        assert_eq!(seq.current_time(), 0.0);
    }

    #[test]
    fn test_current_volume_follows_playhead() {
        let seq = Sequencer::manual(context());
        assert_eq!(seq.current_volume(), 0.0);
        seq.set_shots(shots());
        assert_eq!(seq.current_volume(), 1.0);
    }
}
