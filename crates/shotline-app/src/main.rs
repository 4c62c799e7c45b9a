//! Shotline - Real-time preview compositor
//!
//! Entry point: loads a shot list, sizes the resource arbiter to the
//! device, and plays the sequence headlessly or on the render loop.

mod cli;
mod config;
mod sources;
mod surface;

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use shotline_effects::Compositor;
use shotline_gpu::{
    DeviceLimits, GpuContext, PerformanceReport, PowerPreference, ResourceArbiter, TierAdvice,
    TierAdvisor,
};
use shotline_timeline::{Drive, PlayState, RenderContext, Sequencer, ShotListFile, TickOutcome};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::PreviewConfig;
use crate::sources::ImageSourceProvider;
use crate::surface::SnapshotSurface;

/// How long the runner waits for still images before starting playback.
const PRELOAD_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PreviewConfig::load(cli.config.as_deref())?;
    initialise_tracing(&config.log_filter);

    info!("Shotline preview starting...");
    run(cli, config)
}

fn initialise_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: Cli, config: PreviewConfig) -> Result<()> {
    let file = ShotListFile::load_from_file(&cli.project)
        .with_context(|| format!("failed to load shot list {}", cli.project.display()))?;
    info!("Loaded '{}' with {} shots", file.name, file.shots.len());

    let mut arbiter = ResourceArbiter::new(config.ceiling_bytes());
    arbiter.initialize(device_limits(&cli, &config));
    if let Some(profile) = config.initial_profile {
        arbiter.apply_profile(profile);
    }
    info!("Performance profile: {}", arbiter.performance_profile().name);

    let root = cli.project.parent().unwrap_or(Path::new(".")).to_path_buf();
    let provider = ImageSourceProvider::new(root);
    provider.preload(&file.shots);
    if !provider.wait_ready(PRELOAD_TIMEOUT) {
        warn!("Some sources are still decoding; they show as missing until ready");
    }

    let (width, height) = config.canvas_size();
    let (surface, snapshot) = SnapshotSurface::new(width, height);
    let ctx = RenderContext::new(
        arbiter,
        Compositor::new(config.background_color()),
        Box::new(provider),
        Box::new(surface),
    );

    let drive = if cli.headless_steps.is_some() {
        Drive::Manual
    } else {
        Drive::Thread
    };
    let sequencer = Sequencer::with_drive(ctx, drive);

    sequencer.on_metrics(|metrics| {
        debug!(
            "fps {:.1}, {:.2}ms, {} effects, {:.1}MB",
            metrics.fps, metrics.render_time_ms, metrics.effect_count, metrics.gpu_memory_mb
        );
    });
    sequencer.on_play_state(|state| info!("Play state: {}", state));

    let advice = config.adaptive_tiering.then(|| watch_performance(&sequencer));

    sequencer.set_playback_speed(cli.speed);
    sequencer.set_shots(file.shots);
    let start = sequencer.seek(cli.seek);
    info!(
        "Sequence length {:.3}s, starting at {:.3}s",
        sequencer.total_duration(),
        start
    );

    match cli.headless_steps {
        Some(steps) => play_headless(&sequencer, steps, advice.as_ref()),
        None => play_threaded(&sequencer, cli.duration_limit, advice.as_ref()),
    }

    if let Some(path) = &cli.snapshot {
        snapshot.write_png(path)?;
    }
    info!("Presented {} frames", snapshot.presents());
    Ok(())
}

/// Configured limits, or the probed adapter's, or conservative defaults.
fn device_limits(cli: &Cli, config: &PreviewConfig) -> DeviceLimits {
    if let Some(limits) = config.device_limits {
        return limits;
    }
    if cli.software {
        return DeviceLimits::default();
    }
    match GpuContext::probe_blocking(PowerPreference::LowPower) {
        Ok(gpu) => {
            let adapter = gpu.adapter_info();
            info!("Adapter: {} ({:?})", adapter.name, adapter.backend);
            gpu.limits()
        }
        Err(e) => {
            warn!("GPU probe failed, using conservative limits: {}", e);
            DeviceLimits::default()
        }
    }
}

/// Feed performance reports through a [`TierAdvisor`]; advice arrives on
/// the returned channel and is applied by the runner outside any callback.
fn watch_performance(sequencer: &Sequencer) -> Receiver<TierAdvice> {
    let (tx, rx) = unbounded();
    let ceiling = sequencer.with_context(|ctx| ctx.arbiter.device_limits().classify());
    let advisor = Mutex::new(TierAdvisor::new().with_ceiling(ceiling));
    sequencer.monitor_performance(move |report: &PerformanceReport| {
        if let Some(advice) = advisor.lock().observe(report) {
            let _ = tx.send(advice);
        }
    });
    rx
}

fn apply_advice(sequencer: &Sequencer, advice: TierAdvice) {
    let target = advice.target();
    info!("Switching performance profile to {} ({:?})", target, advice);
    sequencer.with_context(|ctx| ctx.arbiter.apply_profile(target));
}

fn drain_advice(sequencer: &Sequencer, advice: Option<&Receiver<TierAdvice>>) {
    if let Some(rx) = advice {
        while let Ok(a) = rx.try_recv() {
            apply_advice(sequencer, a);
        }
    }
}

fn play_headless(sequencer: &Sequencer, steps: u32, advice: Option<&Receiver<TierAdvice>>) {
    if steps == 0 {
        return;
    }
    sequencer.play();
    for _ in 0..steps {
        let budget = sequencer
            .with_context(|ctx| ctx.arbiter.performance_profile().frame_budget())
            .as_secs_f64();
        let outcome = sequencer.step(budget);
        drain_advice(sequencer, advice);
        if outcome == TickOutcome::Ended {
            return;
        }
    }
    sequencer.pause();
}

fn play_threaded(sequencer: &Sequencer, limit: Option<f64>, advice: Option<&Receiver<TierAdvice>>) {
    let limit = limit.filter(|l| l.is_finite() && *l >= 0.0).map(Duration::from_secs_f64);
    let started = Instant::now();
    sequencer.play();

    let poll = Duration::from_millis(50);
    // Stands in for the advice channel when tiering is off.
    let (_idle_tx, idle_rx) = unbounded::<TierAdvice>();
    let rx = advice.unwrap_or(&idle_rx);

    while sequencer.play_state() == PlayState::Playing {
        if limit.is_some_and(|l| started.elapsed() >= l) {
            info!("Duration limit reached");
            sequencer.pause();
            break;
        }
        match rx.recv_timeout(poll) {
            Ok(a) => apply_advice(sequencer, a),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => std::thread::sleep(poll),
        }
    }
}
