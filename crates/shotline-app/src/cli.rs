use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "shotline",
    author,
    version,
    about = "Real-time preview compositor for shot lists"
)]
pub struct Cli {
    /// Shot list file (JSON).
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Preview configuration file; defaults to the user config directory.
    #[arg(long, value_name = "PATH", env = "SHOTLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Playback speed, clamped to 0.25..=2.0.
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Start time in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub seek: f64,

    /// Stop threaded playback after this many wall-clock seconds.
    #[arg(long, value_name = "SECONDS")]
    pub duration_limit: Option<f64>,

    /// Write the last presented frame to this PNG.
    #[arg(long, value_name = "PNG")]
    pub snapshot: Option<PathBuf>,

    /// Advance this many fixed-budget ticks without a loop thread, then exit.
    #[arg(long, value_name = "N")]
    pub headless_steps: Option<u32>,

    /// Skip wgpu probing and use the configured (or conservative) limits.
    #[arg(long)]
    pub software: bool,
}
