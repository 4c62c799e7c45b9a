//! Shotline Timeline - Shot sequencing and playback
//!
//! Implements the playback side of the preview engine:
//! - Ordered shot lists and timeline-to-shot resolution
//! - The playback clock state machine
//! - The sequencer with its frame-budgeted render loop
//! - Versioned shot list files

pub mod clock;
pub mod context;
pub mod sequence;
pub mod sequencer;
pub mod serialization;

pub use clock::{PlayState, PlaybackClock, TickOutcome, MAX_SPEED, MIN_SPEED};
pub use context::RenderContext;
pub use sequence::{ShotAtTime, ShotSequence};
pub use sequencer::{Drive, Sequencer};
pub use serialization::{ShotListFile, CURRENT_VERSION};
