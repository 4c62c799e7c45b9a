//! Shotline Core - Foundation types for the preview compositor
//!
//! This crate provides the fundamental types used throughout Shotline:
//! - Keyframes, easings and interpolation
//! - Shots, transitions, text layers and effect stacks
//! - RGBA frame buffers, colours and geometric primitives

pub mod color;
pub mod effect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod keyframe;
pub mod listeners;
pub mod shot;
pub mod text;
pub mod transition;

pub use color::Color;
pub use effect::{
    sort_stack, AppliedEffect, Effect, EffectCategory, EffectParameter, KernelKind, ParamValue,
    ParamValues,
};
pub use error::{Result, ShotlineError};
pub use frame::{FrameBuffer, SharedFrameBuffer};
pub use geometry::{Rect, Transform2D, Vec2};
pub use keyframe::{interpolate, CubicBezier, Easing, KeyValue, Keyframe, KeyframeTrack};
pub use listeners::Listeners;
pub use shot::{AnimatableProperty, PixelSourceRef, PropertyKind, PropertyValues, Shot};
pub use text::{TextAnimation, TextAnimationKind, TextLayer};
pub use transition::{Transition, TransitionDirection, TransitionKind};

/// GPU budget constants for a device shared with another heavyweight
/// local process.
pub mod memory_budget {
    /// Default ceiling for all tracked GPU allocations.
    pub const GPU_MEMORY_CEILING: usize = 256 * 1024 * 1024; // 256 MB

    /// Maximum framebuffers alive at once.
    pub const MAX_FRAMEBUFFERS: usize = 8;

    /// Bytes per texel for RGBA8 textures.
    pub const TEXTURE_BYTES_PER_PIXEL: usize = 4;

    /// Smallest working resolution edge the compositor degrades to.
    pub const MIN_WORKING_EDGE: u32 = 64;
}
