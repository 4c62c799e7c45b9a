//! Integration test crate for Shotline.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every shotline crate to verify they work together.

#[cfg(test)]
mod support;

#[cfg(test)]
mod keyframes;

#[cfg(test)]
mod gpu;

#[cfg(test)]
mod compositor;

#[cfg(test)]
mod timeline;
