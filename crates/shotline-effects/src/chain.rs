//! Ping-pong execution of a stage chain.

use shotline_core::{FrameBuffer, SharedFrameBuffer};

use crate::executor::execute_stage;
use crate::kernel::StageDesc;

/// Backing storage for the input texture and the ping-pong framebuffer's
/// colour attachment. Each stage reads one side and writes the other.
#[derive(Debug, Clone)]
pub struct PingPong {
    input: FrameBuffer,
    target: FrameBuffer,
    front_is_input: bool,
}

impl PingPong {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            input: FrameBuffer::new(width, height),
            target: FrameBuffer::new(width, height),
            front_is_input: true,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.input.width, self.input.height)
    }

    /// Resize both sides, discarding contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.size() != (width, height) {
            *self = Self::new(width, height);
        }
    }

    /// Upload a source frame into the input side, rescaling to fit.
    pub fn upload(&mut self, source: &SharedFrameBuffer) {
        self.input.blit_scaled_from(source);
        self.front_is_input = true;
    }

    /// Buffer holding the latest result.
    pub fn front(&self) -> &FrameBuffer {
        if self.front_is_input {
            &self.input
        } else {
            &self.target
        }
    }

    /// Run one stage from the front side into the back side, then swap.
    pub fn apply(&mut self, stage: &StageDesc) {
        if self.front_is_input {
            execute_stage(stage, &self.input, &mut self.target);
        } else {
            execute_stage(stage, &self.target, &mut self.input);
        }
        self.front_is_input = !self.front_is_input;
    }

    /// Run `stages` in order. Returns the number executed.
    pub fn run(&mut self, stages: &[StageDesc]) -> usize {
        for stage in stages {
            self.apply(stage);
        }
        stages.len()
    }
}
