//! Shotline Effects - Effect kernels, transitions and frame compositing
//!
//! Provides the kernel abstraction and built-in kernels, CPU stage
//! execution, transition blending, text placement, and the compositor that
//! turns a shot (or a shot pair mid-transition) into a presented frame
//! under the resource arbiter's budget.

pub mod chain;
pub mod compositor;
pub mod executor;
pub mod kernel;
pub mod kernels;
pub mod source;
pub mod text;
pub mod transition;

pub use chain::PingPong;
pub use compositor::{Compositor, FrameMetrics, FrameRequest, TransitionRequest};
pub use kernel::{EffectKernel, KernelRegistry, StageDesc, StageOp};
pub use source::{
    MemorySurface, OutputSurface, PixelSourceProvider, SourceFrame, StaticSourceProvider,
};
pub use text::TextDraw;
pub use transition::{renderer_for, TransitionRenderer};
