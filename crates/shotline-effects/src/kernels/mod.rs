pub mod blur;
pub mod color;
pub mod transform;

pub use blur::Blur;
pub use color::{Brightness, Contrast, Grayscale, Invert, Saturation, Sepia, Vintage};
pub use transform::{Rotation, Scale};
