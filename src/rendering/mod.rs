//! Shader pipeline, post effects and the display compositor.

pub mod bloom;
pub mod compositor;
pub mod dither;
pub mod kernel;
pub mod shaders;
pub mod sunrays;

pub use bloom::Bloom;
pub use compositor::{Compositor, DisplayInputs};
pub use dither::DitherTexture;
pub use kernel::Kernel;
pub use sunrays::Sunrays;
