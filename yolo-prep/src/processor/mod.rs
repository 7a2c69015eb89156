//! Data augmentation building blocks.

pub mod augmentation;
pub mod crop;
pub mod flip;
pub mod saturation;

pub use augmentation::*;
pub use crop::*;
pub use flip::*;
pub use saturation::*;
