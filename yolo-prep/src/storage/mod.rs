//! Remote storage helpers for training artifacts.

pub mod checkpoint;
pub mod drive;

pub use checkpoint::*;
pub use drive::*;
