//! Conversion between boxes and the YOLO grid representation.

pub mod decoder;
pub mod encoder;

pub use decoder::*;
pub use encoder::*;

use crate::common::*;

/// The grid parameters shared by the model, the encoder and the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSpec {
    /// The grid size S. The image is divided into S x S cells.
    pub grid_size: usize,
    /// The number of boxes B predicted per cell.
    pub num_anchors: usize,
    /// The number of classes C.
    pub num_classes: usize,
}

impl GridSpec {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.grid_size > 0, "grid_size must be positive");
        ensure!(self.num_anchors > 0, "num_anchors must be positive");
        ensure!(self.num_classes > 0, "num_classes must be positive");
        Ok(())
    }

    /// The number of channels per cell in the model prediction, `C + 5B`.
    pub fn prediction_channels(&self) -> usize {
        self.num_classes + self.num_anchors * 5
    }

    /// The number of channels per cell in the label grid, `C + 5`.
    pub fn label_channels(&self) -> usize {
        self.num_classes + 5
    }
}
