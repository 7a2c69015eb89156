use super::GridSpec;
use crate::common::*;

/// A box decoded from the model prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// The index of the sample within the batch.
    pub sample: usize,
    pub class: usize,
    /// The objectness of the anchor that produced the box.
    pub confidence: f32,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Detection {
    /// The `[sample, class, confidence, x, y, w, h]` row.
    pub fn to_row(&self) -> [f32; 7] {
        [
            self.sample as f32,
            self.class as f32,
            self.confidence,
            self.x,
            self.y,
            self.w,
            self.h,
        ]
    }

    /// The box in `[x, y, w, h]` center form, suitable for IoU.
    pub fn cxcywh(&self) -> [f32; 4] {
        [self.x, self.y, self.w, self.h]
    }
}

/// Decodes raw grid predictions of shape `[batch, S, S, C + 5B]` into boxes.
#[derive(Debug, Clone)]
pub struct GridDecoder {
    spec: GridSpec,
}

impl GridDecoder {
    pub fn new(spec: GridSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Emits one box per sample, cell and anchor whose objectness is not
    /// below `confidence_threshold`.
    ///
    /// The class of every anchor in a cell is the argmax of the cell's class
    /// scores. Boxes are ordered by sample, row, column and anchor. No
    /// suppression is performed.
    pub fn decode(
        &self,
        prediction: &ArrayView4<f32>,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let GridSpec {
            grid_size,
            num_anchors,
            num_classes,
        } = self.spec;
        let (batch_size, height, width, channels) = prediction.dim();
        ensure!(
            height == grid_size && width == grid_size && channels == self.spec.prediction_channels(),
            "expect prediction shape [_, {}, {}, {}], but get {:?}",
            grid_size,
            grid_size,
            self.spec.prediction_channels(),
            prediction.shape()
        );

        let size = grid_size as f32;
        let mut detections = vec![];

        for (sample, row, col) in iproduct!(0..batch_size, 0..grid_size, 0..grid_size) {
            let cell = prediction.slice(s![sample, row, col, ..]);
            let class = argmax(cell.slice(s![0..num_classes]).iter().copied());

            for anchor in 0..num_anchors {
                let offset = num_classes + anchor * 5;
                let confidence = cell[offset];
                if confidence < confidence_threshold {
                    continue;
                }

                detections.push(Detection {
                    sample,
                    class,
                    confidence,
                    x: (cell[offset + 1] + col as f32) / size,
                    y: (cell[offset + 2] + row as f32) / size,
                    w: cell[offset + 3],
                    h: cell[offset + 4],
                });
            }
        }

        Ok(detections)
    }

    /// Decodes into an `[N, 7]` array of
    /// `[sample, class, confidence, x, y, w, h]` rows.
    pub fn decode_tensor(
        &self,
        prediction: &ArrayView4<f32>,
        confidence_threshold: f32,
    ) -> Result<Array2<f32>> {
        let detections = self.decode(prediction, confidence_threshold)?;
        let values: Vec<_> = detections
            .iter()
            .flat_map(|detection| detection.to_row())
            .collect();
        let tensor = Array2::from_shape_vec([detections.len(), 7], values)?;
        Ok(tensor)
    }
}

/// The index of the first maximum.
fn argmax(values: impl Iterator<Item = f32>) -> usize {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (index, value)| match best {
            Some((_, best_value)) if best_value >= value => best,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
        .unwrap_or(0)
}
