use super::GridSpec;
use crate::{
    common::*,
    label::RatioLabel,
    record::{RawTensorCodec, TensorCodec, TrainingExample},
};

/// Encodes boxes into the per-cell YOLO label grid.
///
/// The output grid has shape `[S, S, C + 5]`. Each cell stores the one-hot
/// class, the objectness, the box center relative to the cell origin, and
/// the box size relative to the image.
#[derive(Debug, Clone)]
pub struct GridEncoder<T = RawTensorCodec>
where
    T: TensorCodec,
{
    spec: GridSpec,
    codec: T,
}

impl GridEncoder<RawTensorCodec> {
    pub fn new(spec: GridSpec) -> Self {
        Self {
            spec,
            codec: RawTensorCodec,
        }
    }
}

impl<T> GridEncoder<T>
where
    T: TensorCodec,
{
    pub fn with_codec(spec: GridSpec, codec: T) -> Self {
        Self { spec, codec }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Builds the label grid.
    ///
    /// Boxes are assigned in input order and the first box mapped to a cell
    /// owns it; later boxes in the same cell are dropped. Boxes mapped
    /// outside the grid or with an unknown class are skipped with a warning.
    pub fn encode(&self, labels: &[RatioLabel]) -> Array3<f32> {
        let GridSpec {
            grid_size,
            num_classes,
            ..
        } = self.spec;
        let mut grid = Array3::zeros([grid_size, grid_size, num_classes + 5]);
        let mut used_cells = HashSet::new();

        for (index, label) in labels.iter().enumerate() {
            let class = label.class();
            if class >= num_classes {
                warn!(
                    "skip box {} with class {} out of {} classes",
                    index, class, num_classes
                );
                continue;
            }

            let (row, col) = match (
                cell_index(label.cy(), grid_size),
                cell_index(label.cx(), grid_size),
            ) {
                (Some(row), Some(col)) => (row, col),
                _ => {
                    warn!(
                        "skip box {} centered at ({}, {}) outside the {}x{} grid",
                        index,
                        label.cx(),
                        label.cy(),
                        grid_size,
                        grid_size
                    );
                    continue;
                }
            };

            if !used_cells.insert((row, col)) {
                debug!("drop box {} in occupied cell ({}, {})", index, row, col);
                continue;
            }

            let size = grid_size as f32;
            let mut cell = grid.slice_mut(s![row, col, ..]);
            cell[class] = 1.0;
            cell[num_classes] = 1.0;
            cell[num_classes + 1] = size * label.cx() - col as f32;
            cell[num_classes + 2] = size * label.cy() - row as f32;
            cell[num_classes + 3] = label.w();
            cell[num_classes + 4] = label.h();
        }

        grid
    }

    /// Pairs the image with its encoded label grid as serialized tensors.
    pub fn encode_example(&self, image: &RgbImage, labels: &[RatioLabel]) -> Result<TrainingExample> {
        let (width, height) = image.dimensions();
        let pixels = Array3::from_shape_vec(
            [height as usize, width as usize, 3],
            image.as_raw().clone(),
        )?;
        let grid = self.encode(labels);

        Ok(TrainingExample {
            image: self.codec.encode_u8(&pixels.into_dyn().view())?,
            label: self.codec.encode_f32(&grid.into_dyn().view())?,
        })
    }
}

/// The cell index of a ratio coordinate, or `None` if it lies outside the
/// grid. A coordinate of exactly 1.0 belongs to the last cell.
fn cell_index(ratio: f32, grid_size: usize) -> Option<usize> {
    if !(0.0..=1.0).contains(&ratio) {
        return None;
    }
    let index = (ratio * grid_size as f32).floor() as usize;
    Some(index.min(grid_size.checked_sub(1)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::ratio_label;

    fn encoder(grid_size: usize, num_classes: usize) -> GridEncoder {
        GridEncoder::new(GridSpec {
            grid_size,
            num_anchors: 1,
            num_classes,
        })
    }

    fn occupied_cells(grid: &Array3<f32>) -> usize {
        grid.outer_iter()
            .map(|row| {
                row.outer_iter()
                    .filter(|cell| cell.iter().any(|&value| value != 0.0))
                    .count()
            })
            .sum()
    }

    #[test]
    fn encode_single_box() -> Result<()> {
        let grid = encoder(5, 3).encode(&[ratio_label(2, 0.3, 0.3, 0.2, 0.2)?]);
        assert_eq!(grid.shape(), &[5, 5, 8]);
        assert_eq!(occupied_cells(&grid), 1);

        let cell = grid.slice(s![1usize, 1usize, ..]);
        assert_abs_diff_eq!(cell[0], 0.0);
        assert_abs_diff_eq!(cell[1], 0.0);
        assert_abs_diff_eq!(cell[2], 1.0);
        assert_abs_diff_eq!(cell[3], 1.0);
        assert_abs_diff_eq!(cell[4], 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(cell[5], 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(cell[6], 0.2);
        assert_abs_diff_eq!(cell[7], 0.2);
        Ok(())
    }

    #[test]
    fn encode_first_box_wins() -> Result<()> {
        let labels = vec![
            ratio_label(0, 0.31, 0.32, 0.2, 0.1)?,
            ratio_label(1, 0.35, 0.25, 0.4, 0.4)?,
        ];
        let grid = encoder(5, 2).encode(&labels);
        assert_eq!(occupied_cells(&grid), 1);

        let cell = grid.slice(s![1usize, 1usize, ..]);
        assert_abs_diff_eq!(cell[0], 1.0);
        assert_abs_diff_eq!(cell[1], 0.0);
        assert_abs_diff_eq!(cell[5], 0.2);
        assert_abs_diff_eq!(cell[6], 0.1);
        Ok(())
    }

    #[test]
    fn encode_distinct_cells() -> Result<()> {
        let labels = vec![
            ratio_label(0, 0.1, 0.1, 0.1, 0.1)?,
            ratio_label(1, 0.9, 0.1, 0.1, 0.1)?,
            ratio_label(1, 0.5, 0.9, 0.1, 0.1)?,
        ];
        let grid = encoder(4, 2).encode(&labels);
        assert_eq!(occupied_cells(&grid), 3);
        assert_abs_diff_eq!(grid[[0, 0, 2]], 1.0);
        assert_abs_diff_eq!(grid[[0, 3, 2]], 1.0);
        assert_abs_diff_eq!(grid[[3, 2, 2]], 1.0);
        Ok(())
    }

    #[test]
    fn encode_skips_invalid_boxes() -> Result<()> {
        let labels = vec![
            ratio_label(5, 0.5, 0.5, 0.1, 0.1)?,
            ratio_label(0, 1.5, 0.5, 0.1, 0.1)?,
            ratio_label(0, 0.5, -0.2, 0.1, 0.1)?,
        ];
        let grid = encoder(3, 2).encode(&labels);
        assert_eq!(occupied_cells(&grid), 0);
        Ok(())
    }

    #[test]
    fn encode_right_edge_goes_to_last_cell() -> Result<()> {
        let grid = encoder(4, 1).encode(&[ratio_label(0, 1.0, 1.0, 0.1, 0.1)?]);
        assert_abs_diff_eq!(grid[[3, 3, 1]], 1.0);
        assert_abs_diff_eq!(grid[[3, 3, 2]], 1.0);
        assert_abs_diff_eq!(grid[[3, 3, 3]], 1.0);
        Ok(())
    }

    #[test]
    fn encode_example_roundtrip() -> Result<()> {
        let encoder = encoder(2, 2);
        let image = RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8, y as u8, 9]));
        let labels = vec![ratio_label(1, 0.75, 0.25, 0.5, 0.5)?];

        let example = encoder.encode_example(&image, &labels)?;
        let pixels = RawTensorCodec.decode_u8(&example.image)?;
        assert_eq!(pixels.shape(), &[3, 4, 3]);
        assert_eq!(pixels[[2, 1, 0]], 1);
        assert_eq!(pixels[[2, 1, 1]], 2);

        let grid = RawTensorCodec.decode_f32(&example.label)?;
        assert_eq!(grid.shape(), &[2, 2, 7]);
        assert_abs_diff_eq!(grid[[0, 1, 1]], 1.0);
        assert_abs_diff_eq!(grid[[0, 1, 2]], 1.0);
        Ok(())
    }
}
