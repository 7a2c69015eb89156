//! The crop-on-boxes transform.

use crate::{common::*, label::RatioLabel};
use bbox::Transform;
use image::imageops;

/// Crop-on-boxes initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropOnBoxesInit {
    /// The minimum crop extent as a ratio of the image size on each axis.
    pub min_ratio: R64,
    /// Extra pixels kept around the enclosing box.
    #[serde(default)]
    pub padding: i64,
}

impl CropOnBoxesInit {
    pub fn build(self) -> Result<CropOnBoxes> {
        let Self { min_ratio, padding } = self;
        ensure!(
            min_ratio > 0.0 && min_ratio <= 1.0,
            "min_ratio must be in range (0, 1], but get {}",
            min_ratio
        );
        ensure!(padding >= 0, "padding must be non-negative");

        Ok(CropOnBoxes {
            min_ratio: min_ratio.raw(),
            padding,
        })
    }
}

/// Crops the image to the region around all boxes and resizes it back to
/// the input size.
#[derive(Debug, Clone)]
pub struct CropOnBoxes {
    min_ratio: f64,
    padding: i64,
}

impl CropOnBoxes {
    pub fn min_ratio(&self) -> f64 {
        self.min_ratio
    }

    pub fn padding(&self) -> i64 {
        self.padding
    }

    /// Computes the crop window in pixels for an image of the given size.
    ///
    /// The minimum ratio is applied before clipping, so a window touching
    /// the image border can end up smaller than the ratio asks for.
    pub fn crop_window(&self, size: &HW<i64>, labels: &[RatioLabel]) -> Result<TLBR<i64>> {
        let (height, width) = (size.h(), size.w());

        let mut corners = labels.iter().map(|label| pixel_corners(label, size));
        let first = corners
            .next()
            .ok_or_else(|| format_err!("at least one box is required to crop on"))?;
        let enclosing = corners.fold(first, |lhs, rhs| lhs.union_with(&rhs));
        let window = enclosing.pad(self.padding);

        let min_h = (height as f64 * self.min_ratio).round() as i64;
        let min_w = (width as f64 * self.min_ratio).round() as i64;
        let window = window.grow_to(min_h, min_w);

        let window = window.clip_to(&size.to_tlbr()).ok_or_else(|| {
            format_err!(
                "crop window {:?} does not overlap the {}x{} image",
                window.tlbr(),
                width,
                height
            )
        })?;

        Ok(window)
    }

    pub fn forward(
        &self,
        image: &RgbImage,
        labels: &[RatioLabel],
    ) -> Result<(RgbImage, Vec<RatioLabel>)> {
        let (width, height) = image.dimensions();
        let size = HW::try_from_hw([height as i64, width as i64])?;
        let window = self.crop_window(&size, labels)?;
        debug!(
            "crop {}x{} image to window {:?}",
            width,
            height,
            window.tlbr()
        );

        // map pixel coordinates within the window to ratios of the window
        let transform = {
            let src: TLBR<f64> = window.cast();
            let tgt = TLBR::from_tlbr([0.0, 0.0, 1.0, 1.0]);
            Transform::from_rects(&src, &tgt)
        };

        let cropped_labels: Vec<_> = labels
            .iter()
            .map(|label| -> Result<RatioLabel> {
                let pixel_label = pixel_center_label(label, &size)?;
                let ratio_label = &transform * &pixel_label;
                Ok(ratio_label.map_rect(|rect| rect.cast()))
            })
            .try_collect()?;

        let cropped_image = imageops::crop_imm(
            image,
            window.l() as u32,
            window.t() as u32,
            window.w() as u32,
            window.h() as u32,
        )
        .to_image();
        let resized_image = imageops::resize(&cropped_image, width, height, FilterType::Triangle);

        Ok((resized_image, cropped_labels))
    }
}

/// Crops around the boxes with the given minimum ratio and padding.
pub fn crop_on_boxes(
    image: &RgbImage,
    labels: &[RatioLabel],
    min_ratio: f64,
    padding: i64,
) -> Result<(RgbImage, Vec<RatioLabel>)> {
    let min_ratio = R64::try_new(min_ratio)
        .ok_or_else(|| format_err!("min_ratio must be a finite number"))?;
    CropOnBoxesInit { min_ratio, padding }
        .build()?
        .forward(image, labels)
}

/// The box corners in pixels. The left-top corner and the size are rounded
/// separately, and the right-bottom corner is derived from them.
fn pixel_corners(label: &RatioLabel, size: &HW<i64>) -> TLBR<i64> {
    let (height, width) = (size.h() as f64, size.w() as f64);
    let (cx, cy) = (label.cx() as f64, label.cy() as f64);
    let (w, h) = (label.w() as f64, label.h() as f64);

    let l = ((cx - w / 2.0) * width).round() as i64;
    let t = ((cy - h / 2.0) * height).round() as i64;
    let box_w = (w * width).round() as i64;
    let box_h = (h * height).round() as i64;

    TLBR::from_tlbr([t, l, t + box_h, l + box_w])
}

/// The box in pixels with the center rounded to the nearest pixel. Uses the
/// same precision as [pixel_corners].
fn pixel_center_label(label: &RatioLabel, size: &HW<i64>) -> Result<Label<CyCxHW<f64>, usize>> {
    let (height, width) = (size.h() as f64, size.w() as f64);
    let cy = (label.cy() as f64 * height).round();
    let cx = (label.cx() as f64 * width).round();
    let h = label.h() as f64 * height;
    let w = label.w() as f64 * width;
    let rect = CyCxHW::try_from_cycxhw([cy, cx, h, w])?;
    Ok(Label::new(label.class(), rect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::ratio_label;

    fn crop(min_ratio: f64, padding: i64) -> CropOnBoxes {
        CropOnBoxesInit {
            min_ratio: r64(min_ratio),
            padding,
        }
        .build()
        .unwrap()
    }

    #[test]
    fn crop_keeps_image_size() -> Result<()> {
        let image = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8, y as u8, 0]));
        let labels = vec![ratio_label(0, 0.3, 0.4, 0.2, 0.2)?];
        let (output, _) = crop(0.3, 2).forward(&image, &labels)?;
        assert_eq!(output.dimensions(), (64, 48));
        Ok(())
    }

    #[test]
    fn crop_centered_box() -> Result<()> {
        let image = RgbImage::new(100, 100);
        let labels = vec![ratio_label(4, 0.5, 0.5, 0.5, 0.5)?];

        let processor = crop(0.1, 0);
        let window = processor.crop_window(&HW::from_hw([100, 100]), &labels)?;
        assert_eq!(window.tlbr(), [25, 25, 75, 75]);

        let (_, output) = processor.forward(&image, &labels)?;
        let label = &output[0];
        assert_eq!(label.class(), 4);
        assert_abs_diff_eq!(label.cx(), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(label.cy(), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(label.w(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(label.h(), 1.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn crop_center_rounding_matches_window() -> Result<()> {
        // 0.055f32 * 100 is 5.5 in f32 but just below 5.5 in f64
        let labels = vec![ratio_label(0, 0.055, 0.5, 0.1, 0.1)?];
        let processor = crop(0.1, 0);
        let window = processor.crop_window(&HW::from_hw([100, 100]), &labels)?;
        assert_eq!(window.tlbr(), [45, 0, 55, 10]);

        let (_, output) = processor.forward(&RgbImage::new(100, 100), &labels)?;
        assert_abs_diff_eq!(output[0].cx(), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(output[0].cy(), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(output[0].w(), 1.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn crop_grows_to_min_ratio() -> Result<()> {
        let labels = vec![ratio_label(0, 0.5, 0.5, 0.1, 0.1)?];
        let processor = crop(0.5, 0);
        let window = processor.crop_window(&HW::from_hw([100, 100]), &labels)?;
        assert_eq!(window.tlbr(), [25, 25, 75, 75]);

        let (_, output) = processor.forward(&RgbImage::new(100, 100), &labels)?;
        assert_abs_diff_eq!(output[0].cx(), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(output[0].w(), 0.2, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn crop_min_ratio_is_best_effort_at_borders() -> Result<()> {
        let labels = vec![ratio_label(0, 0.05, 0.5, 0.1, 0.1)?];
        let window = crop(0.5, 0).crop_window(&HW::from_hw([100, 100]), &labels)?;

        // grown to [-20, 30) horizontally and clipped at the left border
        assert_eq!(window.l(), 0);
        assert_eq!(window.r(), 30);
        assert_eq!(window.h(), 50);
        Ok(())
    }

    #[test]
    fn crop_padding_and_order_independence() -> Result<()> {
        let labels = vec![
            ratio_label(0, 0.3, 0.3, 0.1, 0.1)?,
            ratio_label(1, 0.6, 0.7, 0.2, 0.2)?,
        ];
        let reversed: Vec<_> = labels.iter().rev().cloned().collect();
        let size = HW::from_hw([100, 100]);
        let processor = crop(0.1, 5);

        let window = processor.crop_window(&size, &labels)?;
        assert_eq!(window.tlbr(), [20, 20, 85, 75]);
        assert_eq!(window, processor.crop_window(&size, &reversed)?);
        Ok(())
    }

    #[test]
    fn crop_boxes_stay_within_window() -> Result<()> {
        let image = RgbImage::new(120, 80);
        let labels = vec![
            ratio_label(0, 0.2, 0.3, 0.1, 0.2)?,
            ratio_label(1, 0.7, 0.6, 0.2, 0.3)?,
        ];
        let (_, output) = crop(0.2, 3).forward(&image, &labels)?;

        output.iter().for_each(|label| {
            let [t, l, b, r] = label.rect.tlbr();
            assert!(t >= -1e-6 && l >= -1e-6);
            assert!(b <= 1.0 + 1e-6 && r <= 1.0 + 1e-6);
        });
        Ok(())
    }

    #[test]
    fn crop_rejects_invalid_input() -> Result<()> {
        let image = RgbImage::new(10, 10);
        assert!(crop(0.5, 0).forward(&image, &[]).is_err());

        assert!(CropOnBoxesInit {
            min_ratio: r64(0.0),
            padding: 0
        }
        .build()
        .is_err());
        assert!(CropOnBoxesInit {
            min_ratio: r64(1.5),
            padding: 0
        }
        .build()
        .is_err());
        assert!(crop_on_boxes(&image, &[ratio_label(0, 0.5, 0.5, 0.2, 0.2)?], 0.5, -1).is_err());
        Ok(())
    }
}
