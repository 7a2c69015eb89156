use crate::common::*;

/// A class-tagged box in normalized center form, each coordinate a ratio of
/// the image size.
pub type RatioLabel = Label<CyCxHW<f32>, usize>;

/// Builds a ratio label from `class, x, y, w, h` values.
pub fn ratio_label(class: usize, x: f32, y: f32, w: f32, h: f32) -> Result<RatioLabel> {
    let rect = CyCxHW::try_from_cycxhw([y, x, h, w])?;
    Ok(Label::new(class, rect))
}
