//! The horizontal flip transform.

use crate::{common::*, label::RatioLabel};
use image::imageops;

/// Mirrors the image and boxes left to right.
///
/// Box centers move to `1 - x`; the class, `y`, `w` and `h` are kept.
pub fn h_flip(image: &RgbImage, labels: &[RatioLabel]) -> (RgbImage, Vec<RatioLabel>) {
    let flipped_image = imageops::flip_horizontal(image);
    let flipped_labels = labels.iter().map(|label| label.h_flip()).collect();
    (flipped_image, flipped_labels)
}
