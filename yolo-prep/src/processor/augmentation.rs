//! Random augmentation pipeline over an image and its boxes.

use super::{h_flip, CropOnBoxes, CropOnBoxesInit, RandomSaturation, RandomSaturationInit};
use crate::{common::*, label::RatioLabel};

/// Augmentation pipeline initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AugmentationInit {
    /// Flip left to right with probability 0.5.
    #[serde(default)]
    pub h_flip: bool,
    pub crop: Option<CropOnBoxesInit>,
    pub saturation: Option<RandomSaturationInit>,
}

impl AugmentationInit {
    pub fn build(self) -> Result<Augmentation> {
        let Self {
            h_flip,
            crop,
            saturation,
        } = self;

        Ok(Augmentation {
            h_flip,
            crop: crop.map(|init| init.build()).transpose()?,
            saturation: saturation.map(|init| init.build()).transpose()?,
        })
    }
}

impl Default for AugmentationInit {
    fn default() -> Self {
        Self {
            h_flip: false,
            crop: None,
            saturation: None,
        }
    }
}

/// Applies flip, crop and saturation in that order.
#[derive(Debug, Clone)]
pub struct Augmentation {
    h_flip: bool,
    crop: Option<CropOnBoxes>,
    saturation: Option<RandomSaturation>,
}

impl Augmentation {
    pub fn forward<R>(
        &self,
        image: &RgbImage,
        labels: &[RatioLabel],
        rng: &mut R,
    ) -> Result<(RgbImage, Vec<RatioLabel>)>
    where
        R: Rng,
    {
        let (image, labels) = if self.h_flip && rng.gen::<bool>() {
            h_flip(image, labels)
        } else {
            (image.clone(), labels.to_vec())
        };

        let (image, labels) = match &self.crop {
            Some(crop) if !labels.is_empty() => crop.forward(&image, &labels)?,
            Some(_) => {
                debug!("skip crop on an image without boxes");
                (image, labels)
            }
            None => (image, labels),
        };

        let image = match &self.saturation {
            Some(saturation) => saturation.forward(&image, rng, true),
            None => image,
        };

        Ok((image, labels))
    }
}
