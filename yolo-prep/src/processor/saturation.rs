//! The random saturation adjustment.

use crate::common::*;

/// Random saturation initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RandomSaturationInit {
    pub lower: R64,
    pub upper: R64,
}

impl RandomSaturationInit {
    pub fn build(self) -> Result<RandomSaturation> {
        let Self { lower, upper } = self;
        ensure!(
            lower >= 0.0,
            "argument `lower` cannot have a negative value, but get {}",
            lower
        );
        ensure!(
            upper >= lower,
            "argument `upper` must be greater or equal to argument `lower`, but get lower={}, upper={}",
            lower,
            upper
        );

        Ok(RandomSaturation {
            lower: lower.raw() as f32,
            upper: upper.raw() as f32,
        })
    }
}

/// Scales the saturation by a random factor in `[lower, upper]`.
#[derive(Debug, Clone)]
pub struct RandomSaturation {
    lower: f32,
    upper: f32,
}

impl RandomSaturation {
    /// Applies a random saturation factor drawn from `rng` when `training`
    /// is set. Otherwise the image is returned unchanged.
    pub fn forward<R>(&self, image: &RgbImage, rng: &mut R, training: bool) -> RgbImage
    where
        R: Rng,
    {
        if !training {
            return image.clone();
        }

        let factor = rng.gen_range(self.lower..=self.upper);
        adjust_saturation(image, factor)
    }
}

/// Multiplies the HSV saturation of every pixel by `factor`, clamped to 1.
pub fn adjust_saturation(image: &RgbImage, factor: f32) -> RgbImage {
    let mut output = image.clone();
    output.pixels_mut().for_each(|pixel| {
        let Rgb([r, g, b]) = *pixel;
        let [hue, saturation, value] = rgb_to_hsv([r, g, b].map(|c| c as f32 / 255.0));
        let saturation = (saturation * factor).clamp(0.0, 1.0);
        let [r, g, b] = hsv_to_rgb([hue, saturation, value]).map(|c| (c * 255.0).round() as u8);
        *pixel = Rgb([r, g, b]);
    });
    output
}

/// Hue in `[0, 1)`, saturation and value in `[0, 1]`.
fn rgb_to_hsv([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let saturation = if max > 0.0 { delta / max } else { 0.0 };

    [hue, saturation, max]
}

fn hsv_to_rgb([hue, saturation, value]: [f32; 3]) -> [f32; 3] {
    let sector = (hue * 6.0).rem_euclid(6.0);
    let chroma = value * saturation;
    let x = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());
    let m = value - chroma;

    let [r, g, b] = match sector as u32 {
        0 => [chroma, x, 0.0],
        1 => [x, chroma, 0.0],
        2 => [0.0, chroma, x],
        3 => [0.0, x, chroma],
        4 => [x, 0.0, chroma],
        _ => [chroma, 0.0, x],
    };
    [r + m, g + m, b + m]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn colorful_image() -> RgbImage {
        RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 128]))
    }

    #[test]
    fn saturation_init_validation() {
        assert!(RandomSaturationInit {
            lower: r64(-0.1),
            upper: r64(1.0),
        }
        .build()
        .is_err());
        assert!(RandomSaturationInit {
            lower: r64(1.2),
            upper: r64(1.0),
        }
        .build()
        .is_err());
        assert!(RandomSaturationInit {
            lower: r64(0.5),
            upper: r64(1.5),
        }
        .build()
        .is_ok());
    }

    #[test]
    fn saturation_identity_outside_training() -> Result<()> {
        let processor = RandomSaturationInit {
            lower: r64(0.0),
            upper: r64(0.0),
        }
        .build()?;
        let image = colorful_image();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(processor.forward(&image, &mut rng, false), image);
        Ok(())
    }

    #[test]
    fn saturation_zero_gives_gray() {
        let output = adjust_saturation(&colorful_image(), 0.0);
        output.pixels().for_each(|&Rgb([r, g, b])| {
            assert_eq!(r, g);
            assert_eq!(g, b);
        });
    }

    #[test]
    fn saturation_unit_factor_roundtrips() {
        let image = colorful_image();
        let output = adjust_saturation(&image, 1.0);
        izip!(image.pixels(), output.pixels()).for_each(|(lhs, rhs)| {
            izip!(lhs.0, rhs.0).for_each(|(l, r)| assert!((l as i32 - r as i32).abs() <= 1));
        });
    }

    #[test]
    fn saturation_is_reproducible_with_seed() -> Result<()> {
        let processor = RandomSaturationInit {
            lower: r64(0.2),
            upper: r64(1.8),
        }
        .build()?;
        let image = colorful_image();

        let lhs = processor.forward(&image, &mut StdRng::seed_from_u64(42), true);
        let rhs = processor.forward(&image, &mut StdRng::seed_from_u64(42), true);
        assert_eq!(lhs, rhs);
        Ok(())
    }
}
