//! Loading samples in the YOLO text label format.

use crate::{
    common::*,
    label::{ratio_label, RatioLabel},
};

/// Parses `class x y w h` lines. Blank lines and lines starting with `#`
/// are ignored.
pub fn parse_labels(reader: impl BufRead) -> Result<Vec<RatioLabel>> {
    let mut labels = vec![];

    for (index, line) in reader.lines().enumerate() {
        let line_num = index + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let label = parse_label_line(line).with_context(|| format!("invalid label at line {}", line_num))?;
        labels.push(label);
    }

    Ok(labels)
}

/// Loads labels from a YOLO text label file.
pub fn load_label_file(path: impl AsRef<Path>) -> Result<Vec<RatioLabel>> {
    let path = path.as_ref();
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open label file '{}'", path.display()))?;
    parse_labels(BufReader::new(file))
        .with_context(|| format!("failed to parse label file '{}'", path.display()))
}

/// Loads an RGB image with the boxes from its label file.
pub fn load_sample(
    image_file: impl AsRef<Path>,
    label_file: impl AsRef<Path>,
) -> Result<(RgbImage, Vec<RatioLabel>)> {
    let image_file = image_file.as_ref();
    let image = image::open(image_file)
        .with_context(|| format!("failed to load image '{}'", image_file.display()))?
        .to_rgb8();
    let labels = load_label_file(label_file)?;
    Ok((image, labels))
}

fn parse_label_line(line: &str) -> Result<RatioLabel> {
    let tokens: Vec<_> = line.split_whitespace().collect();
    ensure!(
        tokens.len() == 5,
        "expect 5 fields 'class x y w h', but get {}",
        tokens.len()
    );

    let class: usize = tokens[0]
        .parse()
        .with_context(|| format!("invalid class index '{}'", tokens[0]))?;
    let [x, y, w, h] = [1, 2, 3, 4].map(|index| tokens[index].parse::<f32>());
    let parse = |value: Result<f32, _>, name: &str| -> Result<f32> {
        let value: f32 = value.with_context(|| format!("invalid {} value", name))?;
        ensure!(value.is_finite(), "{} must be finite", name);
        Ok(value)
    };
    let (x, y, w, h) = (parse(x, "x")?, parse(y, "y")?, parse(w, "w")?, parse(h, "h")?);

    ratio_label(class, x, y, w, h)
}
