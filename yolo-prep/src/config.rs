//! Data preparation configuration format.

use crate::{common::*, grid::GridSpec, processor::AugmentationInit};

/// The main preparation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridSpec,
    #[serde(default)]
    pub augmentation: AugmentationInit,
    #[serde(default)]
    pub decode: DecodeConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Self = json5::from_str(&text)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.augmentation.clone().build()?;
        self.decode.validate()?;
        Ok(())
    }
}

/// Prediction decoding options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Anchors with objectness below this value are discarded.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: R64,
}

impl DecodeConfig {
    fn validate(&self) -> Result<()> {
        let threshold = self.confidence_threshold.raw();
        ensure!(
            (0.0..=1.0).contains(&threshold),
            "confidence_threshold must be in range [0, 1], but get {}",
            threshold
        );
        Ok(())
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_confidence_threshold() -> R64 {
    r64(0.5)
}
