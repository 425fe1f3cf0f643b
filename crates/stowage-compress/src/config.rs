use serde::{Deserialize, Serialize};

use crate::error::{CompressionError, CompressionResult};
use crate::tags::LevelVariant;

/// Concrete levels behind the min / default / max variants of a family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSet {
    pub min: i32,
    pub default: i32,
    pub max: i32,
}

impl LevelSet {
    pub fn level(&self, variant: LevelVariant) -> i32 {
        match variant {
            LevelVariant::Min => self.min,
            LevelVariant::Default => self.default,
            LevelVariant::Max => self.max,
        }
    }
}

/// Configuration for building a [`CompressionRegistry`](crate::CompressionRegistry).
///
/// Loadable from TOML:
///
/// ```toml
/// default_algorithm = "zstd_max"
///
/// [zstd]
/// min = 1
/// default = 3
/// max = 19
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Catalog name of the algorithm used when a block does not pin one.
    pub default_algorithm: String,
    pub zstd: LevelSet,
    pub deflate: LevelSet,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            default_algorithm: "zstd".to_string(),
            zstd: LevelSet {
                min: 1,
                default: 3,
                max: 19,
            },
            deflate: LevelSet {
                min: 1,
                default: 6,
                max: 9,
            },
        }
    }
}

impl CompressionConfig {
    /// Parse a TOML document; missing keys take their default values.
    pub fn from_toml_str(s: &str) -> CompressionResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| CompressionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> CompressionResult<String> {
        toml::to_string(self).map_err(|e| CompressionError::Config(e.to_string()))
    }

    /// Reject level sets outside what the codecs accept.
    pub fn validate(&self) -> CompressionResult<()> {
        check_levels("zstd", &self.zstd, 1..=22)?;
        check_levels("deflate", &self.deflate, 0..=9)?;
        Ok(())
    }
}

fn check_levels(
    family: &str,
    levels: &LevelSet,
    range: std::ops::RangeInclusive<i32>,
) -> CompressionResult<()> {
    for level in [levels.min, levels.default, levels.max] {
        if !range.contains(&level) {
            return Err(CompressionError::Config(format!(
                "{family} level {level} outside {}..={}",
                range.start(),
                range.end()
            )));
        }
    }
    Ok(())
}
