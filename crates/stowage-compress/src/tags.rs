//! The bundled tag catalog.
//!
//! A tag packs an algorithm family code into its upper 24 bits and a level
//! variant into its low byte, so `zstd`, `zstd_min` and `zstd_max` share a
//! family and differ only in level. Family codes are ASCII mnemonics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stowage_types::CompressionTag;

use crate::error::CompressionError;

const ZSTD_FAMILY: u32 = 0x7a73_7400; // "zst"
const LZ4_FAMILY: u32 = 0x6c7a_3400; // "lz4"
const DEFLATE_FAMILY: u32 = 0x6466_6c00; // "dfl"

pub const ZSTD_MIN: CompressionTag = CompressionTag::new(ZSTD_FAMILY | 1);
pub const ZSTD_DEFAULT: CompressionTag = CompressionTag::new(ZSTD_FAMILY | 2);
pub const ZSTD_MAX: CompressionTag = CompressionTag::new(ZSTD_FAMILY | 3);
pub const LZ4_DEFAULT: CompressionTag = CompressionTag::new(LZ4_FAMILY | 2);
pub const DEFLATE_MIN: CompressionTag = CompressionTag::new(DEFLATE_FAMILY | 1);
pub const DEFLATE_DEFAULT: CompressionTag = CompressionTag::new(DEFLATE_FAMILY | 2);
pub const DEFLATE_MAX: CompressionTag = CompressionTag::new(DEFLATE_FAMILY | 3);

/// Algorithm families shipped with this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    None,
    Zstd,
    Lz4,
    Deflate,
}

/// Level variant within a family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelVariant {
    Min,
    Default,
    Max,
}

impl LevelVariant {
    fn code(self) -> u32 {
        match self {
            Self::Min => 1,
            Self::Default => 2,
            Self::Max => 3,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Min => "_min",
            Self::Default => "",
            Self::Max => "_max",
        }
    }
}

/// A named entry of the catalog: algorithm + level variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CatalogEntry {
    pub algorithm: Algorithm,
    pub level: LevelVariant,
}

impl CatalogEntry {
    pub const fn new(algorithm: Algorithm, level: LevelVariant) -> Self {
        Self { algorithm, level }
    }

    /// The tag this entry is stored under. LZ4 has a single level, so every
    /// LZ4 variant maps to [`LZ4_DEFAULT`].
    pub fn tag(&self) -> CompressionTag {
        let family = match self.algorithm {
            Algorithm::None => return CompressionTag::NONE,
            Algorithm::Zstd => ZSTD_FAMILY,
            Algorithm::Lz4 => return LZ4_DEFAULT,
            Algorithm::Deflate => DEFLATE_FAMILY,
        };
        CompressionTag::new(family | self.level.code())
    }

    /// Reverse lookup of a catalog tag.
    pub fn from_tag(tag: CompressionTag) -> Option<Self> {
        if tag.is_none() {
            return Some(Self::new(Algorithm::None, LevelVariant::Default));
        }
        let algorithm = match tag.raw() & 0xffff_ff00 {
            ZSTD_FAMILY => Algorithm::Zstd,
            LZ4_FAMILY => Algorithm::Lz4,
            DEFLATE_FAMILY => Algorithm::Deflate,
            _ => return None,
        };
        let level = match tag.raw() & 0xff {
            1 => LevelVariant::Min,
            2 => LevelVariant::Default,
            3 => LevelVariant::Max,
            _ => return None,
        };
        if algorithm == Algorithm::Lz4 && level != LevelVariant::Default {
            return None;
        }
        Some(Self::new(algorithm, level))
    }

    /// Every tagged (non-`none`) entry of the catalog.
    pub fn all() -> [CatalogEntry; 7] {
        use Algorithm::*;
        use LevelVariant::*;
        [
            Self::new(Zstd, Min),
            Self::new(Zstd, Default),
            Self::new(Zstd, Max),
            Self::new(Lz4, Default),
            Self::new(Deflate, Min),
            Self::new(Deflate, Default),
            Self::new(Deflate, Max),
        ]
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.algorithm {
            Algorithm::None => return write!(f, "none"),
            Algorithm::Zstd => "zstd",
            Algorithm::Lz4 => return write!(f, "lz4"),
            Algorithm::Deflate => "deflate",
        };
        write!(f, "{base}{}", self.level.suffix())
    }
}

impl FromStr for CatalogEntry {
    type Err = CompressionError;

    /// Parse names such as `none`, `zstd`, `zstd_min`, `lz4`, `deflate_max`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let (base, level) = if let Some(base) = name.strip_suffix("_min") {
            (base, LevelVariant::Min)
        } else if let Some(base) = name.strip_suffix("_max") {
            (base, LevelVariant::Max)
        } else {
            (name.as_str(), LevelVariant::Default)
        };
        let algorithm = match base {
            "none" if level == LevelVariant::Default => Algorithm::None,
            "zstd" => Algorithm::Zstd,
            "lz4" if level == LevelVariant::Default => Algorithm::Lz4,
            "deflate" => Algorithm::Deflate,
            _ => return Err(CompressionError::UnsupportedAlgorithm(s.to_string())),
        };
        Ok(Self::new(algorithm, level))
    }
}

/// Resolve an algorithm name to its catalog tag.
pub fn tag_for_name(name: &str) -> Result<CompressionTag, CompressionError> {
    name.parse::<CatalogEntry>().map(|entry| entry.tag())
}
