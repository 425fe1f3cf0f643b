use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of the compression algorithm (and level) applied to a block.
///
/// Tag `0` is reserved for "stored uncompressed". The meaning of every other
/// value is defined by whichever compression registry resolves it; a tag the
/// registry does not know is an error at read time, never a guess.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompressionTag(u32);

impl CompressionTag {
    /// Stored uncompressed.
    pub const NONE: Self = Self(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Returns `true` for the reserved "stored uncompressed" tag.
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for CompressionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompressionTag({:#010x})", self.0)
    }
}

impl fmt::Display for CompressionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for CompressionTag {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
