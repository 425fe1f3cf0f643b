use std::collections::HashMap;
use std::sync::Arc;

use stowage_types::CompressionTag;
use tracing::{debug, warn};

use crate::codec::CompressionCodec;
use crate::config::CompressionConfig;
use crate::deflate_codec::DeflateCodec;
use crate::error::{CompressionError, CompressionResult};
use crate::lz4_codec::Lz4Codec;
use crate::tags::{self, Algorithm, CatalogEntry};
use crate::zstd_codec::ZstdCodec;

/// Maps compression tags to codecs.
///
/// A registry is built once and then shared immutably (typically behind an
/// `Arc`) by every store that needs it. Tag 0 is never registered: it always
/// means "stored uncompressed" and is handled without a codec.
pub struct CompressionRegistry {
    codecs: HashMap<CompressionTag, Arc<dyn CompressionCodec>>,
    default_tag: CompressionTag,
}

impl CompressionRegistry {
    /// An empty registry whose default is uncompressed storage.
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
            default_tag: CompressionTag::NONE,
        }
    }

    /// The full bundled catalog at default levels, defaulting to zstd.
    pub fn with_defaults() -> Self {
        Self::from_config_or_uncompressed(&CompressionConfig::default())
    }

    /// Like [`from_config`](Self::from_config), but a rejected config yields
    /// an empty registry (every block stored with tag 0) and a warning.
    pub fn from_config_or_uncompressed(config: &CompressionConfig) -> Self {
        Self::from_config(config).unwrap_or_else(|e| {
            warn!(error = %e, "compression config rejected; blocks will be stored uncompressed");
            Self::new()
        })
    }

    /// Build the bundled catalog with the levels and default named in `config`.
    pub fn from_config(config: &CompressionConfig) -> CompressionResult<Self> {
        config.validate()?;
        let mut registry = Self::new();
        for entry in CatalogEntry::all() {
            let codec: Arc<dyn CompressionCodec> = match entry.algorithm {
                Algorithm::None => continue,
                Algorithm::Zstd => Arc::new(ZstdCodec::new(config.zstd.level(entry.level))),
                Algorithm::Lz4 => Arc::new(Lz4Codec),
                Algorithm::Deflate => {
                    Arc::new(DeflateCodec::new(config.deflate.level(entry.level) as u32))
                }
            };
            registry.register(entry.tag(), codec)?;
        }
        registry.set_default_tag(tags::tag_for_name(&config.default_algorithm)?)?;
        debug!(
            codecs = registry.codecs.len(),
            default = %registry.default_tag,
            "compression registry built"
        );
        Ok(registry)
    }

    /// Register a codec under `tag`.
    pub fn register(
        &mut self,
        tag: CompressionTag,
        codec: Arc<dyn CompressionCodec>,
    ) -> CompressionResult<()> {
        if tag.is_none() {
            return Err(CompressionError::ReservedTag);
        }
        if self.codecs.contains_key(&tag) {
            return Err(CompressionError::DuplicateTag(tag));
        }
        self.codecs.insert(tag, codec);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_codec(
        mut self,
        tag: CompressionTag,
        codec: Arc<dyn CompressionCodec>,
    ) -> CompressionResult<Self> {
        self.register(tag, codec)?;
        Ok(self)
    }

    /// Change the tag used for blocks that do not pin one.
    pub fn set_default_tag(&mut self, tag: CompressionTag) -> CompressionResult<()> {
        if !self.is_known_tag(tag) {
            return Err(CompressionError::UnknownTag(tag));
        }
        self.default_tag = tag;
        Ok(())
    }

    pub fn default_tag(&self) -> CompressionTag {
        self.default_tag
    }

    /// Returns `true` for tag 0 and for every registered tag.
    pub fn is_known_tag(&self, tag: CompressionTag) -> bool {
        tag.is_none() || self.codecs.contains_key(&tag)
    }

    /// All registered tags, sorted.
    pub fn tags(&self) -> Vec<CompressionTag> {
        let mut tags: Vec<CompressionTag> = self.codecs.keys().copied().collect();
        tags.sort();
        tags
    }

    /// Compress `raw` with the codec behind `tag`. Tag 0 copies the input.
    pub fn compress(&self, tag: CompressionTag, raw: &[u8]) -> CompressionResult<Vec<u8>> {
        if tag.is_none() {
            return Ok(raw.to_vec());
        }
        let codec = self.codecs.get(&tag).ok_or(CompressionError::UnknownTag(tag))?;
        codec.compress(raw)
    }

    /// Decompress `compressed` into exactly `expected_size` bytes.
    pub fn decompress(
        &self,
        tag: CompressionTag,
        compressed: &[u8],
        expected_size: usize,
    ) -> CompressionResult<Vec<u8>> {
        let raw = if tag.is_none() {
            compressed.to_vec()
        } else {
            let codec = self.codecs.get(&tag).ok_or(CompressionError::UnknownTag(tag))?;
            codec.decompress(compressed, expected_size)?
        };
        if raw.len() != expected_size {
            return Err(CompressionError::SizeMismatch {
                expected: expected_size as u64,
                actual: raw.len() as u64,
            });
        }
        Ok(raw)
    }
}

impl Default for CompressionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompressionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionRegistry")
            .field("tags", &self.tags())
            .field("default_tag", &self.default_tag)
            .finish()
    }
}
