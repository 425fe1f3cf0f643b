//! Self-describing payload framing for compressed blocks.
//!
//! A framed payload is a 12-byte little-endian header followed by the codec
//! output:
//!
//! ```text
//! +----------+--------------------+------------------------+
//! | tag: u32 | uncompressed: u64  | compressed bytes ...   |
//! +----------+--------------------+------------------------+
//! ```
//!
//! Tag 0 stores the original payload verbatim after the header.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use stowage_compress::{CompressionError, CompressionRegistry, CompressionResult};
use stowage_types::CompressionTag;
use tracing::{debug, warn};

/// Header length in bytes.
pub const FRAME_HEADER_LEN: usize = 12;

/// Largest logical block accepted unless configured otherwise (1 GiB).
pub const DEFAULT_MAX_BLOCK_SIZE: u64 = 1 << 30;

/// Room above the block size limit for the headers of stacked compressing
/// layers: each layer wraps the payload it receives in one more frame.
/// Covers up to eight layers.
pub const NESTED_FRAME_SLACK: u64 = 8 * FRAME_HEADER_LEN as u64;

/// A possibly-compressed block payload plus the information needed to
/// restore it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressedFrame {
    pub tag: CompressionTag,
    pub uncompressed_size: u64,
    pub data: Bytes,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame truncated: {len} bytes is shorter than the 12-byte header")]
    Truncated { len: usize },
}

impl CompressedFrame {
    /// A frame that stores `raw` uncompressed.
    pub fn stored(raw: Bytes) -> Self {
        Self {
            tag: CompressionTag::NONE,
            uncompressed_size: raw.len() as u64,
            data: raw,
        }
    }

    /// Serialized length: header + body.
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_LEN + self.data.len()
    }

    /// Serialize header and body into a single buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u32_le(self.tag.raw());
        buf.put_u64_le(self.uncompressed_size);
        buf.extend_from_slice(&self.data);
        buf.freeze()
    }

    /// Parse a framed payload. The body is a zero-copy slice of `payload`.
    pub fn parse(payload: &Bytes) -> Result<Self, FrameError> {
        if payload.len() < FRAME_HEADER_LEN {
            return Err(FrameError::Truncated { len: payload.len() });
        }
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&payload[..4]);
        let mut size = [0u8; 8];
        size.copy_from_slice(&payload[4..FRAME_HEADER_LEN]);
        Ok(Self {
            tag: CompressionTag::new(u32::from_le_bytes(tag)),
            uncompressed_size: u64::from_le_bytes(size),
            data: payload.slice(FRAME_HEADER_LEN..),
        })
    }
}

/// Converts raw payloads to [`CompressedFrame`]s and back, resolving tags
/// through a shared [`CompressionRegistry`].
#[derive(Clone, Debug)]
pub struct BlockCodec {
    registry: Arc<CompressionRegistry>,
    max_block_size: u64,
}

impl BlockCodec {
    pub fn new(registry: Arc<CompressionRegistry>) -> Self {
        Self {
            registry,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
        }
    }

    /// Cap the payload size a frame may declare. Decoding allocates the
    /// declared size up front, so this bounds what a corrupt header can ask
    /// for.
    pub fn with_max_block_size(mut self, max_block_size: u64) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    pub fn registry(&self) -> &Arc<CompressionRegistry> {
        &self.registry
    }

    pub fn max_block_size(&self) -> u64 {
        self.max_block_size
    }

    /// Largest payload a frame may carry or declare: the block size limit
    /// plus [`NESTED_FRAME_SLACK`].
    pub fn payload_limit(&self) -> u64 {
        self.max_block_size.saturating_add(NESTED_FRAME_SLACK)
    }

    /// Compress `raw` with `requested` (or the registry default).
    ///
    /// Never fails: if the tag is unknown, the codec errors, or the output is
    /// not strictly smaller than the input, the payload is stored
    /// uncompressed under tag 0.
    pub fn encode(&self, raw: &Bytes, requested: Option<CompressionTag>) -> CompressedFrame {
        let tag = requested.unwrap_or_else(|| self.registry.default_tag());
        if tag.is_none() || raw.is_empty() {
            return CompressedFrame::stored(raw.clone());
        }
        match self.registry.compress(tag, raw) {
            Ok(compressed) if compressed.len() < raw.len() => CompressedFrame {
                tag,
                uncompressed_size: raw.len() as u64,
                data: Bytes::from(compressed),
            },
            Ok(compressed) => {
                debug!(
                    %tag,
                    raw = raw.len(),
                    compressed = compressed.len(),
                    "compression did not shrink payload; storing uncompressed"
                );
                CompressedFrame::stored(raw.clone())
            }
            Err(e) => {
                warn!(%tag, error = %e, "compression failed; storing uncompressed");
                CompressedFrame::stored(raw.clone())
            }
        }
    }

    /// Restore the original payload of `frame`.
    ///
    /// Tag 0 returns a zero-copy alias of the frame body. Any other tag must
    /// be registered (`CompressionError::UnknownTag` otherwise) and must
    /// decode to exactly `uncompressed_size` bytes.
    pub fn decode(&self, frame: &CompressedFrame) -> CompressionResult<Bytes> {
        if frame.uncompressed_size > self.payload_limit() {
            return Err(CompressionError::DecompressFailed {
                codec: "frame",
                reason: format!(
                    "declared size {} exceeds limit {}",
                    frame.uncompressed_size,
                    self.payload_limit()
                ),
            });
        }
        if frame.tag.is_none() {
            if frame.data.len() as u64 != frame.uncompressed_size {
                return Err(CompressionError::SizeMismatch {
                    expected: frame.uncompressed_size,
                    actual: frame.data.len() as u64,
                });
            }
            return Ok(frame.data.clone());
        }
        if !self.registry.is_known_tag(frame.tag) {
            return Err(CompressionError::UnknownTag(frame.tag));
        }
        let expected = usize::try_from(frame.uncompressed_size).map_err(|_| {
            CompressionError::DecompressFailed {
                codec: "frame",
                reason: format!("declared size {} does not fit in memory", frame.uncompressed_size),
            }
        })?;
        let raw = self.registry.decompress(frame.tag, &frame.data, expected)?;
        Ok(Bytes::from(raw))
    }
}
