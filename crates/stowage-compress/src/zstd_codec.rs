use crate::codec::CompressionCodec;
use crate::error::{CompressionError, CompressionResult};

/// Zstandard block codec.
///
/// Every block is compressed independently at the configured level, so any
/// block can be decoded without touching its neighbours.
pub struct ZstdCodec {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn max_compressed_size(&self, raw_len: usize) -> usize {
        zstd::zstd_safe::compress_bound(raw_len)
    }

    fn compress(&self, raw: &[u8]) -> CompressionResult<Vec<u8>> {
        zstd::bulk::compress(raw, self.level).map_err(|e| CompressionError::CompressFailed {
            codec: "zstd",
            reason: e.to_string(),
        })
    }

    fn decompress(&self, compressed: &[u8], expected_size: usize) -> CompressionResult<Vec<u8>> {
        // The capacity doubles as the output limit: a frame that inflates
        // past `expected_size` is rejected by zstd itself.
        zstd::bulk::decompress(compressed, expected_size).map_err(|e| {
            CompressionError::DecompressFailed {
                codec: "zstd",
                reason: e.to_string(),
            }
        })
    }
}
