use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::codec::CompressionCodec;
use crate::error::{CompressionError, CompressionResult};

/// Raw DEFLATE block codec (no zlib/gzip wrapper).
pub struct DeflateCodec {
    /// Compression level, 0..=9.
    pub level: u32,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl DeflateCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl CompressionCodec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, raw: &[u8]) -> CompressionResult<Vec<u8>> {
        let fail = |e: std::io::Error| CompressionError::CompressFailed {
            codec: "deflate",
            reason: e.to_string(),
        };
        let mut encoder = DeflateEncoder::new(
            Vec::with_capacity(self.max_compressed_size(raw.len())),
            Compression::new(self.level),
        );
        encoder.write_all(raw).map_err(fail)?;
        encoder.finish().map_err(fail)
    }

    fn decompress(&self, compressed: &[u8], expected_size: usize) -> CompressionResult<Vec<u8>> {
        let mut out = Vec::with_capacity(expected_size);
        // Read one byte past the expected size so an oversized stream is
        // detectable without inflating it completely.
        DeflateDecoder::new(compressed)
            .take(expected_size as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|e| CompressionError::DecompressFailed {
                codec: "deflate",
                reason: e.to_string(),
            })?;
        if out.len() > expected_size {
            return Err(CompressionError::DecompressFailed {
                codec: "deflate",
                reason: format!("stream inflates past {expected_size} bytes"),
            });
        }
        Ok(out)
    }
}
