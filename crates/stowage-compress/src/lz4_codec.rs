use crate::codec::CompressionCodec;
use crate::error::{CompressionError, CompressionResult};

/// LZ4 block codec.
///
/// Fastest decode of the bundled codecs; the raw LZ4 block format is used
/// without a size prefix because the frame header already records the
/// original length.
pub struct Lz4Codec;

impl CompressionCodec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn max_compressed_size(&self, raw_len: usize) -> usize {
        lz4_flex::block::get_maximum_output_size(raw_len)
    }

    fn compress(&self, raw: &[u8]) -> CompressionResult<Vec<u8>> {
        Ok(lz4_flex::block::compress(raw))
    }

    fn decompress(&self, compressed: &[u8], expected_size: usize) -> CompressionResult<Vec<u8>> {
        lz4_flex::block::decompress(compressed, expected_size).map_err(|e| {
            CompressionError::DecompressFailed {
                codec: "lz4",
                reason: e.to_string(),
            }
        })
    }
}
