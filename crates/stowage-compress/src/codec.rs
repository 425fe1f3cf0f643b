use crate::error::CompressionResult;

/// A block compression algorithm at a fixed level.
///
/// Each codec compresses one payload independently; there is no state shared
/// between calls, so a single instance serves any number of concurrent
/// blocks. The exact original length is always known at decode time (it is
/// carried in the block frame), which lets codecs decode into a buffer of
/// the right size up front and reject anything that does not fit it.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Upper bound on the compressed size of a `raw_len`-byte payload.
    fn max_compressed_size(&self, raw_len: usize) -> usize {
        raw_len + raw_len / 255 + 64
    }

    /// Compress one payload.
    fn compress(&self, raw: &[u8]) -> CompressionResult<Vec<u8>>;

    /// Reconstruct the original payload of exactly `expected_size` bytes.
    ///
    /// Implementations must fail rather than return more than
    /// `expected_size` bytes. Returning fewer is caught by the registry.
    fn decompress(&self, compressed: &[u8], expected_size: usize) -> CompressionResult<Vec<u8>>;
}
