use stowage_types::CompressionTag;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    /// No codec is registered under this tag.
    #[error("unknown compression tag {0}")]
    UnknownTag(CompressionTag),

    /// The algorithm name is not part of the bundled catalog.
    #[error("unsupported compression algorithm: `{0}`")]
    UnsupportedAlgorithm(String),

    /// A codec is already registered under this tag.
    #[error("compression tag {0} is already registered")]
    DuplicateTag(CompressionTag),

    /// Tag 0 means "stored uncompressed" and cannot carry a codec.
    #[error("compression tag 0 is reserved for uncompressed storage")]
    ReservedTag,

    #[error("{codec} compression failed: {reason}")]
    CompressFailed { codec: &'static str, reason: String },

    #[error("{codec} decompression failed: {reason}")]
    DecompressFailed { codec: &'static str, reason: String },

    /// The codec produced a different number of bytes than the frame declared.
    #[error("decompressed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("invalid compression config: {0}")]
    Config(String),
}

pub type CompressionResult<T> = Result<T, CompressionError>;
