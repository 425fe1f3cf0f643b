use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("chunk metadata mismatch: {hashes} chunk hashes but {sizes} chunk sizes")]
    ChunkCountMismatch { hashes: usize, sizes: usize },

    #[error("payload size mismatch: chunks declare {declared} bytes, payload holds {actual}")]
    PayloadSizeMismatch { declared: u64, actual: u64 },

    #[error("chunk of {size} bytes does not fit a 32-bit chunk size")]
    ChunkTooLarge { size: u64 },
}
