use stowage_types::{BlockHash, CompressionTag};

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The block handed to `put` is malformed. Raised before any backing
    /// store is touched.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A stored block names a compression tag this process cannot resolve.
    #[error("block {block} uses unknown compression tag {tag}")]
    UnknownCompressionTag { block: BlockHash, tag: CompressionTag },

    /// The stored bytes of a block cannot be turned back into its payload.
    #[error("corrupt block {block}: {reason}")]
    CorruptBlock { block: BlockHash, reason: String },

    /// The requested block does not exist (for backends that treat a miss
    /// as an error rather than `Ok(None)`).
    #[error("block not found: {0}")]
    NotFound(BlockHash),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

/// Coarse classification, so callers can tell storage failures apart from
/// content-integrity failures without matching every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    InvalidArgument,
    BackingStore,
    UnknownCompressionTag,
    CorruptBlock,
}

impl StoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidArgument { .. } => ErrorClass::InvalidArgument,
            Self::UnknownCompressionTag { .. } => ErrorClass::UnknownCompressionTag,
            Self::CorruptBlock { .. } => ErrorClass::CorruptBlock,
            Self::NotFound(_) | Self::Io(_) | Self::Backend(_) | Self::Closed => {
                ErrorClass::BackingStore
            }
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
