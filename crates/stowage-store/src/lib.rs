//! Asynchronous block stores for Stowage.
//!
//! A block store keeps content-addressed blocks: a [`BlockHash`] naming the
//! logical payload, the chunk metadata that describes it, and the payload
//! bytes. Stores share one async contract, [`BlockStore`], so they can be
//! layered freely: a caller does not know (or care) whether the store it
//! talks to compresses, caches, or forwards to a remote backend.
//!
//! # Stores
//!
//! - [`CompressingBlockStore`] -- compresses payloads on put and restores
//!   them on get, recording the codec per block in a [`CompressedFrame`]
//! - [`InMemoryBlockStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Block hashes address the logical, uncompressed payload and are never
//!    recomputed by a layer.
//! 2. Chunk metadata passes through every layer untouched.
//! 3. Backing-store errors are propagated verbatim; a layer only adds its
//!    own error kinds for problems it detects itself.
//! 4. Writes never fail because compression did; they degrade to storing
//!    the payload uncompressed.
//! 5. Reads fail deterministically when a block was written with a codec
//!    this process does not know.
//!
//! [`BlockHash`]: stowage_types::BlockHash

pub mod completion;
pub mod compressing;
pub mod error;
pub mod frame;
pub mod memory;
pub mod pending;
pub mod stats;
pub mod traits;

pub use completion::{get_with_completion, put_with_completion};
pub use compressing::CompressingBlockStore;
pub use error::{ErrorClass, StoreError, StoreResult};
pub use frame::{
    BlockCodec, CompressedFrame, FrameError, DEFAULT_MAX_BLOCK_SIZE, FRAME_HEADER_LEN,
    NESTED_FRAME_SLACK,
};
pub use memory::InMemoryBlockStore;
pub use pending::{OperationKind, PendingOperation};
pub use stats::{BlockStoreStats, StatsCounters};
pub use traits::BlockStore;
