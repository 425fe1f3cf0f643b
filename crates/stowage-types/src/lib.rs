//! Foundation types for the stowage block pipeline.
//!
//! Every stowage crate exchanges data through the types defined here. A
//! [`StoredBlock`] is the unit handed to and from a block store: a
//! [`BlockIndex`] describing the block (its content hash, the chunks it
//! carries and the compression the writer asked for) plus an opaque payload.
//!
//! # Key Types
//!
//! - [`BlockHash`] -- Content identifier of a logical (uncompressed) block
//! - [`ChunkHash`] -- Content identifier of one chunk inside a block
//! - [`BlockIndex`] -- Chunk metadata carried alongside a block payload
//! - [`StoredBlock`] -- Block index + payload buffer
//! - [`StoreIndex`] -- A set of block indexes returned by content queries
//! - [`CompressionTag`] -- Compression algorithm identifier, `0` = uncompressed

pub mod block;
pub mod error;
pub mod hash;
pub mod tag;

pub use block::{BlockIndex, StoreIndex, StoredBlock};
pub use error::TypeError;
pub use hash::{BlockHash, ChunkHash};
pub use tag::CompressionTag;
