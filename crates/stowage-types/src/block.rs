use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::{BlockHash, ChunkHash};
use crate::tag::CompressionTag;

/// Chunk metadata describing one block.
///
/// The chunk list is ordered: chunk `i` occupies the bytes following chunks
/// `0..i` in the block payload. `compression` records what the writer asked
/// for (`None` = use the store's default); the tag actually applied to the
/// stored bytes lives in the payload framing, not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIndex {
    pub block_hash: BlockHash,
    pub chunk_hashes: Vec<ChunkHash>,
    pub chunk_sizes: Vec<u32>,
    pub compression: Option<CompressionTag>,
}

impl BlockIndex {
    /// Create a block index from parallel chunk hash / size lists.
    pub fn new(block_hash: BlockHash, chunk_hashes: Vec<ChunkHash>, chunk_sizes: Vec<u32>) -> Self {
        Self {
            block_hash,
            chunk_hashes,
            chunk_sizes,
            compression: None,
        }
    }

    /// Pin the compression tag requested for this block.
    pub fn with_compression(mut self, tag: CompressionTag) -> Self {
        self.compression = Some(tag);
        self
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_hashes.len()
    }

    /// Sum of all chunk sizes, i.e. the logical payload length.
    pub fn declared_size(&self) -> u64 {
        self.chunk_sizes.iter().map(|&s| u64::from(s)).sum()
    }

    /// Check that hashes and sizes describe the same chunks.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.chunk_hashes.len() != self.chunk_sizes.len() {
            return Err(TypeError::ChunkCountMismatch {
                hashes: self.chunk_hashes.len(),
                sizes: self.chunk_sizes.len(),
            });
        }
        Ok(())
    }
}

/// A block as exchanged with a block store: index + payload.
///
/// The payload is a reference-counted [`Bytes`] buffer so layers can hand
/// sub-slices around without copying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlock {
    pub index: BlockIndex,
    pub data: Bytes,
}

impl StoredBlock {
    pub fn new(index: BlockIndex, data: impl Into<Bytes>) -> Self {
        Self {
            index,
            data: data.into(),
        }
    }

    /// Build a single-chunk block whose hash is derived from `data`.
    ///
    /// Chunk sizes are 32-bit, so `data` must be shorter than 4 GiB.
    pub fn from_payload(data: impl Into<Bytes>) -> Result<Self, TypeError> {
        let data: Bytes = data.into();
        let size = chunk_size(data.len())?;
        let index = BlockIndex::new(
            BlockHash::from_bytes(&data),
            vec![ChunkHash::from_bytes(&data)],
            vec![size],
        );
        Ok(Self { index, data })
    }

    pub fn hash(&self) -> BlockHash {
        self.index.block_hash
    }

    /// Payload length in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Same hash and chunk metadata, different payload.
    pub fn with_data(&self, data: impl Into<Bytes>) -> Self {
        Self {
            index: self.index.clone(),
            data: data.into(),
        }
    }

    /// Check the index is consistent and, when chunks are declared, that the
    /// payload length equals the sum of the chunk sizes.
    ///
    /// A block that declares no chunks carries an opaque payload of any size.
    pub fn validate(&self) -> Result<(), TypeError> {
        self.index.validate()?;
        if self.index.chunk_count() > 0 {
            let declared = self.index.declared_size();
            if declared != self.size() {
                return Err(TypeError::PayloadSizeMismatch {
                    declared,
                    actual: self.size(),
                });
            }
        }
        Ok(())
    }
}

/// Chunk sizes are stored as `u32`.
fn chunk_size(len: usize) -> Result<u32, TypeError> {
    u32::try_from(len).map_err(|_| TypeError::ChunkTooLarge { size: len as u64 })
}

/// A set of block indexes, e.g. the answer to "which blocks hold these
/// chunks".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreIndex {
    pub blocks: Vec<BlockIndex>,
}

impl StoreIndex {
    pub fn new(blocks: Vec<BlockIndex>) -> Self {
        Self { blocks }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total chunk entries across all blocks.
    pub fn chunk_count(&self) -> usize {
        self.blocks.iter().map(BlockIndex::chunk_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains_block(&self, hash: &BlockHash) -> bool {
        self.blocks.iter().any(|b| b.block_hash == *hash)
    }

    pub fn block_hashes(&self) -> Vec<BlockHash> {
        self.blocks.iter().map(|b| b.block_hash).collect()
    }
}
