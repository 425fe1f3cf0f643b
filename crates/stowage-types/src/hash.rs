use std::fmt;

use serde::{Deserialize, Serialize};

/// Content identifier for a logical block.
///
/// A `BlockHash` addresses the *uncompressed* block content. Layers that
/// transform a block's payload in flight (compression, encryption) keep the
/// hash unchanged, so a backing store never needs to know whether the bytes
/// it holds are the logical payload or an encoded form of it.
///
/// The all-zero hash is reserved to mean "no block" and is never accepted by
/// a store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    pub const NULL: Self = Self([0u8; 32]);

    /// BLAKE3 of the logical block payload.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Leading 4 bytes as hex, for log fields.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.short_hex())
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Identifier of a single chunk inside a block.
///
/// Chunks are far more numerous than blocks, so they are addressed with a
/// 64-bit hash (the leading bytes of the chunk's BLAKE3 digest).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkHash(u64);

impl ChunkHash {
    /// Compute a `ChunkHash` from raw chunk bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let digest = blake3::hash(data);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        Self(u64::from_le_bytes(head))
    }

    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Debug for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkHash({:016x})", self.0)
    }
}

impl fmt::Display for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
