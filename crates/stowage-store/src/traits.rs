use async_trait::async_trait;
use stowage_types::{BlockHash, ChunkHash, StoreIndex, StoredBlock};

use crate::error::StoreResult;
use crate::stats::BlockStoreStats;

/// Asynchronous content-addressed block store.
///
/// All implementations must satisfy these invariants:
/// - Every call resolves exactly once, with success or an error; the future
///   may be driven to completion on any runtime worker thread.
/// - Blocks are addressed by the hash of their *logical* content. A store
///   never recomputes or checks that hash against the bytes it holds, since
///   layers above it may hand it an encoded form of the payload.
/// - A missing block is `Ok(None)`, not an error.
/// - All backend errors are propagated, never silently ignored.
///
/// Stores are layered by wrapping an `Arc<dyn BlockStore>`; a wrapper must
/// forward everything it does not explicitly transform.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Store a block. Writing a block that already exists is a no-op.
    async fn put_stored_block(&self, block: StoredBlock) -> StoreResult<()>;

    /// Fetch a block by hash. Returns `Ok(None)` if the block does not exist.
    async fn get_stored_block(&self, hash: BlockHash) -> StoreResult<Option<StoredBlock>>;

    /// Return the indexes of stored blocks holding any of `chunks`, keeping
    /// only blocks where at least `min_block_usage_percent` of the block's
    /// bytes belong to requested chunks.
    async fn get_existing_content(
        &self,
        chunks: &[ChunkHash],
        min_block_usage_percent: u32,
    ) -> StoreResult<StoreIndex>;

    /// Wait until every previously accepted write is durable.
    async fn flush(&self) -> StoreResult<()>;

    /// Snapshot of the store's operation counters.
    async fn stats(&self) -> StoreResult<BlockStoreStats>;

    /// Release resources. Operations issued after `close` fail.
    async fn close(&self) -> StoreResult<()>;
}
