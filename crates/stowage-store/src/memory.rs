use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use stowage_types::{BlockHash, ChunkHash, StoreIndex, StoredBlock};

use crate::error::{StoreError, StoreResult};
use crate::stats::{BlockStoreStats, StatsCounters};
use crate::traits::BlockStore;

/// In-memory, HashMap-based block store.
///
/// Intended for tests and embedding. Blocks are held behind a `RwLock` and
/// cloned out on read; payloads are reference-counted, so a clone does not
/// copy block bytes. The store keeps whatever payload it is given and never
/// looks inside it.
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<BlockHash, StoredBlock>>,
    stats: StatsCounters,
    closed: AtomicBool,
}

impl InMemoryBlockStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            stats: StatsCounters::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Total payload bytes across all stored blocks.
    pub fn total_bytes(&self) -> u64 {
        self.blocks
            .read()
            .expect("lock poisoned")
            .values()
            .map(StoredBlock::size)
            .sum()
    }

    /// The block exactly as it was handed to `put`, bypassing stats.
    pub fn peek(&self, hash: &BlockHash) -> Option<StoredBlock> {
        self.blocks.read().expect("lock poisoned").get(hash).cloned()
    }

    /// Return a sorted list of all block hashes in the store.
    pub fn all_hashes(&self) -> Vec<BlockHash> {
        let map = self.blocks.read().expect("lock poisoned");
        let mut hashes: Vec<BlockHash> = map.keys().copied().collect();
        hashes.sort();
        hashes
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn put_stored_block(&self, block: StoredBlock) -> StoreResult<()> {
        if let Err(e) = self.ensure_open() {
            self.stats.record_put_failure();
            return Err(e);
        }
        let bytes = block.size();
        let chunks = block.index.chunk_count() as u64;
        let mut map = self.blocks.write().expect("lock poisoned");
        // Idempotent: the hash names the logical content, so an existing
        // entry already holds an equivalent block.
        map.entry(block.hash()).or_insert(block);
        drop(map);
        self.stats.record_put(bytes, chunks);
        Ok(())
    }

    async fn get_stored_block(&self, hash: BlockHash) -> StoreResult<Option<StoredBlock>> {
        if let Err(e) = self.ensure_open() {
            self.stats.record_get_failure();
            return Err(e);
        }
        let found = self.peek(&hash);
        match &found {
            Some(block) => self
                .stats
                .record_get(block.size(), block.index.chunk_count() as u64),
            None => self.stats.record_get_miss(),
        }
        Ok(found)
    }

    async fn get_existing_content(
        &self,
        chunks: &[ChunkHash],
        min_block_usage_percent: u32,
    ) -> StoreResult<StoreIndex> {
        if let Err(e) = self.ensure_open() {
            self.stats.record_existing_content(false);
            return Err(e);
        }
        let wanted: HashSet<ChunkHash> = chunks.iter().copied().collect();
        let map = self.blocks.read().expect("lock poisoned");
        let mut found: Vec<_> = map
            .values()
            .filter_map(|block| {
                let index = &block.index;
                let used: u64 = index
                    .chunk_hashes
                    .iter()
                    .zip(&index.chunk_sizes)
                    .filter(|(hash, _)| wanted.contains(hash))
                    .map(|(_, &size)| u64::from(size))
                    .sum();
                let any_hit = index.chunk_hashes.iter().any(|h| wanted.contains(h));
                let total = index.declared_size();
                let usage_ok = total == 0 || used * 100 >= total * u64::from(min_block_usage_percent);
                (any_hit && usage_ok).then(|| index.clone())
            })
            .collect();
        drop(map);
        found.sort_by(|a, b| a.block_hash.cmp(&b.block_hash));
        self.stats.record_existing_content(true);
        Ok(StoreIndex::new(found))
    }

    async fn flush(&self) -> StoreResult<()> {
        let outcome = self.ensure_open();
        self.stats.record_flush(outcome.is_ok());
        outcome
    }

    async fn stats(&self) -> StoreResult<BlockStoreStats> {
        Ok(self.stats.snapshot())
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlockStore")
            .field("block_count", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
