use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time operation counters of a block store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStoreStats {
    pub get_stored_block_count: u64,
    pub get_stored_block_fail_count: u64,
    pub get_stored_block_byte_count: u64,
    pub get_stored_block_chunk_count: u64,
    pub put_stored_block_count: u64,
    pub put_stored_block_fail_count: u64,
    pub put_stored_block_byte_count: u64,
    pub put_stored_block_chunk_count: u64,
    pub get_existing_content_count: u64,
    pub get_existing_content_fail_count: u64,
    pub flush_count: u64,
    pub flush_fail_count: u64,
}

/// Lock-free counters backing [`BlockStoreStats`].
///
/// Counters are independent; a snapshot taken while operations are in
/// flight may mix values from before and after a given operation.
#[derive(Debug, Default)]
pub struct StatsCounters {
    get_count: AtomicU64,
    get_fail_count: AtomicU64,
    get_bytes: AtomicU64,
    get_chunks: AtomicU64,
    put_count: AtomicU64,
    put_fail_count: AtomicU64,
    put_bytes: AtomicU64,
    put_chunks: AtomicU64,
    existing_count: AtomicU64,
    existing_fail_count: AtomicU64,
    flush_count: AtomicU64,
    flush_fail_count: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_get(&self, bytes: u64, chunks: u64) {
        bump(&self.get_count, 1);
        bump(&self.get_bytes, bytes);
        bump(&self.get_chunks, chunks);
    }

    /// A get that missed is counted but moves no bytes.
    pub fn record_get_miss(&self) {
        bump(&self.get_count, 1);
    }

    pub fn record_get_failure(&self) {
        bump(&self.get_count, 1);
        bump(&self.get_fail_count, 1);
    }

    pub fn record_put(&self, bytes: u64, chunks: u64) {
        bump(&self.put_count, 1);
        bump(&self.put_bytes, bytes);
        bump(&self.put_chunks, chunks);
    }

    pub fn record_put_failure(&self) {
        bump(&self.put_count, 1);
        bump(&self.put_fail_count, 1);
    }

    pub fn record_existing_content(&self, ok: bool) {
        bump(&self.existing_count, 1);
        if !ok {
            bump(&self.existing_fail_count, 1);
        }
    }

    pub fn record_flush(&self, ok: bool) {
        bump(&self.flush_count, 1);
        if !ok {
            bump(&self.flush_fail_count, 1);
        }
    }

    pub fn snapshot(&self) -> BlockStoreStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        BlockStoreStats {
            get_stored_block_count: load(&self.get_count),
            get_stored_block_fail_count: load(&self.get_fail_count),
            get_stored_block_byte_count: load(&self.get_bytes),
            get_stored_block_chunk_count: load(&self.get_chunks),
            put_stored_block_count: load(&self.put_count),
            put_stored_block_fail_count: load(&self.put_fail_count),
            put_stored_block_byte_count: load(&self.put_bytes),
            put_stored_block_chunk_count: load(&self.put_chunks),
            get_existing_content_count: load(&self.existing_count),
            get_existing_content_fail_count: load(&self.existing_fail_count),
            flush_count: load(&self.flush_count),
            flush_fail_count: load(&self.flush_fail_count),
        }
    }
}
