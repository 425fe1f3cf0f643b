use std::sync::Arc;

use async_trait::async_trait;
use stowage_compress::{CompressionError, CompressionRegistry};
use stowage_types::{BlockHash, ChunkHash, StoreIndex, StoredBlock};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::frame::{BlockCodec, CompressedFrame};
use crate::pending::{OperationKind, PendingOperation};
use crate::stats::BlockStoreStats;
use crate::traits::BlockStore;

/// A [`BlockStore`] decorator that compresses payloads on the way into the
/// backing store and decompresses them on the way out.
///
/// Each block is written as a [`CompressedFrame`] carrying the tag it was
/// compressed with, so reads resolve the codec from the stored data rather
/// than from the current configuration. Block hashes and chunk metadata are
/// forwarded unchanged.
///
/// The store holds only shared, immutable references; any number of
/// operations may be in flight at once without contending on a lock.
pub struct CompressingBlockStore {
    backing: Arc<dyn BlockStore>,
    codec: BlockCodec,
}

impl CompressingBlockStore {
    pub fn new(backing: Arc<dyn BlockStore>, registry: Arc<CompressionRegistry>) -> Self {
        Self {
            backing,
            codec: BlockCodec::new(registry),
        }
    }

    /// Reject puts of logical blocks larger than `max_block_size` bytes, and
    /// frames on read that declare more than that plus stacked headers.
    pub fn with_max_block_size(mut self, max_block_size: u64) -> Self {
        self.codec = self.codec.with_max_block_size(max_block_size);
        self
    }

    pub fn backing(&self) -> &Arc<dyn BlockStore> {
        &self.backing
    }

    pub fn registry(&self) -> &Arc<CompressionRegistry> {
        self.codec.registry()
    }

    fn validate(&self, block: &StoredBlock) -> StoreResult<()> {
        if block.hash().is_null() {
            return Err(StoreError::invalid("block hash is null"));
        }
        // Only the index: a payload arriving from another compressing layer
        // is a frame and no longer sums to the chunk sizes.
        block
            .index
            .validate()
            .map_err(|e| StoreError::invalid(format!("block {}: {e}", block.hash())))?;
        // The limit is on the logical block, which the chunk sizes still
        // describe when the payload is a frame from an outer layer. Any
        // payload, chunkless ones included, only has to leave room for
        // stacked frame headers.
        let declared = block.index.declared_size();
        if declared > self.codec.max_block_size() {
            return Err(StoreError::invalid(format!(
                "block {} declares {declared} bytes, limit is {}",
                block.hash(),
                self.codec.max_block_size()
            )));
        }
        if block.size() > self.codec.payload_limit() {
            return Err(StoreError::invalid(format!(
                "block {} payload is {} bytes, limit is {}",
                block.hash(),
                block.size(),
                self.codec.payload_limit()
            )));
        }
        Ok(())
    }

    /// Turn a block fetched from the backing store back into its logical form.
    fn decode_block(&self, stored: StoredBlock) -> StoreResult<StoredBlock> {
        let hash = stored.hash();
        let frame = CompressedFrame::parse(&stored.data).map_err(|e| StoreError::CorruptBlock {
            block: hash,
            reason: e.to_string(),
        })?;
        let raw = self
            .codec
            .decode(&frame)
            .map_err(|e| decode_error(hash, e))?;
        Ok(StoredBlock {
            index: stored.index,
            data: raw,
        })
    }
}

fn decode_error(block: BlockHash, err: CompressionError) -> StoreError {
    match err {
        CompressionError::UnknownTag(tag) => StoreError::UnknownCompressionTag { block, tag },
        other => StoreError::CorruptBlock {
            block,
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl BlockStore for CompressingBlockStore {
    async fn put_stored_block(&self, block: StoredBlock) -> StoreResult<()> {
        self.validate(&block)?;
        let hash = block.hash();
        let frame = self.codec.encode(&block.data, block.index.compression);
        debug!(
            block = %hash.short_hex(),
            tag = %frame.tag,
            raw = frame.uncompressed_size,
            stored = frame.data.len(),
            "encoded block"
        );
        let framed = StoredBlock {
            index: block.index,
            data: frame.to_bytes(),
        };
        let pending = PendingOperation::issue(OperationKind::Put, hash).attach(framed.data.clone());
        pending.settle(self.backing.put_stored_block(framed).await)
    }

    async fn get_stored_block(&self, hash: BlockHash) -> StoreResult<Option<StoredBlock>> {
        let pending = PendingOperation::issue(OperationKind::Get, hash);
        match self.backing.get_stored_block(hash).await {
            Ok(Some(stored)) => pending.attach(stored).resolve(|stored| {
                self.decode_block(stored).map(Some).inspect_err(|e| {
                    warn!(block = %hash.short_hex(), error = %e, "stored block cannot be decoded");
                })
            }),
            other => pending.settle(other),
        }
    }

    async fn get_existing_content(
        &self,
        chunks: &[ChunkHash],
        min_block_usage_percent: u32,
    ) -> StoreResult<StoreIndex> {
        self.backing
            .get_existing_content(chunks, min_block_usage_percent)
            .await
    }

    async fn flush(&self) -> StoreResult<()> {
        self.backing.flush().await
    }

    async fn stats(&self) -> StoreResult<BlockStoreStats> {
        self.backing.stats().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.backing.close().await
    }
}

impl std::fmt::Debug for CompressingBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressingBlockStore")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::NESTED_FRAME_SLACK;
    use crate::memory::InMemoryBlockStore;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use stowage_compress::tags::{DEFLATE_MAX, LZ4_DEFAULT, ZSTD_DEFAULT};
    use stowage_types::{BlockIndex, CompressionTag};

    fn registry() -> Arc<CompressionRegistry> {
        Arc::new(CompressionRegistry::with_defaults())
    }

    fn layered() -> (Arc<InMemoryBlockStore>, CompressingBlockStore) {
        let backing = Arc::new(InMemoryBlockStore::new());
        let store = CompressingBlockStore::new(backing.clone(), registry());
        (backing, store)
    }

    fn stored_frame(backing: &InMemoryBlockStore, hash: &BlockHash) -> CompressedFrame {
        let raw = backing.peek(hash).expect("backing store should hold the block");
        CompressedFrame::parse(&raw.data).unwrap()
    }

    fn chunked(payload: Vec<u8>) -> StoredBlock {
        let half = (payload.len() / 2) as u32;
        let rest = payload.len() as u32 - half;
        let index = BlockIndex::new(
            BlockHash::from_bytes(&payload),
            vec![ChunkHash::from_u64(1), ChunkHash::from_u64(2)],
            vec![half, rest],
        );
        StoredBlock::new(index, payload)
    }

    /// Backing store with canned answers, counting every call.
    #[derive(Default)]
    struct ScriptedStore {
        get_answer: Mutex<Option<StoredBlock>>,
        fail_with: Mutex<Option<fn() -> StoreError>>,
        calls: AtomicUsize,
    }

    impl ScriptedStore {
        fn failing(make: fn() -> StoreError) -> Self {
            Self {
                fail_with: Mutex::new(Some(make)),
                ..Default::default()
            }
        }

        fn answering(block: StoredBlock) -> Self {
            Self {
                get_answer: Mutex::new(Some(block)),
                ..Default::default()
            }
        }

        fn outcome(&self) -> StoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match *self.fail_with.lock().unwrap() {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl BlockStore for ScriptedStore {
        async fn put_stored_block(&self, _block: StoredBlock) -> StoreResult<()> {
            self.outcome()
        }

        async fn get_stored_block(&self, _hash: BlockHash) -> StoreResult<Option<StoredBlock>> {
            self.outcome()?;
            Ok(self.get_answer.lock().unwrap().clone())
        }

        async fn get_existing_content(
            &self,
            chunks: &[ChunkHash],
            min_block_usage_percent: u32,
        ) -> StoreResult<StoreIndex> {
            self.outcome()?;
            let index = BlockIndex::new(
                BlockHash::from_bytes(&min_block_usage_percent.to_le_bytes()),
                chunks.to_vec(),
                vec![1; chunks.len()],
            );
            Ok(StoreIndex::new(vec![index]))
        }

        async fn flush(&self) -> StoreResult<()> {
            self.outcome()
        }

        async fn stats(&self) -> StoreResult<BlockStoreStats> {
            self.outcome()?;
            Ok(BlockStoreStats {
                flush_count: 42,
                put_stored_block_byte_count: 7,
                ..Default::default()
            })
        }

        async fn close(&self) -> StoreResult<()> {
            self.outcome()
        }
    }

    // -----------------------------------------------------------------------
    // Put
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn one_mib_of_zeros_is_compressed_and_restored() {
        let (backing, store) = layered();
        let block = StoredBlock::from_payload(vec![0u8; 1_048_576]).unwrap();
        store.put_stored_block(block.clone()).await.unwrap();

        let frame = stored_frame(&backing, &block.hash());
        assert_eq!(frame.tag, ZSTD_DEFAULT);
        assert_eq!(frame.uncompressed_size, 1_048_576);
        assert!(frame.data.len() < 64 * 1024);

        let read = store.get_stored_block(block.hash()).await.unwrap().unwrap();
        assert_eq!(read.data.len(), 1_048_576);
        assert!(read.data.iter().all(|&b| b == 0));
        assert_eq!(read, block);
    }

    #[tokio::test]
    async fn empty_payload_roundtrips() {
        let (backing, store) = layered();
        let index = BlockIndex::new(BlockHash::from_bytes(b"empty"), vec![], vec![]);
        let block = StoredBlock::new(index, Bytes::new());
        store.put_stored_block(block.clone()).await.unwrap();

        let frame = stored_frame(&backing, &block.hash());
        assert_eq!(frame.uncompressed_size, 0);
        assert!(frame.tag.is_none());

        let read = store.get_stored_block(block.hash()).await.unwrap().unwrap();
        assert!(read.data.is_empty());
    }

    #[tokio::test]
    async fn metadata_and_hash_are_forwarded_unchanged() {
        let (backing, store) = layered();
        let mut block = chunked(b"metadata stays put ".repeat(40));
        block.index.compression = Some(LZ4_DEFAULT);
        store.put_stored_block(block.clone()).await.unwrap();

        let raw = backing.peek(&block.hash()).unwrap();
        assert_eq!(raw.index, block.index);
        assert_ne!(raw.data, block.data);
        assert_eq!(stored_frame(&backing, &block.hash()).tag, LZ4_DEFAULT);

        let read = store.get_stored_block(block.hash()).await.unwrap().unwrap();
        assert_eq!(read.index, block.index);
        assert_eq!(read.data, block.data);
    }

    #[tokio::test]
    async fn invalid_blocks_never_reach_the_backing_store() {
        let backing = Arc::new(ScriptedStore::default());
        let store = CompressingBlockStore::new(backing.clone(), registry());

        let null = StoredBlock::new(BlockIndex::new(BlockHash::NULL, vec![], vec![]), vec![1u8]);
        let mut miscounted = chunked(vec![1u8; 100]);
        miscounted.index.chunk_hashes.push(ChunkHash::from_u64(3));

        for bad in [null, miscounted] {
            let err = store.put_stored_block(bad).await.unwrap_err();
            assert_eq!(err.class(), crate::ErrorClass::InvalidArgument);
        }
        assert_eq!(backing.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_put_is_rejected() {
        let (backing, store) = layered();
        let store = store.with_max_block_size(16);
        let err = store
            .put_stored_block(StoredBlock::from_payload(vec![0u8; 17]).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument { .. }));

        let index = BlockIndex::new(BlockHash::from_bytes(b"opaque"), vec![], vec![]);
        let chunkless = StoredBlock::new(index, vec![0u8; 16 + NESTED_FRAME_SLACK as usize + 1]);
        let err = store.put_stored_block(chunkless).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument { .. }));
        assert!(backing.is_empty());
    }

    #[tokio::test]
    async fn incompressible_payload_is_stored_raw() {
        let (backing, store) = layered();
        let payload: Vec<u8> = (0..48u8).map(|i| i.wrapping_mul(97) ^ 0x3c).collect();
        let block = StoredBlock::from_payload(payload).unwrap();
        store.put_stored_block(block.clone()).await.unwrap();

        let frame = stored_frame(&backing, &block.hash());
        assert!(frame.tag.is_none());
        assert_eq!(frame.data, block.data);
        assert_eq!(
            store.get_stored_block(block.hash()).await.unwrap(),
            Some(block)
        );
    }

    #[tokio::test]
    async fn backing_put_error_passes_through() {
        let backing = Arc::new(ScriptedStore::failing(|| StoreError::Backend("quota".into())));
        let store = CompressingBlockStore::new(backing, registry());
        let err = store
            .put_stored_block(StoredBlock::from_payload(vec![5u8; 64]).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(ref msg) if msg == "quota"));
        assert_eq!(err.class(), crate::ErrorClass::BackingStore);
    }

    // -----------------------------------------------------------------------
    // Get
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn missing_block_is_none() {
        let (_, store) = layered();
        let read = store
            .get_stored_block(BlockHash::from_bytes(b"absent"))
            .await
            .unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn backing_get_error_passes_through() {
        let backing = Arc::new(ScriptedStore::failing(|| {
            StoreError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow disk"))
        }));
        let store = CompressingBlockStore::new(backing, registry());
        let err = store
            .get_stored_block(BlockHash::from_bytes(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(ref e) if e.kind() == std::io::ErrorKind::TimedOut));
    }

    #[tokio::test]
    async fn unknown_tag_fails_deterministically() {
        let frame = CompressedFrame {
            tag: CompressionTag::new(0xffff_ffff),
            uncompressed_size: 4,
            data: Bytes::from_static(b"abcd"),
        };
        let block = StoredBlock::from_payload(b"abcd".to_vec()).unwrap().with_data(frame.to_bytes());
        let backing = Arc::new(ScriptedStore::answering(block.clone()));
        let store = CompressingBlockStore::new(backing, registry());

        for _ in 0..3 {
            let err = store.get_stored_block(block.hash()).await.unwrap_err();
            assert!(matches!(
                err,
                StoreError::UnknownCompressionTag { tag, block: b }
                    if tag.raw() == 0xffff_ffff && b == block.hash()
            ));
        }
    }

    #[tokio::test]
    async fn size_mismatch_is_corrupt_block() {
        let (backing, store) = layered();
        let block = StoredBlock::from_payload(b"size matters ".repeat(100)).unwrap();
        store.put_stored_block(block.clone()).await.unwrap();

        let mut frame = stored_frame(&backing, &block.hash());
        frame.uncompressed_size -= 1;
        let tampered = Arc::new(InMemoryBlockStore::new());
        tampered
            .put_stored_block(block.with_data(frame.to_bytes()))
            .await
            .unwrap();

        let reader = CompressingBlockStore::new(tampered, registry());
        let err = reader.get_stored_block(block.hash()).await.unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::CorruptBlock);
    }

    #[tokio::test]
    async fn truncated_frame_is_corrupt_block() {
        let block = StoredBlock::from_payload(b"tiny".to_vec()).unwrap();
        let backing = Arc::new(ScriptedStore::answering(block.clone()));
        let store = CompressingBlockStore::new(backing, registry());
        let err = store.get_stored_block(block.hash()).await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptBlock { .. }));
    }

    #[tokio::test]
    async fn garbage_body_is_corrupt_block() {
        let frame = CompressedFrame {
            tag: ZSTD_DEFAULT,
            uncompressed_size: 100,
            data: Bytes::from_static(b"not a zstd stream"),
        };
        let block = StoredBlock::from_payload(vec![0u8; 100]).unwrap().with_data(frame.to_bytes());
        let store = CompressingBlockStore::new(Arc::new(ScriptedStore::answering(block.clone())), registry());
        let err = store.get_stored_block(block.hash()).await.unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::CorruptBlock);
    }

    #[tokio::test]
    async fn blocks_written_under_other_default_are_readable() {
        let backing = Arc::new(InMemoryBlockStore::new());
        let mut deflate_registry = CompressionRegistry::with_defaults();
        deflate_registry.set_default_tag(DEFLATE_MAX).unwrap();
        let writer = CompressingBlockStore::new(backing.clone(), Arc::new(deflate_registry));
        let reader = CompressingBlockStore::new(backing.clone(), registry());

        let block = StoredBlock::from_payload(b"written by deflate ".repeat(64)).unwrap();
        writer.put_stored_block(block.clone()).await.unwrap();
        assert_eq!(stored_frame(&backing, &block.hash()).tag, DEFLATE_MAX);
        assert_eq!(
            reader.get_stored_block(block.hash()).await.unwrap(),
            Some(block)
        );
    }

    #[tokio::test]
    async fn reader_without_codec_reports_unknown_tag() {
        let backing = Arc::new(InMemoryBlockStore::new());
        let writer = CompressingBlockStore::new(backing.clone(), registry());
        let reader = CompressingBlockStore::new(backing, Arc::new(CompressionRegistry::new()));

        let block = StoredBlock::from_payload(b"version skew ".repeat(64)).unwrap();
        writer.put_stored_block(block.clone()).await.unwrap();
        let err = reader.get_stored_block(block.hash()).await.unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::UnknownCompressionTag);
    }

    // -----------------------------------------------------------------------
    // Passthrough operations
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn passthrough_operations_return_backing_answers() {
        let backing = Arc::new(ScriptedStore::default());
        let store = CompressingBlockStore::new(backing.clone(), registry());
        let chunks = [ChunkHash::from_u64(11), ChunkHash::from_u64(12)];

        let direct = backing.get_existing_content(&chunks, 60).await.unwrap();
        let layered = store.get_existing_content(&chunks, 60).await.unwrap();
        assert_eq!(layered, direct);

        store.flush().await.unwrap();
        assert_eq!(store.stats().await.unwrap(), backing.stats().await.unwrap());
        store.close().await.unwrap();
        assert_eq!(backing.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn passthrough_operations_return_backing_errors() {
        let backing = Arc::new(ScriptedStore::failing(|| StoreError::Backend("down".into())));
        let store = CompressingBlockStore::new(backing, registry());

        let is_down = |e: StoreError| matches!(e, StoreError::Backend(ref m) if m == "down");
        assert!(is_down(store.get_existing_content(&[], 0).await.unwrap_err()));
        assert!(is_down(store.flush().await.unwrap_err()));
        assert!(is_down(store.stats().await.unwrap_err()));
        assert!(is_down(store.close().await.unwrap_err()));
    }

    #[tokio::test]
    async fn stats_reflect_stored_bytes() {
        let (backing, store) = layered();
        let block = StoredBlock::from_payload(vec![0u8; 100_000]).unwrap();
        store.put_stored_block(block.clone()).await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.put_stored_block_count, 1);
        assert_eq!(stats.put_stored_block_byte_count, backing.total_bytes());
        assert!(stats.put_stored_block_byte_count < 100_000);
    }

    #[tokio::test]
    async fn close_reaches_backing_store() {
        let (backing, store) = layered();
        store.close().await.unwrap();
        assert!(backing.is_closed());
        let err = store
            .put_stored_block(StoredBlock::from_payload(vec![1u8; 8]).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }

    // -----------------------------------------------------------------------
    // Layering / concurrency
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn compressing_stores_stack() {
        let backing = Arc::new(InMemoryBlockStore::new());
        let inner: Arc<dyn BlockStore> = Arc::new(CompressingBlockStore::new(backing.clone(), registry()));
        let outer = CompressingBlockStore::new(inner, registry());

        let block = chunked(b"two layers deep ".repeat(128));
        outer.put_stored_block(block.clone()).await.unwrap();
        assert_eq!(outer.get_stored_block(block.hash()).await.unwrap(), Some(block));
    }

    fn incompressible(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(97) ^ 0x3c).collect()
    }

    #[tokio::test]
    async fn stacked_stores_share_a_size_limit() {
        let backing = Arc::new(InMemoryBlockStore::new());
        let mut store: Arc<dyn BlockStore> = backing.clone();
        for _ in 0..3 {
            store = Arc::new(CompressingBlockStore::new(store, registry()).with_max_block_size(64));
        }

        let at_limit = StoredBlock::from_payload(incompressible(64)).unwrap();
        let near_limit = StoredBlock::from_payload(incompressible(60)).unwrap();
        for block in [at_limit, near_limit] {
            store.put_stored_block(block.clone()).await.unwrap();
            assert_eq!(store.get_stored_block(block.hash()).await.unwrap(), Some(block));
        }

        let over = StoredBlock::from_payload(incompressible(65)).unwrap();
        let err = store.put_stored_block(over).await.unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::InvalidArgument);
        assert_eq!(backing.len(), 2);
    }

    #[tokio::test]
    async fn stacked_stores_accept_chunkless_blocks_at_the_limit() {
        let backing = Arc::new(InMemoryBlockStore::new());
        let inner: Arc<dyn BlockStore> =
            Arc::new(CompressingBlockStore::new(backing, registry()).with_max_block_size(64));
        let outer = CompressingBlockStore::new(inner, registry()).with_max_block_size(64);

        let index = BlockIndex::new(BlockHash::from_bytes(b"opaque"), vec![], vec![]);
        let block = StoredBlock::new(index, incompressible(64));
        outer.put_stored_block(block.clone()).await.unwrap();
        assert_eq!(outer.get_stored_block(block.hash()).await.unwrap(), Some(block));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_roundtrips() {
        let (backing, store) = layered();
        let store = Arc::new(store);
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64u32 {
            let store = Arc::clone(&store);
            tasks.spawn(async move {
                let payload = format!("block {i} ").repeat(i as usize + 1).into_bytes();
                let block = StoredBlock::from_payload(payload).unwrap();
                store.put_stored_block(block.clone()).await.unwrap();
                let read = store.get_stored_block(block.hash()).await.unwrap();
                assert_eq!(read, Some(block));
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.expect("task should not panic");
        }
        assert_eq!(backing.len(), 64);
    }

    #[test]
    fn debug_format() {
        let (_, store) = layered();
        let debug = format!("{store:?}");
        assert!(debug.contains("CompressingBlockStore"));
    }
}
