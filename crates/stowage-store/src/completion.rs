//! Callback-style entry points over any [`BlockStore`].
//!
//! Callers that are not themselves async hand over a completion closure;
//! the operation runs as a task on the given runtime and the closure is
//! invoked exactly once with its outcome, on whichever worker thread the
//! operation finished on. `FnOnce` makes a second invocation impossible.

use std::sync::Arc;

use stowage_types::{BlockHash, StoredBlock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::StoreResult;
use crate::traits::BlockStore;

/// Store `block` and report the outcome to `on_complete`.
pub fn put_with_completion<F>(
    handle: &Handle,
    store: Arc<dyn BlockStore>,
    block: StoredBlock,
    on_complete: F,
) -> JoinHandle<()>
where
    F: FnOnce(BlockHash, StoreResult<()>) + Send + 'static,
{
    handle.spawn(async move {
        let hash = block.hash();
        let outcome = store.put_stored_block(block).await;
        on_complete(hash, outcome);
    })
}

/// Fetch the block named `hash` and report the outcome to `on_complete`.
pub fn get_with_completion<F>(
    handle: &Handle,
    store: Arc<dyn BlockStore>,
    hash: BlockHash,
    on_complete: F,
) -> JoinHandle<()>
where
    F: FnOnce(StoreResult<Option<StoredBlock>>) + Send + 'static,
{
    handle.spawn(async move {
        let outcome = store.get_stored_block(hash).await;
        on_complete(outcome);
    })
}
