use std::fmt;
use std::time::Instant;

use stowage_types::BlockHash;
use tracing::debug;

use crate::error::StoreResult;

/// Which forwarding call a [`PendingOperation`] tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Put,
    Get,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put => write!(f, "put"),
            Self::Get => write!(f, "get"),
        }
    }
}

/// One in-flight call to a backing store, together with the intermediate
/// buffer it owns.
///
/// A pending operation is issued right before the forwarding call and is
/// consumed by exactly one of [`settle`](Self::settle) or
/// [`resolve`](Self::resolve) once the backing store has answered. Both take
/// `self` by value, so there is no way to complete the same operation twice;
/// the buffer is released when the operation is consumed (or dropped, if the
/// caller abandons the future).
#[must_use = "a pending operation must be settled or resolved"]
pub struct PendingOperation<B = ()> {
    kind: OperationKind,
    block: BlockHash,
    buffer: B,
    issued_at: Instant,
}

impl PendingOperation<()> {
    pub fn issue(kind: OperationKind, block: BlockHash) -> Self {
        debug!(op = %kind, block = %block.short_hex(), "forwarding to backing store");
        Self {
            kind,
            block,
            buffer: (),
            issued_at: Instant::now(),
        }
    }
}

impl<B> PendingOperation<B> {
    /// Hand `buffer` to this operation; it stays owned here until the
    /// operation completes.
    pub fn attach<N>(self, buffer: N) -> PendingOperation<N> {
        PendingOperation {
            kind: self.kind,
            block: self.block,
            buffer,
            issued_at: self.issued_at,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn block(&self) -> BlockHash {
        self.block
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Complete with the backing store's outcome, releasing the buffer.
    pub fn settle<T>(self, outcome: StoreResult<T>) -> StoreResult<T> {
        self.finish(outcome.is_ok());
        outcome
    }

    /// Complete by handing the buffer to `f`, whose result is the outcome.
    pub fn resolve<T>(self, f: impl FnOnce(B) -> StoreResult<T>) -> StoreResult<T> {
        let Self {
            kind,
            block,
            buffer,
            issued_at,
        } = self;
        let outcome = f(buffer);
        PendingOperation {
            kind,
            block,
            buffer: (),
            issued_at,
        }
        .finish(outcome.is_ok());
        outcome
    }

    fn finish(self, ok: bool) {
        debug!(
            op = %self.kind,
            block = %self.block.short_hex(),
            ok,
            elapsed_us = self.issued_at.elapsed().as_micros() as u64,
            "backing store completed"
        );
    }
}

impl<B> fmt::Debug for PendingOperation<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("kind", &self.kind)
            .field("block", &self.block)
            .finish()
    }
}
