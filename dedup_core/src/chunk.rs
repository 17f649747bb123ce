use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

/// Position of a fine chunk in the output's total order.
///
/// `l1` is assigned by the fragmenter (one per coarse chunk); `l2` is
/// assigned by the refiner within an `l1` group. `last_l2` marks the final
/// fine chunk produced from a given coarse chunk, so the reorderer can tell
/// when an `l1` group is complete without look-ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Sequence {
    pub l1: u64,
    pub l2: u64,
}

/// A unique chunk's guarded payload. Never both variants of data at once:
/// the uncompressed buffer is released on entering `Compressed`, and the
/// compressed buffer is released on entering `Flushed`.
pub enum ChunkState {
    Uncompressed(Bytes),
    /// Internal-only: the owning worker has taken the uncompressed payload
    /// out for compression but has not yet produced `Compressed`. A waiter
    /// treats this exactly like `Uncompressed` — it is not one of the three
    /// externally observable states, just a way to avoid holding the lock
    /// across the codec call.
    Compressing,
    Compressed(Bytes),
    Flushed,
    /// Internal-only: a fatal error hit this chunk mid-compression. Exists
    /// solely so threads parked on `condvar` wake instead of hanging;
    /// never observed outside this module and never written to the archive.
    Poisoned,
}

/// A content-addressed fine chunk's guarded payload, shared by every
/// occurrence of that content in the input.
///
/// There is no "unique" vs. "duplicate" distinction at this level — every
/// occurrence, whichever one happened to win the index race and trigger
/// compression, holds an `Arc` to the same `UniqueChunk`. Which occurrence's
/// position in the output actually carries the compressed bytes is decided
/// at reorder time by [`UniqueChunk::wait_and_claim`], not here.
pub struct UniqueChunk {
    pub sha1: [u8; 20],
    state: Mutex<ChunkState>,
    condvar: Condvar,
}

/// Outcome of a reorderer's claim attempt on a chunk reached in sequence
/// order.
pub enum Claim {
    /// This occurrence is the earliest (in output order) to reach the
    /// chunk: its bytes are now this caller's to write as `COMPRESSED`.
    Compressed(Bytes),
    /// An earlier occurrence already claimed the compressed bytes; this one
    /// writes a `FINGERPRINT` referencing it instead.
    AlreadyFlushed,
}

impl UniqueChunk {
    pub fn new(sha1: [u8; 20], data: Bytes) -> Arc<Self> {
        Arc::new(UniqueChunk {
            sha1,
            state: Mutex::new(ChunkState::Uncompressed(data)),
            condvar: Condvar::new(),
        })
    }

    /// Takes the uncompressed payload for compression. Only the worker that
    /// won the index race for this chunk ever calls this, so it is
    /// infallible in practice; it still asserts the precondition to catch a
    /// logic error early.
    pub fn take_uncompressed(&self) -> Bytes {
        let mut guard = self.state.lock();
        match std::mem::replace(&mut *guard, ChunkState::Compressing) {
            ChunkState::Uncompressed(data) => data,
            other => {
                *guard = other;
                unreachable!("take_uncompressed called outside the Uncompressed state")
            }
        }
    }

    /// Records a successful compression and wakes any reorderer waiting on
    /// this chunk.
    pub fn set_compressed(&self, compressed: Bytes) {
        let mut guard = self.state.lock();
        *guard = ChunkState::Compressed(compressed);
        self.condvar.notify_all();
    }

    /// Marks this chunk poisoned after a fatal compression failure, waking
    /// any waiter so the reorderer does not hang on a chunk that will never
    /// finish.
    pub fn poison(&self) {
        let mut guard = self.state.lock();
        *guard = ChunkState::Poisoned;
        self.condvar.notify_all();
    }

    /// Blocks until this chunk is no longer `Uncompressed`/`Compressing`,
    /// then resolves which record type this occurrence writes.
    ///
    /// The single-threaded reorderer calls this once per occurrence, always
    /// in strictly increasing `(l1, l2)` order; the first occurrence of a
    /// given chunk it reaches claims the compressed bytes (transitioning to
    /// `Flushed`), and every later occurrence finds it already flushed.
    /// This ties the `COMPRESSED`/`FINGERPRINT` split to output position
    /// rather than to whichever worker happened to win the index race, so
    /// the archive is byte-identical regardless of worker-thread count.
    ///
    /// Returns `None` if the chunk was poisoned by a sibling's fatal error.
    pub fn wait_and_claim(&self) -> Option<Claim> {
        let mut guard = self.state.lock();
        loop {
            match &*guard {
                ChunkState::Uncompressed(_) | ChunkState::Compressing => {
                    self.condvar.wait(&mut guard)
                }
                ChunkState::Compressed(_) => break,
                ChunkState::Flushed => return Some(Claim::AlreadyFlushed),
                ChunkState::Poisoned => return None,
            }
        }
        match std::mem::replace(&mut *guard, ChunkState::Flushed) {
            ChunkState::Compressed(data) => Some(Claim::Compressed(data)),
            _ => unreachable!(),
        }
    }
}

/// One fine-chunk occurrence flowing from the worker pool into the
/// reorderer: its own position in the output, plus a share of whichever
/// `UniqueChunk` its content resolved to.
pub struct PipelineItem {
    pub sequence: Sequence,
    pub last_l2: bool,
    pub chunk: Arc<UniqueChunk>,
}
