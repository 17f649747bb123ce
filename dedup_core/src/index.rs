use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::chunk::UniqueChunk;

const NUM_SHARDS: usize = 4096;

/// A SHA-1 fingerprint, hashed in exactly one `Hasher::write` call so
/// `Sha1PrefixHasher` sees the whole 20 bytes at once rather than the
/// byte-at-a-time calls a derived `[u8; 20]` hash impl would make.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Fingerprint([u8; 20]);

impl Hash for Fingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.0);
    }
}

/// A `Hasher` that returns a fingerprint's own leading bytes verbatim.
///
/// SHA-1 output is already uniformly distributed; re-hashing it before
/// bucketing would only cost cycles for no better spread.
#[derive(Default)]
struct Sha1PrefixHasher(u64);

impl Hasher for Sha1PrefixHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut buf = [0u8; 8];
        let n = bytes.len().min(8);
        buf[..n].copy_from_slice(&bytes[..n]);
        self.0 = u64::from_ne_bytes(buf);
    }
}

type Shard = Mutex<HashMap<Fingerprint, Arc<UniqueChunk>, BuildHasherDefault<Sha1PrefixHasher>>>;

/// The global concurrent index of unique chunks, keyed by SHA-1 fingerprint.
///
/// Sharded by the fingerprint's first 32 bits so concurrent workers rarely
/// contend on the same lock. A shard's mutex is held only for the duration
/// of one lookup-or-insert; it is never held across compression or I/O.
pub struct ChunkIndex {
    shards: Vec<Shard>,
}

/// Outcome of probing the index for a fingerprint.
pub enum Lookup {
    /// First occurrence: the caller is responsible for compressing this
    /// chunk; it has already been inserted as the index's owner.
    Inserted,
    /// Repeat occurrence: a share of the chunk already on record.
    Found(Arc<UniqueChunk>),
}

impl ChunkIndex {
    pub fn new() -> Self {
        let mut shards = Vec::with_capacity(NUM_SHARDS);
        shards.resize_with(NUM_SHARDS, || Mutex::new(HashMap::default()));
        ChunkIndex { shards }
    }

    fn shard_for(&self, fingerprint: &[u8; 20]) -> &Shard {
        let first_word = u32::from_ne_bytes(fingerprint[..4].try_into().unwrap());
        &self.shards[(first_word as usize) & (NUM_SHARDS - 1)]
    }

    /// Looks up `fingerprint`, inserting `chunk` as the owner on first
    /// occurrence. `chunk` is only constructed by the caller when needed,
    /// so the caller must be prepared for `Lookup::Found` to discard it.
    pub fn lookup_or_insert(&self, fingerprint: [u8; 20], chunk: Arc<UniqueChunk>) -> Lookup {
        let key = Fingerprint(fingerprint);
        let shard = self.shard_for(&fingerprint);
        let mut guard = shard.lock();
        match guard.get(&key) {
            Some(existing) => Lookup::Found(Arc::clone(existing)),
            None => {
                guard.insert(key, chunk);
                Lookup::Inserted
            }
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChunkIndex {
    fn default() -> Self {
        Self::new()
    }
}
