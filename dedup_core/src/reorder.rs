use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Receiver;

use crate::archive::ArchiveWriter;
use crate::chunk::{Claim, PipelineItem};
use crate::error::{DedupError, Result};
use crate::stats::Stats;

/// Single-threaded consumer: reassembles fine chunks into strict `(l1, l2)`
/// order and writes each as an archive record.
///
/// Chunks can arrive out of order (workers race on the coarse-chunk pool),
/// so completed-but-not-yet-due items are held in a per-`l1` `BTreeMap`
/// keyed by `l2`, with an outer map holding the `BTreeMap` for every `l1`
/// whose turn has not yet come.
pub struct Reorderer {
    next_l1: u64,
    next_l2: u64,
    pending: HashMap<u64, BTreeMap<u64, PipelineItem>>,
}

impl Reorderer {
    pub fn new() -> Self {
        Reorderer {
            next_l1: 0,
            next_l2: 0,
            pending: HashMap::new(),
        }
    }

    /// Drains `items`, writing records to `writer` in order, until the
    /// channel is closed or `abort` is observed set.
    pub fn run(
        mut self,
        items: Receiver<PipelineItem>,
        writer: &mut ArchiveWriter,
        stats: &Stats,
        abort: &AtomicBool,
    ) -> Result<()> {
        for item in items {
            if abort.load(Ordering::Relaxed) {
                return Err(DedupError::Aborted);
            }
            let l1 = item.sequence.l1;
            self.pending.entry(l1).or_default().insert(item.sequence.l2, item);
            self.drain_ready(writer, stats, abort)?;
        }

        if abort.load(Ordering::Relaxed) {
            return Err(DedupError::Aborted);
        }

        if !self.pending.is_empty() {
            return Err(DedupError::Integrity(format!(
                "{} coarse group(s) left unflushed at shutdown, starting at l1={}",
                self.pending.len(),
                self.next_l1
            )));
        }
        Ok(())
    }

    fn drain_ready(
        &mut self,
        writer: &mut ArchiveWriter,
        stats: &Stats,
        abort: &AtomicBool,
    ) -> Result<()> {
        loop {
            let Some(group) = self.pending.get_mut(&self.next_l1) else {
                return Ok(());
            };
            let Some(item) = group.remove(&self.next_l2) else {
                return Ok(());
            };

            let last_l2 = item.last_l2;
            self.emit(item, writer, stats, abort)?;
            self.next_l2 += 1;

            if last_l2 {
                self.pending.remove(&self.next_l1);
                self.next_l1 += 1;
                self.next_l2 = 0;
            }
        }
    }

    fn emit(
        &self,
        item: PipelineItem,
        writer: &mut ArchiveWriter,
        stats: &Stats,
        abort: &AtomicBool,
    ) -> Result<()> {
        if abort.load(Ordering::Relaxed) {
            return Err(DedupError::Aborted);
        }

        // Every occurrence of a chunk's content — whichever worker actually
        // compressed it — resolves to the same `Arc<UniqueChunk>`. Which
        // occurrence's output position gets `COMPRESSED` is decided here,
        // by sequence order, not by which worker won the index race: this
        // is the earliest `(l1, l2)` to reach the chunk (since this loop
        // always runs in strictly increasing order), so the claim always
        // lands at the same spot no matter how many threads raced for it.
        match item.chunk.wait_and_claim().ok_or(DedupError::Aborted)? {
            Claim::Compressed(compressed) => {
                stats.record_output_bytes(compressed.len() as u64 + 9);
                writer.write_compressed(&compressed)?;
            }
            Claim::AlreadyFlushed => {
                writer.write_fingerprint(&item.chunk.sha1)?;
                stats.record_output_bytes(9 + 20);
            }
        }
        Ok(())
    }
}

impl Default for Reorderer {
    fn default() -> Self {
        Self::new()
    }
}
