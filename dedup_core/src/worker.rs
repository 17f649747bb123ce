use bytes::Bytes;
use crossbeam_channel::Sender;
use sha1::{Digest, Sha1};

use crate::chunk::{PipelineItem, Sequence, UniqueChunk};
use crate::codec::Codec;
use crate::config::{FINE_MASK, FINE_MAX_CHUNK};
use crate::error::Result;
use crate::fragmenter::CoarseChunk;
use crate::index::{ChunkIndex, Lookup};
use crate::rolling_hash::{anchor_scan, RollingHashTables};
use crate::stats::Stats;

fn sha1_of(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Refines one coarse chunk into fine chunks, deduplicates, and compresses
/// unique occurrences, all within this single call — the "coalesced
/// worker" fusion of Refiner + Deduplicator + Compressor. There is no
/// inter-thread queue between these three logical stages; each fine chunk
/// is carried entirely on this call's stack until it is handed to `out`.
pub fn process_coarse_chunk(
    coarse: CoarseChunk,
    fine_tables: &RollingHashTables,
    index: &ChunkIndex,
    codec: &dyn Codec,
    stats: &Stats,
    out: &Sender<PipelineItem>,
) -> Result<()> {
    let mut buf = coarse.data;
    let mut l2 = 0u64;

    loop {
        let offset = anchor_scan(&buf, fine_tables, FINE_MASK, 0, FINE_MAX_CHUNK);
        let last_l2 = offset >= buf.len();
        let piece = buf.split_to(offset.min(buf.len()));
        let sequence = Sequence { l1: coarse.l1, l2 };
        l2 += 1;

        dedup_and_compress(piece, sequence, last_l2, index, codec, stats, out)?;

        if last_l2 {
            return Ok(());
        }
    }
}

fn dedup_and_compress(
    data: Bytes,
    sequence: Sequence,
    last_l2: bool,
    index: &ChunkIndex,
    codec: &dyn Codec,
    stats: &Stats,
    out: &Sender<PipelineItem>,
) -> Result<()> {
    let input_len = data.len() as u64;
    let fingerprint = sha1_of(&data);
    let candidate = UniqueChunk::new(fingerprint, data);

    // Whether this occurrence ends up writing `COMPRESSED` or `FINGERPRINT`
    // is not decided here: it is decided by the reorderer, which resolves
    // every occurrence's `chunk` to the same `Arc` and claims it in strict
    // sequence order. Here we only decide who *compresses* it.
    match index.lookup_or_insert(fingerprint, candidate.clone()) {
        Lookup::Inserted => {
            stats.record_chunk(input_len);
            let raw = candidate.take_uncompressed();
            match codec.compress(&raw) {
                Ok(compressed) => {
                    stats.record_compressed(compressed.len() as u64);
                    candidate.set_compressed(compressed);
                }
                Err(e) => {
                    candidate.poison();
                    return Err(e);
                }
            }
            let _ = out.send(PipelineItem {
                sequence,
                last_l2,
                chunk: candidate,
            });
        }
        Lookup::Found(target) => {
            stats.record_chunk(input_len);
            stats.record_duplicate(input_len);
            let _ = out.send(PipelineItem {
                sequence,
                last_l2,
                chunk: target,
            });
        }
    }
    Ok(())
}
