use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::bounded;
use memmap2::MmapOptions;
use rayon::prelude::*;

use crate::archive::ArchiveWriter;
use crate::codec::make_codec;
use crate::config::{Config, COARSE_QUEUE_DEPTH, REORDER_QUEUE_DEPTH};
use crate::error::{DedupError, Result};
use crate::fragmenter::{self, CoarseChunk, FileSource, MappedSource};
use crate::index::ChunkIndex;
use crate::reorder::Reorderer;
use crate::rolling_hash::RollingHashTables;
use crate::stats::{Stats, StatsSnapshot};
use crate::worker;

/// Runs the fragmenter, the fused refine/dedup/compress worker pool, and
/// the reorderer concurrently, joining them via one `thread::scope` so the
/// first fatal error from any stage is what the caller sees.
pub fn run_pipeline(cfg: &Config, writer: Box<dyn std::io::Write + Send>) -> Result<StatsSnapshot> {
    if cfg.preloading {
        let metadata = std::fs::metadata(&cfg.infile)?;
        if !metadata.is_file() {
            return Err(DedupError::NotARegularFile(cfg.infile.clone()));
        }
    }

    if cfg.maxbuf < 8 * crate::config::ANCHOR_JUMP {
        tracing::warn!(
            maxbuf = cfg.maxbuf,
            "maxbuf is smaller than 8x the anchor jump distance; throughput may suffer"
        );
    }

    let coarse_tables = RollingHashTables::new(cfg.rf_win_coarse);
    let fine_tables = RollingHashTables::new(cfg.rf_win_fine);
    let index = ChunkIndex::new();
    let codec = make_codec(cfg.compress_type);
    let stats = Stats::new();
    let abort = AtomicBool::new(false);
    let first_error: Mutex<Option<DedupError>> = Mutex::new(None);

    let mut archive = ArchiveWriter::new(writer);
    archive.write_header(cfg.compress_type.codec_id())?;

    let (coarse_tx, coarse_rx) = bounded::<CoarseChunk>(COARSE_QUEUE_DEPTH);
    let (item_tx, item_rx) = bounded(REORDER_QUEUE_DEPTH);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.nthreads)
        .build()
        .map_err(|e| DedupError::Integrity(format!("failed to build worker pool: {e}")))?;

    let record_error = |err: DedupError| {
        abort.store(true, Ordering::Relaxed);
        let mut slot = first_error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(err);
        }
    };

    let record_error_ref = &record_error;

    std::thread::scope(|scope| {
        scope.spawn(move || {
            let file = match File::open(&cfg.infile) {
                Ok(f) => f,
                Err(e) => {
                    record_error_ref(DedupError::Io(e));
                    return;
                }
            };

            let result = if cfg.preloading {
                match unsafe { MmapOptions::new().map(&file) } {
                    Ok(mmap) => fragmenter::run(MappedSource::new(Arc::new(mmap)), &coarse_tables, cfg, coarse_tx),
                    Err(e) => Err(DedupError::Io(e)),
                }
            } else {
                fragmenter::run(FileSource(file), &coarse_tables, cfg, coarse_tx)
            };

            if let Err(e) = result {
                record_error_ref(e);
            }
        });

        let index_ref = &index;
        let codec_ref = codec.as_ref();
        let stats_ref = &stats;
        let fine_tables_ref = &fine_tables;
        let abort_ref = &abort;
        let pool_ref = &pool;
        let item_tx_for_pool = item_tx.clone();

        scope.spawn(move || {
            pool_ref.install(|| {
                let result = coarse_rx
                    .into_iter()
                    .par_bridge()
                    .try_for_each_init(
                        || item_tx_for_pool.clone(),
                        |out, coarse| -> Result<()> {
                            if abort_ref.load(Ordering::Relaxed) {
                                return Err(DedupError::Aborted);
                            }
                            worker::process_coarse_chunk(
                                coarse,
                                fine_tables_ref,
                                index_ref,
                                codec_ref,
                                stats_ref,
                                out,
                            )
                        },
                    );
                if let Err(e) = result {
                    record_error_ref(e);
                }
            });
            drop(item_tx_for_pool);
        });

        drop(item_tx);

        let reorder_result = Reorderer::new().run(item_rx, &mut archive, &stats, &abort);
        if let Err(e) = reorder_result {
            record_error_ref(e);
        }
    });

    if let Some(err) = first_error.into_inner().unwrap() {
        return Err(err);
    }

    archive.finish()?;
    Ok(stats.snapshot())
}
