use std::fs::File;
use std::io::Read;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use crossbeam_channel::Sender;
use memmap2::Mmap;

use crate::chunk::Sequence;
use crate::config::Config;
use crate::error::Result;
use crate::rolling_hash::{anchor_scan, RollingHashTables};

/// A coarse chunk handed from the fragmenter to the worker pool, still
/// undivided by the fine rolling hash.
pub struct CoarseChunk {
    pub l1: u64,
    pub data: Bytes,
}

/// Abstracts over streamed-file and preloaded-mmap input so the fragmenter's
/// anchor-scan loop does not care which backs it.
pub trait InputSource: Send {
    /// Appends up to `want` bytes to `buf`. Returns the number appended;
    /// `0` means the source is exhausted.
    fn fill(&mut self, buf: &mut BytesMut, want: usize) -> std::io::Result<usize>;
}

pub struct FileSource(pub File);

impl InputSource for FileSource {
    fn fill(&mut self, buf: &mut BytesMut, want: usize) -> std::io::Result<usize> {
        let start = buf.len();
        buf.resize(start + want, 0);
        let n = self.0.read(&mut buf[start..])?;
        buf.truncate(start + n);
        Ok(n)
    }
}

pub struct MappedSource {
    mmap: Arc<Mmap>,
    pos: usize,
}

impl MappedSource {
    pub fn new(mmap: Arc<Mmap>) -> Self {
        MappedSource { mmap, pos: 0 }
    }
}

impl InputSource for MappedSource {
    fn fill(&mut self, buf: &mut BytesMut, want: usize) -> std::io::Result<usize> {
        let remaining = self.mmap.len() - self.pos;
        let n = want.min(remaining);
        buf.extend_from_slice(&self.mmap[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Reads `source` in `maxbuf`-sized windows and emits coarse chunks cut on
/// content-defined anchors at least `anchor_jump` bytes apart.
///
/// Runs on its own thread so CLI progress reporting and the worker pool can
/// proceed concurrently with it. The final residual bytes at EOF are always
/// promoted to their own `l1` group, regardless of size — see the design
/// notes on the inherited "stub" ambiguity.
pub fn run(
    mut source: impl InputSource,
    tables: &RollingHashTables,
    cfg: &Config,
    sender: Sender<CoarseChunk>,
) -> Result<()> {
    let anchor_jump = crate::config::ANCHOR_JUMP;
    let mut buf = BytesMut::new();
    let mut l1 = 0u64;

    loop {
        // Always try to pull another full window; when no anchor is found
        // in the current buffer the carry must be allowed to grow past
        // `maxbuf` rather than stall, so this is not capped by what's
        // already buffered.
        let n = source.fill(&mut buf, cfg.maxbuf)?;
        let eof = n == 0;

        loop {
            if buf.len() <= anchor_jump {
                break;
            }
            let tail = &buf[anchor_jump..];
            let offset_in_tail = anchor_scan(
                tail,
                tables,
                crate::config::COARSE_MASK,
                0,
                crate::config::COARSE_MAX_CHUNK,
            );
            let cut = anchor_jump + offset_in_tail;
            if offset_in_tail < tail.len() && cut < buf.len() {
                let left = buf.split_to(cut).freeze();
                if sender.send(CoarseChunk { l1, data: left }).is_err() {
                    return Ok(());
                }
                l1 += 1;
            } else {
                break;
            }
        }

        if eof {
            if !buf.is_empty() {
                let stub = buf.split_to(buf.len()).freeze();
                let _ = sender.send(CoarseChunk { l1, data: stub });
            }
            return Ok(());
        }
    }
}
