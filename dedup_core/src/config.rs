use std::path::PathBuf;

/// Codec applied to unique chunks before they are written to the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressType {
    None,
    Gzip,
    Bzip2,
}

impl CompressType {
    /// The 1-byte codec id recorded in the archive header.
    pub fn codec_id(self) -> u8 {
        match self {
            CompressType::None => 0,
            CompressType::Gzip => 1,
            CompressType::Bzip2 => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressType::None => "none",
            CompressType::Gzip => "gzip",
            CompressType::Bzip2 => "bzip2",
        }
    }
}

/// Rolling-hash window size for the fine-grained refinement pass.
pub const DEFAULT_RF_WIN_FINE: usize = 48;
/// Rolling-hash window size for the coarse fragmentation pass.
pub const DEFAULT_RF_WIN_COARSE: usize = 256;
/// Fragmenter read window. Must be at least `8 * ANCHOR_JUMP`.
pub const DEFAULT_MAXBUF: usize = 1 << 20;
/// Minimum distance between consecutive coarse anchors.
pub const ANCHOR_JUMP: usize = DEFAULT_MAXBUF / 8;
/// Coarse anchor mask, targeting an average coarse chunk of 256 KiB.
pub const COARSE_MASK: u64 = (1 << 18) - 1;
/// Fine anchor mask, targeting an average fine chunk of 4 KiB.
pub const FINE_MASK: u64 = (1 << 12) - 1;

/// Forced coarse chunk boundary, 8x the mask's average, so low-entropy
/// input that never satisfies the anchor predicate still fragments.
pub const COARSE_MAX_CHUNK: usize = 8 * (1 << 18);
/// Forced fine chunk boundary, 8x the mask's average, for the same reason.
pub const FINE_MAX_CHUNK: usize = 8 * (1 << 12);

/// Depth of the bounded channel carrying coarse chunks from the fragmenter
/// to the worker pool.
pub const COARSE_QUEUE_DEPTH: usize = 64;
/// Depth of the bounded channel carrying finished items from the worker pool
/// to the reorderer.
pub const REORDER_QUEUE_DEPTH: usize = 256;

/// Resolved configuration for one run of the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub infile: PathBuf,
    pub outfile: PathBuf,
    pub nthreads: usize,
    pub compress_type: CompressType,
    pub preloading: bool,
    pub verbose: bool,
    pub rf_win_fine: usize,
    pub rf_win_coarse: usize,
    pub maxbuf: usize,
}

impl Config {
    pub fn new(infile: PathBuf, outfile: PathBuf) -> Self {
        Config {
            infile,
            outfile,
            nthreads: rayon::current_num_threads(),
            compress_type: CompressType::None,
            preloading: false,
            verbose: false,
            rf_win_fine: DEFAULT_RF_WIN_FINE,
            rf_win_coarse: DEFAULT_RF_WIN_COARSE,
            maxbuf: DEFAULT_MAXBUF,
        }
    }
}
