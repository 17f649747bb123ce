use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide counters, merged lock-free across worker threads.
///
/// Mirrors the accounting the original dedup kernel printed on exit
/// (`total_input`, `total_dedup`, `total_compressed`, `total_output`,
/// chunk/duplicate counts); printed by the CLI only when `verbose` is set.
#[derive(Default)]
pub struct Stats {
    pub total_input: AtomicU64,
    pub total_dedup: AtomicU64,
    pub total_compressed: AtomicU64,
    pub total_output: AtomicU64,
    pub num_chunks: AtomicU64,
    pub num_duplicates: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_chunk(&self, input_len: u64) {
        self.num_chunks.fetch_add(1, Ordering::Relaxed);
        self.total_input.fetch_add(input_len, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self, input_len: u64) {
        self.num_duplicates.fetch_add(1, Ordering::Relaxed);
        self.total_dedup.fetch_add(input_len, Ordering::Relaxed);
    }

    pub fn record_compressed(&self, compressed_len: u64) {
        self.total_compressed
            .fetch_add(compressed_len, Ordering::Relaxed);
    }

    pub fn record_output_bytes(&self, n: u64) {
        self.total_output.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_input: self.total_input.load(Ordering::Relaxed),
            total_dedup: self.total_dedup.load(Ordering::Relaxed),
            total_compressed: self.total_compressed.load(Ordering::Relaxed),
            total_output: self.total_output.load(Ordering::Relaxed),
            num_chunks: self.num_chunks.load(Ordering::Relaxed),
            num_duplicates: self.num_duplicates.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    pub total_input: u64,
    pub total_dedup: u64,
    pub total_compressed: u64,
    pub total_output: u64,
    pub num_chunks: u64,
    pub num_duplicates: u64,
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "chunks:        {}", self.num_chunks)?;
        writeln!(f, "duplicates:    {}", self.num_duplicates)?;
        writeln!(f, "input bytes:   {}", self.total_input)?;
        writeln!(f, "deduped bytes: {}", self.total_dedup)?;
        writeln!(f, "compressed:    {}", self.total_compressed)?;
        write!(f, "output bytes:  {}", self.total_output)
    }
}
