use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dedup_core::config::{CompressType, Config};
use dedup_core::encode_file;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file to deduplicate and compress
    input: PathBuf,

    /// Output archive (defaults to the input path with ".ddup" appended)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of worker threads (defaults to the available parallelism)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Codec applied to unique chunks
    #[arg(long, value_enum, default_value_t = Codec::None)]
    compress: Codec,

    /// Memory-map the whole input instead of streaming reads
    #[arg(long)]
    preload: bool,

    /// Print chunk/duplicate/byte statistics on exit
    #[arg(short, long)]
    verbose: bool,

    /// Fine-grained rolling hash window, in bytes
    #[arg(long)]
    rf_win_fine: Option<usize>,

    /// Coarse-grained rolling hash window, in bytes
    #[arg(long)]
    rf_win_coarse: Option<usize>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Codec {
    None,
    Gzip,
    Bzip2,
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_possible_value()
            .expect("no skipped variants")
            .get_name()
            .fmt(f)
    }
}

impl From<Codec> for CompressType {
    fn from(codec: Codec) -> Self {
        match codec {
            Codec::None => CompressType::None,
            Codec::Gzip => CompressType::Gzip,
            Codec::Bzip2 => CompressType::Bzip2,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let output = args.output.clone().unwrap_or_else(|| {
        let mut path = args.input.clone();
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".ddup");
        path.set_file_name(name);
        path
    });

    let mut cfg = Config::new(args.input.clone(), output.clone());
    cfg.compress_type = args.compress.into();
    cfg.preloading = args.preload;
    cfg.verbose = args.verbose;
    if let Some(threads) = args.threads {
        cfg.nthreads = threads.max(1);
    }
    if let Some(win) = args.rf_win_fine {
        cfg.rf_win_fine = win;
    }
    if let Some(win) = args.rf_win_coarse {
        cfg.rf_win_coarse = win;
    }

    let stats = encode_file(&cfg).with_context(|| {
        format!(
            "failed to encode {} into {}",
            cfg.infile.display(),
            cfg.outfile.display()
        )
    })?;

    if args.verbose {
        println!("{stats}");
    }

    Ok(())
}
