#![no_main]

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use dedup_core::config::Config;
use dedup_core::pipeline::run_pipeline;
use libfuzzer_sys::fuzz_target;

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 4_000_000 {
        return;
    }

    let mut path = std::env::temp_dir();
    path.push(format!("dedup_fuzz_{}.bin", std::process::id()));
    if std::fs::write(&path, data).is_err() {
        return;
    }

    let cfg = Config::new(path.clone(), PathBuf::from("unused"));
    let sink = SharedSink::default();
    let _ = run_pipeline(&cfg, Box::new(sink));

    let _ = std::fs::remove_file(&path);
});
