#![no_main]

use dedup_core::rolling_hash::{anchor_scan, RollingHashTables};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10_000_000 {
        return;
    }

    let tables = RollingHashTables::new(48);
    let offset = anchor_scan(data, &tables, (1 << 12) - 1, 0, data.len());
    assert!(offset <= data.len(), "anchor offset {offset} exceeds input length {}", data.len());

    // a forced max_len must never be exceeded either
    let capped = anchor_scan(data, &tables, (1 << 12) - 1, 0, 37);
    assert!(capped <= 37.min(data.len()));

    // scanning a prefix must never return an offset past the prefix itself
    if data.len() > 8 {
        let prefix = &data[..data.len() - 8];
        let prefix_offset = anchor_scan(prefix, &tables, (1 << 12) - 1, 0, prefix.len());
        assert!(prefix_offset <= prefix.len());
    }
});
