use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dedup_core::rolling_hash::{anchor_scan, RollingHashTables};

fn make_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

fn bench_anchor_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("anchor_scan");
    let tables = RollingHashTables::new(48);

    for size_kb in [64, 256, 1024].iter() {
        let data = make_data(size_kb * 1024);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size_kb}KiB")),
            &data,
            |b, data| {
                b.iter(|| anchor_scan(data, &tables, (1 << 12) - 1, 0, data.len()));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_anchor_scan);
criterion_main!(benches);
