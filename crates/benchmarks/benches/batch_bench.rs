//! End-to-end batch benchmarks.
//!
//! Covers: run_batch over a pixel grid with varying worker counts.

use common::AppConfig;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pipeline::{run_batch, PixelStack, ValueRecord};

fn make_stack(side: usize, seed: u64) -> PixelStack {
    let mut state = seed;
    let mut records = Vec::new();
    for y in 2001..2009 {
        for k in 0..23 {
            let key = format!("A{y}{:03}", 1 + 16 * k);
            for pixel in 0..side * side {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                let frac = ((state >> 11) as f64) / ((1u64 << 53) as f64);
                let disturbed = pixel % 3 == 0 && y == 2008 && k >= 8;
                let level = if disturbed { 3000.0 } else { 6000.0 };
                let seasonal = 1500.0 * (2.0 * std::f64::consts::PI * k as f64 / 23.0).cos();
                records.push(ValueRecord {
                    date: key.clone(),
                    pixel,
                    raw: (level + seasonal + (frac * 2.0 - 1.0) * 200.0) as i32,
                });
            }
        }
    }
    PixelStack::from_records(side, side, &records, None, &AppConfig::default().quality)
        .expect("valid synthetic stack")
}

fn bench_batch_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_workers");
    group.sample_size(10);
    let stack = make_stack(8, 42);

    for workers in [1, 2, 4] {
        let mut config = AppConfig::default();
        config.batch.max_workers = workers;
        group.bench_with_input(BenchmarkId::from_parameter(workers), &config, |b, cfg| {
            b.iter(|| run_batch(black_box(&stack), 2008.0, cfg))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_batch_workers);
criterion_main!(benches);
