//! Criterion benchmarks for the Auto-CLAHE core operations.
//!
//! Run with: cargo bench -p autoclahe_core
//! Run specific: cargo bench -p autoclahe_core -- auto_enhance

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::{Array2, Array4};
use rand::prelude::*;

use autoclahe_core::{auto_enhance, autocontrast, filter_all, reduce_to_bright_field};

fn random_pattern(rows: usize, cols: usize, seed: u64) -> Array2<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| rng.gen())
}

fn random_dataset(scan: usize, pattern: usize, seed: u64) -> Array4<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array4::from_shape_fn((scan, scan, pattern, pattern), |_| rng.gen())
}

fn bench_auto_enhance(c: &mut Criterion) {
    let mut group = c.benchmark_group("auto_enhance");

    for size in [64, 128, 256, 512] {
        let pattern = random_pattern(size, size, 42);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &pattern, |b, pattern| {
            b.iter(|| auto_enhance(black_box(pattern.view())).unwrap());
        });
    }

    group.finish();
}

fn bench_autocontrast(c: &mut Criterion) {
    let mut group = c.benchmark_group("autocontrast");

    for size in [64, 128, 256] {
        let pattern = random_pattern(size, size, 7);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &pattern, |b, pattern| {
            b.iter(|| autocontrast(black_box(pattern.view()), 1.0));
        });
    }

    group.finish();
}

fn bench_reduce_to_bright_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_to_bright_field");
    group.sample_size(20);

    for scan in [8, 16] {
        let dataset = random_dataset(scan, 64, 1337);
        group.throughput(Throughput::Elements((scan * scan) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(scan * scan),
            &dataset,
            |b, dataset| {
                b.iter(|| reduce_to_bright_field(black_box(dataset.view())).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_filter_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_all");
    group.sample_size(10);

    for scan in [4, 8, 16] {
        let dataset = random_dataset(scan, 64, 2718);
        group.throughput(Throughput::Elements((scan * scan) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(scan * scan),
            &dataset,
            |b, dataset| {
                b.iter(|| filter_all(black_box(dataset.view())).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_auto_enhance,
    bench_autocontrast,
    bench_reduce_to_bright_field,
    bench_filter_all
);
criterion_main!(benches);
