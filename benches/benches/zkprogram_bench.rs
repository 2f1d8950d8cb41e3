//! ZkProgram Performance Benchmarks
//!
//! Benchmarks for the program pipeline on the reference backend:
//! - Method analysis and compilation
//! - Proof generation for growing witness counts
//! - Recursive proving depth
//! - Verification and JSON interchange

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::executor::block_on;
use zkprogram::Proof;
use zkprogram_benches::{
    counter_program, prove_counter, range_sum_args, range_sum_program, BenchmarkConfig,
};

/// Benchmark analysis and compilation for different witness counts
fn bench_compile(c: &mut Criterion) {
    let config = BenchmarkConfig::default();
    let mut group = c.benchmark_group("compile");

    for size in config.sizes.iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("analyze", size), size, |b, &size| {
            let program = range_sum_program(size);
            b.iter(|| block_on(program.analyze_methods()).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("compile", size), size, |b, &size| {
            let program = range_sum_program(size);
            b.iter(|| block_on(program.compile()).unwrap());
        });
    }
    group.finish();
}

/// Benchmark proof generation for different witness counts
fn bench_prove(c: &mut Criterion) {
    let config = BenchmarkConfig::default();
    let mut group = c.benchmark_group("prove");

    for size in config.sizes.iter() {
        let program = range_sum_program(*size);
        block_on(program.compile()).unwrap();
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("range_sum", size), size, |b, &size| {
            b.iter(|| block_on(program.prove("sum", (), range_sum_args(size))).unwrap());
        });
    }
    group.finish();
}

/// Benchmark recursive proving at different depths
fn bench_recursion(c: &mut Criterion) {
    let config = BenchmarkConfig::default();
    let mut group = c.benchmark_group("recursion");
    group.sample_size(10);

    let program = counter_program();
    block_on(program.compile()).unwrap();
    for depth in config.depths.iter() {
        group.bench_with_input(BenchmarkId::new("counter", depth), depth, |b, &depth| {
            b.iter(|| block_on(prove_counter(&program, depth)).unwrap());
        });
    }
    group.finish();
}

/// Benchmark verification and JSON round trips
fn bench_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify");

    let program = counter_program();
    block_on(program.compile()).unwrap();
    let proof = block_on(prove_counter(&program, 2)).unwrap();
    let json = proof.to_json().unwrap();
    let class = program.self_proof_class();

    group.bench_function("verify", |b| {
        b.iter(|| block_on(program.verify(&proof)).unwrap())
    });
    group.bench_function("to_json", |b| b.iter(|| proof.to_json().unwrap()));
    group.bench_function("from_json", |b| {
        b.iter(|| Proof::from_json(&class, &json).unwrap())
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_compile,
    bench_prove,
    bench_recursion,
    bench_verify
);
criterion_main!(benches);
