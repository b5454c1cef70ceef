//! Benchmarks for the compressor used both as a stage and as the mix limiter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_station::dsp::dynamics::Compressor;
use saavy_station::recipe::{LIMITER_ATTACK_S, LIMITER_RATIO, LIMITER_RELEASE_S, LIMITER_THRESHOLD_DB};

use crate::BLOCK_SIZES;

pub fn bench_dynamics(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/dynamics");

    for &size in BLOCK_SIZES {
        // Loud enough to sit above both thresholds
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.05).sin() * 0.9).collect();

        let mut compressor = Compressor::new(-24.0, 4.0, 0.01, 0.2);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("compressor", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                compressor.render(black_box(&mut buffer), black_box(48_000.0));
            })
        });

        let mut limiter = Compressor::new(
            LIMITER_THRESHOLD_DB,
            LIMITER_RATIO,
            LIMITER_ATTACK_S,
            LIMITER_RELEASE_S,
        );
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("limiter", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                limiter.render(black_box(&mut buffer), black_box(48_000.0));
            })
        });
    }

    group.finish();
}
