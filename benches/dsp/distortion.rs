//! Benchmarks for waveshaping and bit reduction.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_station::dsp::distortion::{self, ShaperCurve};

use crate::BLOCK_SIZES;

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        for (name, curve) in [
            ("soft", ShaperCurve::Soft),
            ("hard", ShaperCurve::Hard),
            ("foldback", ShaperCurve::Foldback),
        ] {
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    distortion::shape_buffer(
                        black_box(&mut buffer),
                        curve,
                        black_box(4.0),
                        black_box(0.8),
                    );
                })
            });
        }

        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("bitcrush", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                distortion::bitcrush_buffer(black_box(&mut buffer), black_box(8));
            })
        });
    }

    group.finish();
}
