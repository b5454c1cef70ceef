//! Benchmarks for the filter responses chain stages use.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_station::dsp::filter::SVFilter;
use saavy_station::graph::RenderCtx;

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");
    let ctx = RenderCtx::new(48_000.0);

    for &size in BLOCK_SIZES {
        let ramp: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        let stages = [
            ("lowpass", SVFilter::lowpass(1_200.0), 0.5),
            ("highpass", SVFilter::highpass(80.0), 0.2),
            ("allpass", SVFilter::allpass(1_000.0), 0.0),
        ];
        for (name, mut filter, resonance) in stages {
            filter.set_resonance(resonance);
            let mut buffer = ramp.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&ramp);
                    filter.render(black_box(&mut buffer), black_box(&ctx));
                })
            });
        }
    }

    group.finish();
}
