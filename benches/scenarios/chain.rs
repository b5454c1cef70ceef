//! Benchmarks for rendering a realized playback graph.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_station::graph::{AnalysisTap, AudioGraph, MediaSource, SourceNode};
use saavy_station::{ChainRecipe, GraphBuilder, FFT_SIZE};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

/// Source → chain → analyser → destination, with the source already playing.
fn playback_graph(recipe: &ChainRecipe) -> AudioGraph {
    let mut graph = AudioGraph::new();
    let tap = AnalysisTap::install(&mut graph, FFT_SIZE).expect("tap");
    let destination = graph.destination();
    graph.connect(tap.node(), destination).expect("tap to destination");

    let mut builder = GraphBuilder::seeded(7);
    let instance = builder
        .build(&mut graph, recipe, Some(&tap))
        .expect("chain builds");

    // One second of a 220 Hz tone
    let samples = (0..SAMPLE_RATE as usize)
        .map(|i| (i as f32 * 220.0 * std::f32::consts::TAU / SAMPLE_RATE).sin() * 0.8)
        .collect();
    let media = MediaSource::new(samples, SAMPLE_RATE);
    media.set_looping(true);
    media.play();
    let source = graph.add_node(SourceNode::new(media));
    graph.connect(source, instance.entry()).expect("source to entry");
    graph
}

pub fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/chain");

    let recipes = [
        ("dry", ChainRecipe::default_chain().with_probability(0.0)),
        ("full_chain", ChainRecipe::default_chain().with_probability(1.0)),
        ("dry_fx_mix", ChainRecipe::dry_fx_mix().with_probability(1.0)),
    ];

    for &size in BLOCK_SIZES {
        let mut out = vec![0.0f32; size];
        for (name, recipe) in &recipes {
            let mut graph = playback_graph(recipe);
            group.bench_with_input(BenchmarkId::new(*name, size), &size, |b, _| {
                b.iter(|| graph.render(black_box(&mut out), black_box(SAMPLE_RATE)))
            });
        }
    }

    group.finish();
}
