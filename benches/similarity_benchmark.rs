use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use snomed_semsim::algo::{Measure, SemanticEngine};
use snomed_semsim::graph::{Concept, ConceptGraph, ConceptId, GraphBuilder, Relationship, IS_A, ROOT_CONCEPT};
use snomed_semsim::loader::LoadedRelease;
use snomed_semsim::matrix::MatrixAssembler;

/// Random multi-parent hierarchy of `size` concepts under the root
fn hierarchy(size: u64) -> ConceptGraph {
    let mut rng = StdRng::seed_from_u64(42);
    let ids: Vec<ConceptId> = std::iter::once(ROOT_CONCEPT)
        .chain((1..size).map(|i| ConceptId(1_000_000 + i)))
        .collect();

    let mut relationships = Vec::new();
    for i in 1..ids.len() {
        // bias parents toward recent concepts so the hierarchy gets deep
        let window = i.min(50);
        for _ in 0..rng.gen_range(1..=2) {
            let parent = ids[i - rng.gen_range(1..=window)];
            relationships.push(Relationship::new(relationships.len() as u64 + 1, ids[i], parent, IS_A));
        }
    }

    let concepts = ids.into_iter().map(Concept::new).collect();
    GraphBuilder::default()
        .build(&LoadedRelease::from_parts(concepts, relationships))
        .unwrap()
}

/// Benchmark graph construction
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    group.sample_size(10);

    for size in [10_000u64, 50_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| hierarchy(size));
        });
    }
    group.finish();
}

/// Benchmark single-pair queries on a warm cache
fn bench_pair(c: &mut Criterion) {
    let graph = hierarchy(50_000);
    let engine = SemanticEngine::new(&graph);
    let ids: Vec<ConceptId> = graph.concepts().iter().map(|c| c.id).collect();
    let mut rng = StdRng::seed_from_u64(1);
    let pairs: Vec<(ConceptId, ConceptId)> = (0..1000)
        .map(|_| (ids[rng.gen_range(0..ids.len())], ids[rng.gen_range(0..ids.len())]))
        .collect();

    let mut group = c.benchmark_group("pair");
    for measure in [Measure::ShortestPath, Measure::WuPalmer, Measure::Lin, Measure::BatetSanchezValls] {
        group.bench_function(measure.name(), |b| {
            b.iter(|| {
                for &(x, y) in &pairs {
                    let _ = engine.score(measure, x, y);
                }
            });
        });
    }
    group.finish();
}

/// Benchmark full matrix assembly from a cold cache
fn bench_matrix(c: &mut Criterion) {
    let graph = hierarchy(50_000);
    let ids: Vec<ConceptId> = graph.concepts().iter().map(|c| c.id).step_by(250).collect();

    let mut group = c.benchmark_group("matrix");
    group.sample_size(10);
    group.bench_function(BenchmarkId::new("shortest_path", ids.len()), |b| {
        b.iter(|| {
            let engine = SemanticEngine::new(&graph);
            MatrixAssembler::new(&engine)
                .assemble_ids(&ids, Measure::ShortestPath)
                .unwrap()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_pair, bench_matrix);
criterion_main!(benches);
