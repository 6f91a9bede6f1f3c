//! Property extraction benchmarks.
//!
//! Measures full extraction and set-to-set distance over fragments of
//! increasing size.

#![allow(missing_docs)]

use canonize_props::{DistanceCalculator, ExtractionMode, PropertyExtractor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const SMALL: &str = "def f(n):\n    r = n * 2\n    return r\n";

fn fragment(statements: usize) -> String {
    let mut source = String::from("def f(xs):\n    out = []\n");
    for i in 0..statements {
        source.push_str(&format!(
            "    for x{i} in xs:\n        if x{i} > {i}:\n            out.append(x{i} * {i})\n"
        ));
    }
    source.push_str("    return out\n");
    source
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("props/extract");

    for mode in [ExtractionMode::Baseline, ExtractionMode::Enhanced] {
        let extractor = PropertyExtractor::new(mode);
        group.bench_with_input(BenchmarkId::new("small", format!("{mode:?}")), &SMALL, |b, s| {
            b.iter(|| extractor.extract(black_box(s)));
        });
    }

    for size in [1usize, 8, 32] {
        let source = fragment(size);
        let extractor = PropertyExtractor::default();
        group.bench_with_input(BenchmarkId::new("loops", size), &source, |b, s| {
            b.iter(|| extractor.extract(black_box(s)));
        });
    }

    group.finish();
}

fn bench_distance(c: &mut Criterion) {
    let extractor = PropertyExtractor::default();
    let a = extractor.extract(&fragment(8));
    let b = extractor.extract(&fragment(9));
    let calc = DistanceCalculator::default();

    c.bench_function("props/distance", |bench| {
        bench.iter(|| calc.distance(black_box(&a), black_box(&b)));
    });
}

criterion_group!(benches, bench_extract, bench_distance);
criterion_main!(benches);
