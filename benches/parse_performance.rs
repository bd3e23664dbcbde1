//! Type grammar benchmarks
//!
//! Measures parsing, printing and pattern matching of descriptors:
//! - scalar and fixed-shape arrays of increasing rank
//! - ragged dimensions with offset tables
//! - records and function signatures

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndforge::types::{matches, parse, parse_function, Bindings};

fn fixed_array(rank: usize) -> String {
    let mut text = String::new();
    for i in 0..rank {
        text.push_str(&format!("{} * ", i + 2));
    }
    text.push_str("float64");
    text
}

fn benchmark_parse_fixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_fixed");

    for rank in [0, 1, 2, 4, 8] {
        let text = fixed_array(rank);
        group.bench_with_input(BenchmarkId::new("rank", rank), &text, |b, text| {
            b.iter(|| black_box(parse(black_box(text)).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_parse_structured(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_structured");

    let cases = [
        ("column_major", "!3 * 4 * 5 * int32"),
        ("ragged", "var(offsets=[0, 2]) * var(offsets=[0, 3, 5]) * float32"),
        ("record", "{id : int64, position : 3 * float64, tags : (uint8, bool)}"),
        ("generic", "... * N * M * T"),
    ];
    for (name, text) in cases {
        group.bench_function(name, |b| b.iter(|| black_box(parse(black_box(text)).unwrap())));
    }

    group.bench_function("function", |b| {
        b.iter(|| black_box(parse_function(black_box("N * M * float64, M * K * float64 -> N * K * float64")).unwrap()))
    });

    group.finish();
}

fn benchmark_display(c: &mut Criterion) {
    let ty = parse("{id : int64, position : !3 * 4 * float64, tags : (uint8, bool)}").unwrap();
    c.bench_function("display_record", |b| b.iter(|| black_box(ty.to_string())));
}

fn benchmark_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");

    let candidate = parse(&fixed_array(4)).unwrap();
    let patterns = [
        ("exact", fixed_array(4)),
        ("symbolic", "A * B * C * D * float64".to_string()),
        ("ellipsis", "... * D * T".to_string()),
    ];
    for (name, pattern) in patterns {
        let pattern = parse(&pattern).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut bindings = Bindings::new();
                black_box(matches(&pattern, &candidate, &mut bindings))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_parse_fixed,
    benchmark_parse_structured,
    benchmark_display,
    benchmark_matching
);
criterion_main!(benches);
