//! Benchmarks for marker payload extraction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use siteforge::marker::{extract, MarkerPair};

fn noisy_stream() -> String {
    let mut stream = String::new();
    for i in 0..200 {
        stream.push_str(&format!("[Services] log line {i} with some padding text\n"));
    }
    stream.push_str("SERVICE_JSON_START\n");
    stream.push_str(
        r#"{"residential": [{"id": "roof-repair", "name": "Roof Repair", "blocks": [1, 2, 3]}]}"#,
    );
    stream.push_str("\nSERVICE_JSON_END\n");
    for i in 0..50 {
        stream.push_str(&format!("[Services] trailing line {i}\n"));
    }
    stream
}

fn marker_benchmark(c: &mut Criterion) {
    let stream = noisy_stream();
    let pair = MarkerPair::for_token("SERVICE_JSON");

    c.bench_function("extract_noisy", |b| {
        b.iter(|| extract(black_box(&stream), black_box(&pair)))
    });
}

criterion_group!(benches, marker_benchmark);
criterion_main!(benches);
