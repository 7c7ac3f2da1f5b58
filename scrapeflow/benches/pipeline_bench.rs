//! Benchmarks for output aggregation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scrapeflow::core::{url_record, BaseDocument, DocumentType, Record};
use scrapeflow::executor::dedup_records;
use serde_json::json;

fn listing_records(count: usize, distinct: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let mut record = url_record(&format!("https://example.com/r/{}", i % distinct));
            record.insert("city".to_string(), json!("Oslo"));
            record
        })
        .collect()
}

fn dedup_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_records");
    for count in [100, 1_000, 10_000] {
        let records = listing_records(count, count / 2);
        group.bench_with_input(BenchmarkId::from_parameter(count), &records, |b, records| {
            b.iter(|| {
                dedup_records(
                    DocumentType::of::<BaseDocument>(),
                    black_box(records.clone()),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, dedup_benchmark);
criterion_main!(benches);
