//! Benchmarks for cublet ingestion

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use cubedb::{Config, CubletWriter, Field, FieldType, Schema};
use tempfile::TempDir;

fn event_schema() -> Schema {
    Schema::new(vec![
        Field::new("user", FieldType::UserKey),
        Field::new("action", FieldType::Text),
        Field::new("value", FieldType::Metric),
    ])
}

fn writer_benchmarks(c: &mut Criterion) {
    let records: Vec<[String; 3]> = (0..10_000)
        .map(|i| {
            [
                format!("user{}", i / 50),
                format!("action{}", i % 8),
                (i % 1000).to_string(),
            ]
        })
        .collect();

    c.bench_function("append_10k_rows", |b| {
        b.iter_batched(
            || {
                let temp = TempDir::new().unwrap();
                let config = Config::builder()
                    .output_dir(temp.path())
                    .chunk_row_limit(1024)
                    .build();
                let mut writer = CubletWriter::new(event_schema(), config).unwrap();
                writer.initialize().unwrap();
                (temp, writer)
            },
            |(_temp, mut writer)| {
                for record in &records {
                    writer.append(record).unwrap();
                }
                writer.finish().unwrap();
            },
            BatchSize::PerIteration,
        )
    });
}

criterion_group!(benches, writer_benchmarks);
criterion_main!(benches);
