//! Performance benchmarks for line parsing
//!
//! Run with: cargo bench

use apel_boinc::ingest::{CollectorSink, Ingestor};
use apel_boinc::{BoincParser, ParserSettings, RecordKind};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::io::Cursor;

/// Generate accounting log content with the specified number of lines
fn generate_log(num_lines: usize, include_errors: bool) -> String {
    let mut lines = Vec::with_capacity(num_lines);

    for i in 0..num_lines {
        if include_errors && i % 10 == 5 {
            lines.push("truncated line".to_string());
        } else {
            lines.push(format!(
                "{} ue {:.1} ct {:.2} fe {} nm wu_{}_task_{} et {:.2} es 0",
                1_700_000_000 + i,
                (i % 7) as f64 * 1.5,
                100.0 + (i % 500) as f64 * 0.37,
                i * 1_000_000,
                i,
                i % 4,
                120.0 + (i % 300) as f64 * 0.41,
            ));
        }
    }

    lines.join("\n")
}

fn parser(kind: RecordKind, checkpoint: i64) -> BoincParser {
    let settings = ParserSettings::new("BENCH-SITE", "ce.example.org", "node1");
    BoincParser::new(kind, settings, checkpoint).unwrap()
}

fn benchmark_single_line(c: &mut Criterion) {
    let line = "1700000000 ue 12.5 ct 360 fe 0 nm JOBLABEL12345 et 300 es 0";
    let batch = parser(RecordKind::Batch, 0);
    let blah = parser(RecordKind::Blah, 0);
    let skipping = parser(RecordKind::Batch, 1_800_000_000);

    c.bench_function("parse_execution_line", |b| {
        b.iter(|| batch.parse(black_box(line)))
    });
    c.bench_function("parse_submission_line", |b| {
        b.iter(|| blah.parse(black_box(line)))
    });
    c.bench_function("skip_checkpointed_line", |b| {
        b.iter(|| skipping.parse(black_box(line)))
    });
}

fn benchmark_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_reader");

    for size in [100, 1000, 10000].iter() {
        let content = generate_log(*size, true);
        let batch = parser(RecordKind::Batch, 0);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut sink = CollectorSink::new();
                Ingestor::new(&batch)
                    .ingest_reader(Cursor::new(black_box(content.as_bytes())), &mut sink)
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_single_line, benchmark_ingest);
criterion_main!(benches);
