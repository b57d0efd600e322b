use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use roundtrip::headers::{HeaderClass, parse_header_block};

fn header_block(lines: usize) -> String {
    (0..lines)
        .map(|i| match i % 3 {
            0 => format!("X-Custom-{i}: value {i}"),
            1 => format!("Content-Language: lang-{i}"),
            _ => "Content-Type: application/json; charset=utf-8".to_string(),
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn bench_parse_header_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_header_block");

    for lines in [1, 8, 64, 512] {
        let block = header_block(lines);
        group.throughput(Throughput::Bytes(block.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &block, |b, block| {
            b.iter(|| parse_header_block(black_box(block)).map(|headers| headers.len()))
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let names = ["Content-Type", "content-encoding", "X-Request-Id", "Accept", "Content"];

    c.bench_function("header_class_of", |b| {
        b.iter(|| {
            names
                .iter()
                .filter(|name| HeaderClass::of(black_box(name)) == HeaderClass::RequestMetadata)
                .count()
        })
    });
}

criterion_group!(benches, bench_parse_header_block, bench_classify);
criterion_main!(benches);
