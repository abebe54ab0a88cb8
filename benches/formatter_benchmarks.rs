use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rask_loki_handler::app::input::parse_line;
use rask_loki_handler::formatter::LokiFormatter;
use rask_loki_handler::sender::Payload;
use rask_loki_handler::{HandlerConfig, LogRecord, Severity};

fn formatter() -> LokiFormatter {
    let settings = HandlerConfig::new("http://loki:3100")
        .with_label("app", "shop")
        .with_label("env", "prod")
        .with_context("region", "eu-west-1")
        .with_client_name("web-01")
        .with_tenant_id("acme")
        .build()
        .unwrap();
    LokiFormatter::from_settings(&settings)
}

fn sample_records(count: usize) -> Vec<LogRecord> {
    (0..count)
        .map(|i| {
            LogRecord::new(Severity::Info, format!("GET /api/orders/{i} 200"))
                .with_channel("http")
                .with_context("latency_ms", 12.5)
                .with_context("order_id", i as u64)
                .with_label("component", "api")
        })
        .collect()
}

fn benchmark_format(c: &mut Criterion) {
    let formatter = formatter();
    let record = sample_records(1).remove(0);

    c.bench_function("format_single_record", |b| {
        b.iter(|| formatter.format(std::hint::black_box(&record)));
    });
}

fn benchmark_encode_batch(c: &mut Criterion) {
    let formatter = formatter();
    let records = sample_records(500);
    let payload = Payload::new(formatter.format_batch(&records));
    let encoded_len = payload.encode().unwrap().len();

    let mut group = c.benchmark_group("push_payload");
    group.throughput(Throughput::Bytes(encoded_len as u64));

    group.bench_function("format_and_encode_500", |b| {
        b.iter(|| {
            let payload = Payload::new(formatter.format_batch(std::hint::black_box(&records)));
            payload.encode().unwrap()
        });
    });

    group.bench_function("encode_500", |b| {
        b.iter(|| std::hint::black_box(&payload).encode().unwrap());
    });

    group.finish();
}

fn benchmark_parse_input(c: &mut Criterion) {
    let plain = "2023/12/25 10:00:00 [error] upstream timed out";
    let structured = r#"{"message":"checkout failed","level":"error","context":{"cart":17}}"#;

    c.bench_function("parse_plain_line", |b| {
        b.iter(|| parse_line(std::hint::black_box(plain)));
    });
    c.bench_function("parse_json_line", |b| {
        b.iter(|| parse_line(std::hint::black_box(structured)));
    });
}

criterion_group!(
    benches,
    benchmark_format,
    benchmark_encode_batch,
    benchmark_parse_input
);
criterion_main!(benches);
