//! Benchmarks for the translation hot path.
//!
//! Measures validation, query-string encoding and JSON answer decoding.

use criterion::{BenchmarkId, Criterion, Throughput, black_box};
use hickory_proto::op::{Message, Query};
use hickory_proto::rr::{Name, RecordType};
use std::str::FromStr;

use dohrelay::config::RelayConfig;
use dohrelay::doh;
use dohrelay::validate::validate;

fn request(name: &str) -> Message {
    let mut msg = Message::new();
    msg.set_id(0x1234).set_recursion_desired(true);
    msg.add_query(Query::query(Name::from_str(name).unwrap(), RecordType::A));
    msg
}

fn answer_body(count: usize) -> Vec<u8> {
    let answers: Vec<String> = (0..count)
        .map(|i| {
            format!(
                r#"{{"name":"example.com.","type":1,"TTL":300,"data":"10.0.{}.{}"}}"#,
                i / 256,
                i % 256
            )
        })
        .collect();
    format!(r#"{{"Status":0,"RA":true,"Answer":[{}]}}"#, answers.join(",")).into_bytes()
}

fn bench_encode(c: &mut Criterion) {
    let config = RelayConfig {
        checking_disabled: true,
        edns_disable: true,
        ..RelayConfig::default()
    };
    let msg = request("www.example.com.");

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("validate", |b| b.iter(|| validate(black_box(&msg)).is_ok()));

    group.bench_function("query_string", |b| {
        let question = &msg.queries()[0];
        b.iter(|| doh::encode(black_box(question), &config, false))
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let msg = request("example.com.");

    let mut group = c.benchmark_group("decode");

    for count in [1usize, 8, 64] {
        let body = answer_body(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("answers", count), &body, |b, body| {
            b.iter(|| doh::decode(black_box(body), &msg).unwrap())
        });
    }

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default().configure_from_args();
    bench_encode(&mut criterion);
    bench_decode(&mut criterion);
    criterion.final_summary();
}
