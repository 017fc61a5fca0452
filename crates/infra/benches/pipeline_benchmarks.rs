use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use eventgate_events::{canonicalize, SchemaValidator};
use eventgate_infra::{
    DedupCache, DedupConfig, EventPublisher, InMemoryEventStore, StreamReplayer, TtlDedupCache,
};
use serde_json::json;
use std::sync::Arc;

const STREAM: &str = "cricket_events_v1";

fn publisher() -> EventPublisher<Arc<InMemoryEventStore>> {
    let store = Arc::new(InMemoryEventStore::new());
    let cache = Arc::new(TtlDedupCache::new(DedupConfig::default()).unwrap());
    EventPublisher::new(store, STREAM, cache)
}

fn delivery_schema() -> Arc<SchemaValidator> {
    let validator = SchemaValidator::from_value(json!({
        "type": "object",
        "required": ["type", "id"],
        "properties": {
            "type": { "type": "string", "enum": ["delivery", "wicket"] },
            "id": { "type": "string", "minLength": 1 },
            "runs": { "type": "integer", "minimum": 0, "maximum": 6 }
        }
    }))
    .unwrap();
    Arc::new(validator)
}

fn bench_publish_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_latency");

    // Every iteration appends; no cache involvement.
    group.bench_function("typed_without_dedup", |b| {
        let publisher = publisher();
        b.iter(|| {
            let event = json!({"type": "delivery", "id": "abc", "runs": 4});
            black_box(publisher.publish(&event, false).unwrap());
        });
    });

    // Unique events: fingerprint + insert on every call.
    group.bench_function("typed_with_dedup", |b| {
        let publisher = publisher();
        let mut n: u64 = 0;
        b.iter(|| {
            n += 1;
            let event = json!({"type": "delivery", "id": n.to_string(), "runs": 4});
            black_box(publisher.publish(&event, true).unwrap());
        });
    });

    // Same event over and over: the duplicate rejection path.
    group.bench_function("duplicate_rejection", |b| {
        let publisher = publisher();
        let event = json!({"type": "delivery", "id": "abc", "runs": 4});
        publisher.publish(&event, true).unwrap();
        b.iter(|| {
            black_box(publisher.publish(&event, true).is_err());
        });
    });

    group.bench_function("raw_validated_without_dedup", |b| {
        let publisher = publisher().with_validator(delivery_schema());
        b.iter(|| {
            black_box(
                publisher
                    .publish_raw(r#"{"type":"delivery","id":"abc","runs":4}"#, false)
                    .unwrap(),
            );
        });
    });

    group.finish();
}

fn bench_dedup_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_lookup");

    for size in [100, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("hit", size), size, |b, &size| {
            let cache = TtlDedupCache::new(DedupConfig::default()).unwrap();
            for i in 0..size {
                let canonical = canonicalize(&json!({"id": i})).unwrap();
                cache.insert(canonical.fingerprint());
            }
            let needle = canonicalize(&json!({"id": size / 2})).unwrap().fingerprint();

            b.iter(|| black_box(cache.lookup(&needle)));
        });
    }

    group.finish();
}

fn bench_replay_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay_throughput");

    for stream_len in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*stream_len as u64));
        group.bench_with_input(
            BenchmarkId::new("read_all", stream_len),
            stream_len,
            |b, &len| {
                let store = InMemoryEventStore::new();
                for i in 0..len {
                    store.append_raw(
                        STREAM,
                        "cricket_event",
                        format!(r#"{{"type":"delivery","id":"ball-{i}","runs":{}}}"#, i % 7)
                            .into_bytes(),
                    );
                }
                let replayer = StreamReplayer::new(store);

                b.iter(|| black_box(replayer.read_all(STREAM).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_publish_latency,
    bench_dedup_lookup,
    bench_replay_throughput
);
criterion_main!(benches);
