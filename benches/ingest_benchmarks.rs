// SPDX-License-Identifier: PMPL-1.0-or-later
//! Benchmarks for the ingestion hot path
//!
//! Measures event normalization, partition assignment and batch commits
//! against the in-memory and redb stores.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use tokio::runtime::Runtime;
use xlog_core::{Batch, LogEntry, Normalizer, Partitioner};
use xlog_store::{commit_batch, InMemoryStore, PartitionedStore, RedbStore};

fn sample_payload(i: usize) -> Vec<u8> {
    json!({
        "@timestamp": "2024-03-05T10:15:00.123Z",
        "@metadata": {"beat": "filebeat", "version": "8.12.0"},
        "message": format!("GET /api/items/{i} 200 {}ms", i % 97),
        "beat": {"hostname": format!("web-{}", i % 8)},
        "log": {"file": {"path": "/var/log/nginx/access.log"}},
        "offset": i * 120,
    })
    .to_string()
    .into_bytes()
}

fn sample_entries(n: usize, days: i64) -> Vec<LogEntry> {
    let normalizer = Normalizer::default();
    let base = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
    (0..n)
        .filter_map(|i| {
            let entry = normalizer.normalize_bytes(&sample_payload(i))?;
            let ts = base + Duration::hours((i as i64 * 24 * days) / n as i64);
            Some(LogEntry::new(ts, entry.fields().clone()))
        })
        .collect()
}

fn build_batch(store: &impl PartitionedStore, entries: &[LogEntry]) -> Batch<()> {
    let mut batch = Batch::new();
    for entry in entries {
        batch.accumulate(store.partition_for(entry.timestamp()), entry.clone(), ());
    }
    batch
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let normalizer = Normalizer::default();
    let payload = sample_payload(42);
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("filebeat_event", |b| {
        b.iter(|| normalizer.normalize_bytes(black_box(&payload)))
    });
    group.bench_function("malformed", |b| {
        b.iter(|| normalizer.normalize_bytes(black_box(b"{\"@timestamp\": \"2024-")))
    });
    group.finish();
}

fn bench_partition(c: &mut Criterion) {
    let partitioner = Partitioner::new("xlog");
    let ts = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap();

    c.bench_function("partition_for", |b| {
        b.iter(|| partitioner.partition_for(black_box(ts)))
    });
}

fn bench_commit_in_memory(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("commit_in_memory");

    for size in [100, 1000] {
        let entries = sample_entries(size, 3);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.to_async(&rt).iter(|| async {
                let store = InMemoryStore::new(Partitioner::new("xlog"));
                let batch = build_batch(&store, entries);
                commit_batch(&store, &batch).await.unwrap()
            });
        });
    }
    group.finish();
}

fn bench_commit_redb(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = RedbStore::open(dir.path().join("bench.redb"), Partitioner::new("xlog")).unwrap();
    let mut group = c.benchmark_group("commit_redb");
    group.sample_size(20);

    for size in [100, 1000] {
        let entries = sample_entries(size, 3);
        let batch = build_batch(&store, &entries);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.to_async(&rt)
                .iter(|| async { commit_batch(&store, batch).await.unwrap() });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_normalize,
    bench_partition,
    bench_commit_in_memory,
    bench_commit_redb,
);
criterion_main!(benches);
