//! Event bus dispatch benchmark suite.
//!
//! Measures dispatch cost at different subscriber counts:
//! - Exact-name handlers only
//! - Exact plus wildcard handlers
//! - Waiter registration and settlement
//!
//! Run with: cargo bench --bench event_bus
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use realtime_client::{Event, EventBus};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const HANDLER_COUNTS: &[usize] = &[1, 10, 100];

fn sample_event() -> Event {
    Event::decode(r#"{"type":"response.output_text.delta","delta":"hello","event_id":"evt_1"}"#)
        .expect("valid event")
}

fn counting_bus(event_name: &str, count: usize) -> (EventBus, Arc<AtomicUsize>) {
    let bus = EventBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    for _ in 0..count {
        let hits = Arc::clone(&hits);
        bus.on(event_name, move |_| {
            hits.fetch_add(1, Ordering::Relaxed);
        });
    }
    (bus, hits)
}

// ============================================================================
// Benchmark: Exact Dispatch
// ============================================================================

fn bench_exact_dispatch(c: &mut Criterion) {
    let event = sample_event();
    let mut group = c.benchmark_group("dispatch_exact");

    for &count in HANDLER_COUNTS {
        let (bus, _hits) = counting_bus("server.response.output_text.delta", count);
        group.bench_with_input(BenchmarkId::new("handlers", count), &count, |b, _| {
            b.iter(|| bus.dispatch(black_box("server.response.output_text.delta"), &event));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Exact + Wildcard Dispatch
// ============================================================================

fn bench_wildcard_dispatch(c: &mut Criterion) {
    let event = sample_event();
    let mut group = c.benchmark_group("dispatch_wildcard");

    for &count in HANDLER_COUNTS {
        let (bus, hits) = counting_bus("server.response.output_text.delta", count);
        for _ in 0..count {
            let hits = Arc::clone(&hits);
            bus.on("server.*", move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            });
        }
        group.bench_with_input(BenchmarkId::new("handlers", count * 2), &count, |b, _| {
            b.iter(|| bus.dispatch(black_box("server.response.output_text.delta"), &event));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Waiters
// ============================================================================

fn bench_waiter_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let event = sample_event();
    let bus = EventBus::new();
    let (bus, event) = (&bus, &event);

    c.bench_function("waiter_round_trip", |b| {
        b.to_async(&rt).iter(|| async move {
            let waiter = bus.wait_for_next("server.response.done", None);
            bus.dispatch("server.response.done", event);
            black_box(waiter.await)
        });
    });
}

criterion_group!(
    benches,
    bench_exact_dispatch,
    bench_wildcard_dispatch,
    bench_waiter_round_trip
);
criterion_main!(benches);
