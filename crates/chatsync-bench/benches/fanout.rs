//! Fan-out benchmarks.
//!
//! These benchmarks measure delivery through the multiplexer and the cost of
//! lifecycle transitions.

use chatsync_bench::populated_store;
use chatsync_core::{
    Action, Emitter, LifecycleController, Multiplexer, PresenceState, SubscriptionHandle,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A multiplexer whose upstream emitter is handed back to the benchmark.
fn captured_multiplexer() -> (Multiplexer<u64>, Arc<Mutex<Option<Emitter<u64>>>>) {
    let slot: Arc<Mutex<Option<Emitter<u64>>>> = Arc::default();
    let captured = Arc::clone(&slot);
    let mux = Multiplexer::new("bench", move |emitter: Emitter<u64>| {
        if let Ok(mut slot) = captured.lock() {
            *slot = Some(emitter);
        }
        SubscriptionHandle::noop("bench")
    });
    (mux, slot)
}

/// Benchmark emit + receive across consumer counts.
fn bench_multiplexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiplexer");

    for consumers in [1, 10, 100] {
        group.throughput(Throughput::Elements(consumers as u64));
        group.bench_function(BenchmarkId::new("emit_and_drain", consumers), |b| {
            let (mux, slot) = captured_multiplexer();
            let mut attached: Vec<_> = (0..consumers).map(|_| mux.attach()).collect();
            let emitter = slot.lock().ok().and_then(|e| e.clone());
            let Some(emitter) = emitter else {
                return;
            };

            let mut value = 0u64;
            b.iter(|| {
                value += 1;
                emitter.emit(black_box(value));
                for consumer in &mut attached {
                    black_box(consumer.try_recv());
                }
            });
        });
    }

    group.finish();
}

/// Benchmark attach/detach churn, which starts and stops the upstream.
fn bench_attach_detach(c: &mut Criterion) {
    let mut group = c.benchmark_group("attach_detach");

    group.bench_function("first_and_last", |b| {
        let (mux, _slot) = captured_multiplexer();
        b.iter(|| mux.attach().unsubscribe());
    });

    group.bench_function("with_resident_consumer", |b| {
        let (mux, _slot) = captured_multiplexer();
        let _resident = mux.attach();
        b.iter(|| mux.attach().unsubscribe());
    });

    group.finish();
}

/// Benchmark lifecycle activate/deactivate cycles.
fn bench_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle");

    group.bench_function("activate_deactivate", |b| {
        let controller = LifecycleController::new("bench", |_emitter: Emitter<u64>| {
            SubscriptionHandle::noop("bench")
        });
        let _consumer = controller.attach();
        b.iter(|| {
            controller.activate();
            controller.deactivate();
        });
    });

    group.finish();
}

/// Benchmark commit-to-delivery latency through a store-backed multiplexer.
fn bench_store_delivery(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_delivery");
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return;
    };

    group.bench_function("dispatch_to_consumer", |b| {
        b.iter_custom(|iters| {
            runtime.block_on(async {
                let store = Arc::new(populated_store(50));
                let mux = store.multiplexer();
                let mut consumer = mux.attach();
                let _ = consumer.recv().await;

                let start = Instant::now();
                for i in 0..iters {
                    let state = if i % 2 == 0 {
                        PresenceState::Online
                    } else {
                        PresenceState::Offline
                    };
                    let _ = store.dispatch(Action::presence("carol", state));
                    black_box(consumer.recv().await);
                }
                start.elapsed()
            })
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_multiplexer,
    bench_attach_detach,
    bench_lifecycle,
    bench_store_delivery
);
criterion_main!(benches);
