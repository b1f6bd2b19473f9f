//! Simulation driver.
//!
//! Wires the producers, the store, and the consumers together and runs them
//! until the producers finish or the process is interrupted.

use crate::config::{Config, SimulationConfig};
use crate::metrics::{self, ConsumerMetricsGuard};
use crate::producers::{Step, PRODUCERS};
use anyhow::Result;
use chatsync_core::{
    Action, Consumer, LifecycleController, LifecycleObserver, LifecyclePhase, LifecycleSignal,
    Snapshot, Store,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Number of committed dispatches.
    pub version: u64,
    /// Rooms joined at the end.
    pub rooms: usize,
    /// Cursors held at the end.
    pub cursors: usize,
    /// Users online at the end.
    pub online: usize,
    /// Snapshots delivered, per consumer.
    pub deliveries: Vec<u64>,
    /// Whether the run was cut short.
    pub interrupted: bool,
}

/// Run the simulation.
///
/// # Errors
///
/// Returns an error if a producer or consumer task panics.
pub async fn run_simulation(config: Config) -> Result<Report> {
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let store = Arc::new(Store::with_config(config.engine.clone()));
    let controller = store.lifecycle_controller();
    let (shutdown, shutdown_rx) = watch::channel(false);

    let mut consumers = JoinSet::new();
    for index in 0..config.simulation.consumers {
        let consumer = controller.attach();
        consumers.spawn(run_consumer(index, consumer));
    }

    set_visibility(&controller, LifecycleSignal::Activate);
    let visibility = tokio::spawn(toggle_visibility(
        controller.clone(),
        config.simulation.clone(),
        shutdown_rx,
    ));

    let mut producers = JoinSet::new();
    for (name, step) in PRODUCERS {
        producers.spawn(run_producer(
            name,
            step,
            Arc::clone(&store),
            config.simulation.clone(),
        ));
    }
    info!(
        producers = PRODUCERS.len(),
        consumers = config.simulation.consumers,
        "Simulation started"
    );

    let interrupted = tokio::select! {
        result = drain(&mut producers) => {
            result?;
            false
        }
        () = interrupt() => {
            warn!("Interrupted, stopping producers");
            producers.abort_all();
            true
        }
    };

    let _ = shutdown.send(true);
    visibility.await?;
    // Ends every consumer stream
    set_visibility(&controller, LifecycleSignal::Destroy);
    if let Some(e) = controller.last_failure() {
        metrics::record_error("upstream");
        warn!(error = %e, "Snapshot upstream failed during run");
    }

    let mut deliveries = vec![0; config.simulation.consumers];
    while let Some(joined) = consumers.join_next().await {
        let (index, delivered) = joined?;
        deliveries[index] = delivered;
    }

    let snapshot = store.current_snapshot();
    let report = Report {
        version: store.version(),
        rooms: snapshot.rooms().len(),
        cursors: snapshot.cursors().len(),
        online: snapshot.presence().online().len(),
        deliveries,
        interrupted,
    };
    info!(
        version = report.version,
        rooms = report.rooms,
        cursors = report.cursors,
        online = report.online,
        deliveries = ?report.deliveries,
        "Simulation finished"
    );
    Ok(report)
}

async fn drain(producers: &mut JoinSet<()>) -> Result<()> {
    while let Some(finished) = producers.join_next().await {
        finished?;
    }
    Ok(())
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Run one producer to completion, preserving its own order.
async fn run_producer(name: &'static str, step: Step, store: Arc<Store>, sim: SimulationConfig) {
    let mut ticker = tokio::time::interval(sim.producer_interval());
    let mut dispatched = 0usize;

    for index in 0..sim.events_per_producer {
        ticker.tick().await;
        let snapshot = store.current_snapshot();
        for action in step(&sim, &snapshot, index) {
            if dispatch(&store, action) {
                dispatched += 1;
            }
        }
    }

    info!(producer = name, dispatched, "Producer finished");
}

fn dispatch(store: &Store, action: Action) -> bool {
    let kind = action.kind();
    let started = Instant::now();
    match store.dispatch(action) {
        Ok(_) => {
            metrics::record_action(kind.as_str(), started.elapsed().as_secs_f64());
            true
        }
        Err(e) => {
            warn!(kind = %kind, error = %e, "Dispatch failed");
            metrics::record_error("reduce");
            false
        }
    }
}

/// Drain one consumer until its stream ends.
async fn run_consumer(index: usize, mut consumer: Consumer<Arc<Snapshot>>) -> (usize, u64) {
    let _metrics_guard = ConsumerMetricsGuard::new();
    let label = format!("consumer-{index}");
    let mut delivered = 0;

    while let Some(snapshot) = consumer.recv().await {
        delivered += 1;
        metrics::record_delivery(&label);
        debug!(
            consumer = index,
            rooms = snapshot.rooms().len(),
            cursors = snapshot.cursors().len(),
            "Snapshot delivered"
        );
    }

    debug!(consumer = index, delivered, "Consumer stream ended");
    (index, delivered)
}

fn phase_label(phase: LifecyclePhase) -> &'static str {
    match phase {
        LifecyclePhase::Active => "active",
        LifecyclePhase::Inactive => "inactive",
        LifecyclePhase::Closed => "closed",
    }
}

fn set_visibility(controller: &LifecycleController<Arc<Snapshot>>, signal: LifecycleSignal) {
    let before = controller.phase();
    controller.on_signal(signal);
    let after = controller.phase();
    if before != after {
        metrics::record_transition(phase_label(after));
    }
}

/// Flip the simulated screen between visible and hidden.
async fn toggle_visibility(
    controller: LifecycleController<Arc<Snapshot>>,
    sim: SimulationConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(sim.visibility_interval());
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let signal = match controller.phase() {
                    LifecyclePhase::Active => LifecycleSignal::Deactivate,
                    LifecyclePhase::Inactive => LifecycleSignal::Activate,
                    LifecyclePhase::Closed => break,
                };
                set_visibility(&controller, signal);
            }
            _ = shutdown.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_core::{Emitter, SubscriptionHandle};

    fn quick_config() -> Config {
        let mut config = Config::default();
        config.simulation.user_id = "danielle".to_string();
        config.simulation.rooms = 4;
        config.simulation.events_per_producer = 60;
        config.simulation.producer_interval_ms = 1;
        config.simulation.visibility_interval_ms = 7;
        config.simulation.consumers = 2;
        config
    }

    #[tokio::test]
    async fn test_simulation_runs_to_completion() {
        let config = quick_config();
        let report = run_simulation(config.clone()).await.unwrap();

        assert!(!report.interrupted);
        assert!(report.version >= 3 * config.simulation.events_per_producer as u64);
        assert_eq!(report.rooms, config.simulation.rooms);
        assert_eq!(report.deliveries.len(), 2);
        assert!(report.deliveries.iter().all(|&d| d > 0));
    }

    #[test]
    fn test_set_visibility_ignores_repeated_signal() {
        let controller = LifecycleController::new("test", |_emitter: Emitter<Arc<Snapshot>>| {
            SubscriptionHandle::noop("test")
        });
        set_visibility(&controller, LifecycleSignal::Activate);
        set_visibility(&controller, LifecycleSignal::Activate);
        assert_eq!(controller.phase(), LifecyclePhase::Active);
        set_visibility(&controller, LifecycleSignal::Deactivate);
        assert_eq!(controller.phase(), LifecyclePhase::Inactive);
    }

    #[tokio::test]
    async fn test_destroy_ends_consumer() {
        let controller = LifecycleController::new("test", |_emitter: Emitter<Arc<Snapshot>>| {
            SubscriptionHandle::noop("test")
        });
        let consumer = tokio::spawn(run_consumer(0, controller.attach()));
        set_visibility(&controller, LifecycleSignal::Activate);
        set_visibility(&controller, LifecycleSignal::Destroy);

        assert_eq!(controller.phase(), LifecyclePhase::Closed);
        let (index, delivered) = consumer.await.unwrap();
        assert_eq!((index, delivered), (0, 0));
    }
}
