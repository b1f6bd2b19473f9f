//! # chatsync-sim
//!
//! Simulated chat client: synthetic subscriptions feed the state engine while
//! a set of consumers watch snapshots through a lifecycle-bound controller.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! chatsync-sim
//!
//! # Run with a config file in the working directory
//! cp chatsync.example.toml chatsync.toml && chatsync-sim
//!
//! # Run with environment variables
//! CHATSYNC_USER=danielle CHATSYNC_ROOMS=20 chatsync-sim
//! ```

mod config;
mod driver;
mod metrics;
mod producers;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatsync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!(
        user = %config.simulation.user_id,
        rooms = config.simulation.rooms,
        "Starting chatsync simulation"
    );

    // Initialize metrics
    metrics::init_metrics();

    let report = driver::run_simulation(config).await?;
    if report.interrupted {
        tracing::warn!("Simulation interrupted before producers finished");
    }

    Ok(())
}
