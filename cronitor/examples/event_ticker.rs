//! Report a polling loop to Cronitor as an aggregated event.
//!
//! ```text
//! CRONITOR_API_KEY=... cargo run --example event_ticker -- status-poller
//! ```

use std::time::Duration;

use anyhow::Result;
use cronitor::{Cronitor, EventOptions};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "cronitor=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let key = std::env::args().nth(1).unwrap_or_else(|| "status-poller".to_string());
    let client = Cronitor::from_env()?;
    let event = client.event(&key, EventOptions::with_interval(10))?;

    let mut polls = tokio::time::interval(Duration::from_secs(1));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = polls.tick() => {
                if poll_status().await {
                    event.tick();
                } else {
                    event.error();
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    let outcome = event.stop().await;
    info!("Final flush: {}", outcome);
    Ok(())
}

/// Stand-in for a real health check
async fn poll_status() -> bool {
    tokio::time::sleep(Duration::from_millis(100)).await;
    rand::random::<u8>() > 25
}
