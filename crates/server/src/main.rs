//! Quick Poll service entry point.
//!
//! Prepares the store for the poll services: loads configuration, connects
//! the pool, applies pending migrations and checks that the poll tables
//! answer. Transport layers embed [`quickpoll_core::PollService`] directly.

use std::sync::Arc;

use anyhow::Context;
use quickpoll_common::{Config, LoggingConfig};
use quickpoll_core::{ListPollsQuery, PollService};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting quickpoll...");

    let db = quickpoll_db::init(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    info!("Running database migrations...");
    quickpoll_db::migrate(&db)
        .await
        .context("failed to run migrations")?;
    info!("Migrations completed");

    let service = PollService::new(Arc::new(db), config.polls.clone());
    let sample = service
        .list_polls(ListPollsQuery {
            limit: Some(1),
            ..Default::default()
        })
        .await
        .context("poll store is not answering")?;

    info!(
        public_polls_visible = !sample.is_empty(),
        max_options = config.polls.max_options,
        "Poll store ready"
    );

    Ok(())
}
