mod config;
mod runner;

use anyhow::Context;
use order_ingest::{ClickHouseClient, IngestWorker, IngestWorkerConfig, NatsClient};
use runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let config = match config::IngestConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Starting order-ingest service");

    let worker = match bootstrap(&config).await {
        Ok(worker) => worker,
        Err(e) => {
            tracing::error!("Failed to start: {:#}", e);
            std::process::exit(1);
        }
    };

    Runner::new()
        .with_process(move |ctx| worker.run(ctx))
        .with_closer(|| async move {
            info!("Shutdown complete; unacknowledged deliveries will be redelivered");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10))
        .run()
        .await;
}

async fn bootstrap(config: &config::IngestConfig) -> anyhow::Result<IngestWorker> {
    let startup_timeout = Duration::from_secs(config.startup_timeout_secs);

    let nats_client = NatsClient::connect(
        &config.nats_url,
        Duration::from_secs(config.nats_connect_timeout_secs),
    )
    .await?;
    nats_client
        .ensure_stream(&config.nats_stream)
        .await
        .context("failed to ensure order-events stream")?;

    let clickhouse_client = ClickHouseClient::new(
        &config.clickhouse_url,
        &config.clickhouse_database,
        &config.clickhouse_username,
        &config.clickhouse_password,
    );
    tokio::time::timeout(startup_timeout, clickhouse_client.ping())
        .await
        .context("ClickHouse ping timed out")?
        .context("ClickHouse ping failed")?;
    info!(url = %config.clickhouse_url, database = %config.clickhouse_database, "ClickHouse reachable");

    IngestWorker::new(
        clickhouse_client,
        Arc::new(nats_client),
        IngestWorkerConfig {
            stream: config.nats_stream.clone(),
            subject: config.nats_subject.clone(),
            consumer_name: config.nats_consumer.clone(),
            table: config.clickhouse_table.clone(),
            fetch_batch_size: config.fetch_batch_size,
            fetch_wait_secs: config.fetch_wait_secs,
        },
    )
    .await
}
