use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Service configuration, loaded from `ORDER_INGEST_`-prefixed environment
/// variables. Everything has a default suitable for local development; real
/// deployments override credentials and endpoints.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_nats_connect_timeout_secs")]
    pub nats_connect_timeout_secs: u64,

    /// JetStream stream carrying order-lifecycle events
    #[serde(default = "default_nats_stream")]
    pub nats_stream: String,

    /// Subject filter for the consumer
    #[serde(default = "default_nats_subject")]
    pub nats_subject: String,

    /// Durable consumer name
    #[serde(default = "default_nats_consumer")]
    pub nats_consumer: String,

    /// Max messages fetched per pull (transport batching only; rows are
    /// still written one per message)
    #[serde(default = "default_fetch_batch_size")]
    pub fetch_batch_size: usize,

    /// Max wait per fetch in seconds
    #[serde(default = "default_fetch_wait_secs")]
    pub fetch_wait_secs: u64,

    // ClickHouse configuration
    /// ClickHouse HTTP URL
    #[serde(default = "default_clickhouse_url")]
    pub clickhouse_url: String,

    #[serde(default = "default_clickhouse_database")]
    pub clickhouse_database: String,

    #[serde(default = "default_clickhouse_username")]
    pub clickhouse_username: String,

    #[serde(default)]
    pub clickhouse_password: String,

    /// Destination table for order event rows
    #[serde(default = "default_clickhouse_table")]
    pub clickhouse_table: String,

    /// Startup timeout for connect/ping in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_nats_connect_timeout_secs() -> u64 {
    10
}

fn default_nats_stream() -> String {
    "order-events".to_string()
}

fn default_nats_subject() -> String {
    "order-events.>".to_string()
}

fn default_nats_consumer() -> String {
    "order-ingest".to_string()
}

fn default_fetch_batch_size() -> usize {
    10
}

fn default_fetch_wait_secs() -> u64 {
    5
}

fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_clickhouse_database() -> String {
    "orders".to_string()
}

fn default_clickhouse_username() -> String {
    "default".to_string()
}

fn default_clickhouse_table() -> String {
    "order_events_streaming".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    30
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("ORDER_INGEST"))
            .build()?
            .try_deserialize()
    }
}
