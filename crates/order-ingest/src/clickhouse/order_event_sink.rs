use crate::clickhouse::ClickHouseClient;
use crate::domain::{IngestError, IngestResult, OrderEvent, OrderEventSink};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Wire representation of one warehouse row.
///
/// Timestamp columns are `Nullable(DateTime)` on the ClickHouse side, hence
/// the `datetime::option` serde adapters; `ingested_at` is non-nullable
/// because the worker always assigns it.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct OrderEventRow {
    pub order_id: Option<String>,
    pub event_type: Option<String>,
    #[serde(with = "clickhouse::serde::chrono::datetime::option")]
    pub event_timestamp: Option<DateTime<Utc>>,
    #[serde(with = "clickhouse::serde::chrono::datetime::option")]
    pub order_created_at: Option<DateTime<Utc>>,
    pub customer_id: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub source: Option<String>,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub ingested_at: DateTime<Utc>,
}

impl From<&OrderEvent> for OrderEventRow {
    fn from(event: &OrderEvent) -> Self {
        OrderEventRow {
            order_id: event.order_id.clone(),
            event_type: event.event_type.clone(),
            event_timestamp: event.event_timestamp,
            order_created_at: event.order_created_at,
            customer_id: event.customer_id.clone(),
            amount: event.amount,
            currency: event.currency.clone(),
            source: event.source.clone(),
            ingested_at: event.ingested_at,
        }
    }
}

/// ClickHouse implementation of OrderEventSink.
///
/// Appends exactly one row per call to a fixed, pre-existing table. No
/// schema management, no idempotency key: a redelivered message produces a
/// duplicate row that downstream deduplication is expected to absorb.
#[derive(Clone)]
pub struct ClickHouseOrderEventSink {
    client: ClickHouseClient,
    table: String,
}

impl ClickHouseOrderEventSink {
    pub fn new(client: ClickHouseClient, table: String) -> Self {
        Self { client, table }
    }
}

#[async_trait]
impl OrderEventSink for ClickHouseOrderEventSink {
    async fn append(&self, event: &OrderEvent) -> IngestResult<()> {
        debug!(
            table = %self.table,
            order_id = event.order_id.as_deref().unwrap_or("<missing>"),
            "appending order event row"
        );

        let row = OrderEventRow::from(event);

        let mut insert = self
            .client
            .get_client()
            .insert::<OrderEventRow>(&self.table)
            .map_err(|e| {
                error!("failed to create ClickHouse inserter: {}", e);
                IngestError::SinkWrite(e.into())
            })?;

        insert.write(&row).await.map_err(|e| {
            error!("failed to write row to ClickHouse: {}", e);
            IngestError::SinkWrite(e.into())
        })?;

        insert.end().await.map_err(|e| {
            error!("failed to finalize ClickHouse insert: {}", e);
            IngestError::SinkWrite(e.into())
        })?;

        debug!(table = %self.table, "order event row stored");
        Ok(())
    }
}
