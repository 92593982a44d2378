use crate::domain::{coerce_float, coerce_string, coerce_timestamp, IngestResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Typed order-lifecycle record written to the warehouse.
///
/// Every payload-derived field is nullable: a value that is missing or fails
/// coercion becomes `None` rather than dropping the record. `ingested_at` is
/// always assigned by the worker, never taken from the payload, so the
/// warehouse keeps a processing-time column that upstream clock skew or
/// malformed input cannot pollute.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub order_id: Option<String>,
    pub event_type: Option<String>,
    pub event_timestamp: Option<DateTime<Utc>>,
    pub order_created_at: Option<DateTime<Utc>>,
    pub customer_id: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub source: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Build a record from a decoded payload object. Infallible: bad fields
    /// degrade to `None`, and `ingested_at` is stamped with the current time.
    pub fn from_json(data: &Map<String, Value>) -> Self {
        Self {
            order_id: coerce_string(data.get("order_id")),
            event_type: coerce_string(data.get("event_type")),
            event_timestamp: coerce_timestamp(data.get("event_timestamp")),
            order_created_at: coerce_timestamp(data.get("order_created_at")),
            customer_id: coerce_string(data.get("customer_id")),
            amount: coerce_float(data.get("amount")),
            currency: coerce_string(data.get("currency")),
            source: coerce_string(data.get("source")),
            ingested_at: Utc::now(),
        }
    }
}

/// Trait for appending order events to warehouse storage.
/// Infrastructure (clickhouse module) implements this trait.
///
/// Each call is an independent, non-transactional single-row append. An `Err`
/// means the row did not durably land and the delivery must not be
/// acknowledged.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OrderEventSink: Send + Sync {
    async fn append(&self, event: &OrderEvent) -> IngestResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn payload() -> Map<String, Value> {
        json!({
            "order_id": "o1",
            "event_type": "created",
            "event_timestamp": "2024-05-01T10:00:00Z",
            "order_created_at": "2024-01-01T00:00:00Z",
            "customer_id": "c1",
            "amount": "12.5",
            "currency": "USD",
            "source": "web"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_from_json_fully_populated() {
        let before = Utc::now();
        let event = OrderEvent::from_json(&payload());
        let after = Utc::now();

        assert_eq!(event.order_id.as_deref(), Some("o1"));
        assert_eq!(event.event_type.as_deref(), Some("created"));
        assert_eq!(
            event.event_timestamp,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            event.order_created_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(event.customer_id.as_deref(), Some("c1"));
        assert_eq!(event.amount, Some(12.5));
        assert_eq!(event.currency.as_deref(), Some("USD"));
        assert_eq!(event.source.as_deref(), Some("web"));
        assert!(event.ingested_at >= before && event.ingested_at <= after);
    }

    #[test]
    fn test_from_json_bad_fields_become_null() {
        let mut data = payload();
        data.insert("event_timestamp".to_string(), json!("not-a-date"));
        data.insert("amount".to_string(), json!("free"));
        data.remove("source");

        let event = OrderEvent::from_json(&data);

        assert_eq!(event.event_timestamp, None);
        assert_eq!(event.amount, None);
        assert_eq!(event.source, None);
        // Untouched fields still pass through
        assert_eq!(event.order_id.as_deref(), Some("o1"));
        assert_eq!(
            event.order_created_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_from_json_empty_object() {
        let event = OrderEvent::from_json(&Map::new());

        assert_eq!(event.order_id, None);
        assert_eq!(event.event_type, None);
        assert_eq!(event.event_timestamp, None);
        assert_eq!(event.order_created_at, None);
        assert_eq!(event.customer_id, None);
        assert_eq!(event.amount, None);
        assert_eq!(event.currency, None);
        assert_eq!(event.source, None);
    }

    #[test]
    fn test_ingested_at_ignores_payload_value() {
        let mut data = payload();
        data.insert("ingested_at".to_string(), json!("1999-01-01T00:00:00Z"));

        let event = OrderEvent::from_json(&data);
        assert!(event.ingested_at > Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_redelivery_produces_identical_fields_except_ingested_at() {
        let data = payload();
        let first = OrderEvent::from_json(&data);
        let second = OrderEvent::from_json(&data);

        let mut aligned = second.clone();
        aligned.ingested_at = first.ingested_at;
        assert_eq!(first, aligned);
    }
}
