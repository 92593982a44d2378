use crate::domain::{IngestError, IngestResult, OrderEvent, OrderEventSink};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// How much of a malformed payload gets echoed into the log line.
const PAYLOAD_LOG_LIMIT: usize = 512;

/// Domain service driving the per-message pipeline: decode → transform →
/// write. The acknowledgment decision stays with the consumer loop; this
/// service only reports success or failure for one delivery.
///
/// Holds no mutable state, so concurrent invocations are safe.
pub struct OrderEventService {
    sink: Arc<dyn OrderEventSink>,
}

impl OrderEventService {
    pub fn new(sink: Arc<dyn OrderEventSink>) -> Self {
        Self { sink }
    }

    /// Process one raw delivery payload.
    ///
    /// Decode failures are terminal for the delivery and logged with the raw
    /// payload for diagnosis. Field-level coercion failures are not errors:
    /// they degrade to null columns and the row is still written.
    #[instrument(skip(self, payload), fields(payload_bytes = payload.len()))]
    pub async fn ingest(&self, payload: &[u8]) -> IngestResult<()> {
        let value: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
            error!(
                error = %e,
                payload = %lossy_preview(payload),
                "failed to decode payload as JSON"
            );
            IngestError::MalformedPayload(e.to_string())
        })?;

        let data = value.as_object().ok_or_else(|| {
            error!(
                payload = %lossy_preview(payload),
                "payload decoded but is not a JSON object"
            );
            IngestError::MalformedPayload("payload is not a JSON object".to_string())
        })?;

        let event = OrderEvent::from_json(data);
        debug!(
            order_id = event.order_id.as_deref().unwrap_or("<missing>"),
            event_type = event.event_type.as_deref().unwrap_or("<missing>"),
            "decoded order event"
        );

        self.sink.append(&event).await?;

        debug!(
            order_id = event.order_id.as_deref().unwrap_or("<missing>"),
            "order event written"
        );
        Ok(())
    }
}

fn lossy_preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    match text.char_indices().nth(PAYLOAD_LOG_LIMIT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.into_owned(),
    }
}
