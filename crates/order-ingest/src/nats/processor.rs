use crate::domain::OrderEventService;
use crate::nats::{ConsumeRequest, ConsumeResponse};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::warn;

/// Tower service that feeds one delivery through the ingest pipeline and
/// turns the result into an acknowledgment decision.
///
/// Every failure path maps to `Nak`: a message whose row did not durably
/// land is left to the broker's redelivery policy. The service itself never
/// errors, so the consumer loop only sees explicit ack/nak outcomes.
#[derive(Clone)]
pub struct OrderEventProcessor {
    service: Arc<OrderEventService>,
}

impl OrderEventProcessor {
    pub fn new(service: Arc<OrderEventService>) -> Self {
        Self { service }
    }
}

impl Service<ConsumeRequest> for OrderEventProcessor {
    type Response = ConsumeResponse;
    type Error = anyhow::Error;
    type Future = BoxFuture<'static, Result<ConsumeResponse, anyhow::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let service = Arc::clone(&self.service);

        Box::pin(async move {
            match service.ingest(&req.payload).await {
                Ok(()) => Ok(ConsumeResponse::ack()),
                Err(e) => {
                    warn!(
                        subject = %req.subject,
                        error = %e,
                        "failed to ingest order event, leaving delivery unacknowledged"
                    );
                    Ok(ConsumeResponse::nak(e.to_string()))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IngestError, MockOrderEventSink};
    use bytes::Bytes;

    fn processor_with_sink(sink: MockOrderEventSink) -> OrderEventProcessor {
        OrderEventProcessor::new(Arc::new(OrderEventService::new(Arc::new(sink))))
    }

    #[tokio::test]
    async fn test_valid_payload_is_acked() {
        let mut mock_sink = MockOrderEventSink::new();
        mock_sink.expect_append().times(1).return_once(|_| Ok(()));

        let mut processor = processor_with_sink(mock_sink);

        let req = ConsumeRequest::new(
            "order-events.created".to_string(),
            Bytes::from(r#"{"order_id":"o1","event_type":"created"}"#),
        );

        let response = processor.call(req).await.unwrap();
        assert!(response.is_ack());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_naked() {
        // Sink must never be called for an undecodable payload
        let mock_sink = MockOrderEventSink::new();
        let mut processor = processor_with_sink(mock_sink);

        let req = ConsumeRequest::new(
            "order-events.created".to_string(),
            Bytes::from_static(b"\xff\xfenot-json"),
        );

        let response = processor.call(req).await.unwrap();
        assert!(response.is_nak());
    }

    #[tokio::test]
    async fn test_sink_failure_is_naked() {
        let mut mock_sink = MockOrderEventSink::new();
        mock_sink
            .expect_append()
            .times(1)
            .return_once(|_| Err(IngestError::SinkWrite(anyhow::anyhow!("table offline"))));

        let mut processor = processor_with_sink(mock_sink);

        let req = ConsumeRequest::new(
            "order-events.created".to_string(),
            Bytes::from(r#"{"order_id":"o1"}"#),
        );

        let response = processor.call(req).await.unwrap();
        match response {
            ConsumeResponse::Nak(Some(reason)) => assert!(reason.contains("table offline")),
            other => panic!("expected Nak with reason, got {:?}", other),
        }
    }
}
