use crate::nats::{ConsumeRequest, ConsumeResponse, JetStreamConsumer, PullConsumer};
use anyhow::{Context, Result};
use async_nats::jetstream;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::{debug, error, info, warn};

/// Long-lived consumer loop over a durable JetStream pull consumer.
///
/// Messages are fetched in small batches as transport, then handed to the
/// Tower service one at a time; there is no cross-message buffering and each
/// delivery gets its own write and its own acknowledgment decision. The loop
/// runs until the cancellation token fires and never dies on a single bad
/// message: fetch errors, service errors, and ack transport errors are all
/// logged and survived.
pub struct OrderConsumer<S> {
    consumer: Box<dyn PullConsumer>,
    stream_name: String,
    consumer_name: String,
    fetch_batch_size: usize,
    max_wait: Duration,
    service: S,
}

impl<S> OrderConsumer<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse, Error = anyhow::Error>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    pub async fn new(
        jetstream: Arc<dyn JetStreamConsumer>,
        stream_name: &str,
        consumer_name: &str,
        subject_filter: &str,
        fetch_batch_size: usize,
        max_wait_secs: u64,
        service: S,
    ) -> Result<Self> {
        debug!(
            stream = %stream_name,
            consumer = %consumer_name,
            filter_subject = %subject_filter,
            "creating order-events consumer"
        );

        // Explicit ack: a delivery stays in flight until we ack it, so any
        // row that does not land is redelivered by the broker.
        let config = jetstream::consumer::pull::Config {
            name: Some(consumer_name.to_string()),
            durable_name: Some(consumer_name.to_string()),
            filter_subject: subject_filter.to_string(),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            ..Default::default()
        };

        let consumer = jetstream
            .create_consumer(config, stream_name)
            .await
            .context("failed to create consumer")?;

        Ok(Self {
            consumer,
            stream_name: stream_name.to_string(),
            consumer_name: consumer_name.to_string(),
            fetch_batch_size,
            max_wait: Duration::from_secs(max_wait_secs),
            service,
        })
    }

    /// Run until cancellation. In-flight unacknowledged messages at shutdown
    /// are simply redelivered later; no drain protocol is needed.
    pub async fn run(mut self, ctx: CancellationToken) -> Result<()> {
        info!(
            stream = %self.stream_name,
            consumer = %self.consumer_name,
            "starting order-events consumer"
        );

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!(
                        stream = %self.stream_name,
                        consumer = %self.consumer_name,
                        "received shutdown signal, stopping consumer"
                    );
                    break;
                }
                result = self.fetch_and_process() => {
                    if let Err(e) = result {
                        error!(
                            stream = %self.stream_name,
                            consumer = %self.consumer_name,
                            error = %e,
                            "error fetching deliveries"
                        );
                        // Back off briefly so a broken broker connection does
                        // not spin the loop
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!(
            stream = %self.stream_name,
            consumer = %self.consumer_name,
            "consumer stopped gracefully"
        );
        Ok(())
    }

    async fn fetch_and_process(&mut self) -> Result<()> {
        let messages = self
            .consumer
            .fetch_messages(self.fetch_batch_size, self.max_wait)
            .await?;

        if messages.is_empty() {
            return Ok(());
        }

        debug!(message_count = messages.len(), "received deliveries");

        for msg in &messages {
            let request = ConsumeRequest::new(
                msg.subject.to_string(),
                Bytes::copy_from_slice(&msg.payload),
            );

            // A service-level error is an unanticipated failure somewhere in
            // decode/transform/write; treat it like any other non-durable
            // outcome and withhold the ack.
            let response = match self.service.call(request).await {
                Ok(resp) => resp,
                Err(e) => {
                    error!(
                        subject = %msg.subject,
                        error = %e,
                        "service error processing delivery"
                    );
                    ConsumeResponse::nak(e.to_string())
                }
            };

            match response {
                ConsumeResponse::Ack => {
                    if let Err(e) = msg.ack().await {
                        // The write landed but the ack did not reach the
                        // broker; the message will be redelivered and produce
                        // a duplicate row, which downstream tolerates.
                        error!(
                            subject = %msg.subject,
                            error = %e,
                            "failed to acknowledge delivery"
                        );
                    }
                }
                ConsumeResponse::Nak(reason) => {
                    if let Some(ref r) = reason {
                        warn!(subject = %msg.subject, reason = %r, "leaving delivery unacknowledged");
                    } else {
                        warn!(subject = %msg.subject, "leaving delivery unacknowledged");
                    }

                    if let Err(e) = msg.ack_with(jetstream::AckKind::Nak(None)).await {
                        error!(
                            subject = %msg.subject,
                            error = %e,
                            "failed to nak delivery"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nats::{MockJetStreamConsumer, MockPullConsumer};
    use futures::future::BoxFuture;
    use std::task::{Context, Poll};

    #[derive(Clone)]
    struct AckAllService;

    impl Service<ConsumeRequest> for AckAllService {
        type Response = ConsumeResponse;
        type Error = anyhow::Error;
        type Future = BoxFuture<'static, Result<ConsumeResponse, anyhow::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: ConsumeRequest) -> Self::Future {
            Box::pin(async move { Ok(ConsumeResponse::ack()) })
        }
    }

    #[tokio::test]
    async fn test_consumer_creation_success() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .withf(
                |config: &jetstream::consumer::pull::Config, stream_name: &str| {
                    config.durable_name.as_deref() == Some("order-ingest")
                        && matches!(config.ack_policy, jetstream::consumer::AckPolicy::Explicit)
                        && stream_name == "order-events"
                },
            )
            .times(1)
            .returning(|_, _| Ok(Box::new(MockPullConsumer::new())));

        let result = OrderConsumer::new(
            Arc::new(mock_jetstream),
            "order-events",
            "order-ingest",
            "order-events.>",
            10,
            5,
            AckAllService,
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_consumer_creation_failure() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("no such stream")));

        let result = OrderConsumer::new(
            Arc::new(mock_jetstream),
            "order-events",
            "order-ingest",
            "order-events.>",
            10,
            5,
            AckAllService,
        )
        .await;

        assert!(result.is_err());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("failed to create consumer"));
    }

    #[tokio::test]
    async fn test_fetch_and_process_empty_batch() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .times(1)
            .returning(|_, _| {
                let mut mock = MockPullConsumer::new();
                mock.expect_fetch_messages()
                    .times(1)
                    .returning(|_, _| Ok(vec![]));
                Ok(Box::new(mock))
            });

        let mut consumer = OrderConsumer::new(
            Arc::new(mock_jetstream),
            "order-events",
            "order-ingest",
            "order-events.>",
            10,
            5,
            AckAllService,
        )
        .await
        .unwrap();

        let result = consumer.fetch_and_process().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .times(1)
            .returning(|_, _| {
                let mut mock = MockPullConsumer::new();
                mock.expect_fetch_messages()
                    .times(1)
                    .returning(|_, _| Err(anyhow::anyhow!("connection reset")));
                Ok(Box::new(mock))
            });

        let mut consumer = OrderConsumer::new(
            Arc::new(mock_jetstream),
            "order-events",
            "order-ingest",
            "order-events.>",
            10,
            5,
            AckAllService,
        )
        .await
        .unwrap();

        let result = consumer.fetch_and_process().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .times(1)
            .returning(|_, _| {
                let mut mock = MockPullConsumer::new();
                mock.expect_fetch_messages().returning(|_, _| Ok(vec![]));
                Ok(Box::new(mock))
            });

        let consumer = OrderConsumer::new(
            Arc::new(mock_jetstream),
            "order-events",
            "order-ingest",
            "order-events.>",
            10,
            0,
            AckAllService,
        )
        .await
        .unwrap();

        let ctx = CancellationToken::new();
        ctx.cancel();

        let result = consumer.run(ctx).await;
        assert!(result.is_ok());
    }
}
