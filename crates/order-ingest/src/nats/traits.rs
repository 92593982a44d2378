use anyhow::Result;
use async_nats::jetstream;
use async_trait::async_trait;

/// Abstracts creation of a durable JetStream pull consumer so the consumer
/// loop can be driven by mocks in tests.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JetStreamConsumer: Send + Sync {
    async fn create_consumer(
        &self,
        config: jetstream::consumer::pull::Config,
        stream_name: &str,
    ) -> Result<Box<dyn PullConsumer>>;
}

/// Abstracts the fetch operation on a pull consumer.
///
/// Returns up to `max_messages` deliveries, waiting at most `expires`. Each
/// message carries its own ack handle; acknowledgment stays with the caller.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PullConsumer: Send + Sync {
    async fn fetch_messages(
        &self,
        max_messages: usize,
        expires: std::time::Duration,
    ) -> Result<Vec<jetstream::Message>>;
}
