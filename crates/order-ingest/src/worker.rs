use crate::clickhouse::{ClickHouseClient, ClickHouseOrderEventSink};
use crate::domain::OrderEventService;
use crate::nats::{
    ConsumeLoggingLayer, ConsumeLoggingService, NatsClient, OrderConsumer, OrderEventProcessor,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::info;

pub struct IngestWorkerConfig {
    /// JetStream stream carrying order-lifecycle events
    pub stream: String,
    /// Subject filter within the stream
    pub subject: String,
    /// Durable consumer name (one logical subscription per deployment)
    pub consumer_name: String,
    /// Fully-qualified warehouse table receiving the rows
    pub table: String,
    pub fetch_batch_size: usize,
    pub fetch_wait_secs: u64,
}

type IngestService = ConsumeLoggingService<OrderEventProcessor>;

/// The assembled ingestion worker: sink → domain service → processor →
/// consumer loop. Clients are injected so tests can substitute fakes.
pub struct IngestWorker {
    consumer: OrderConsumer<IngestService>,
}

impl IngestWorker {
    pub async fn new(
        clickhouse_client: ClickHouseClient,
        nats_client: Arc<NatsClient>,
        config: IngestWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!("Initializing order-events ingest worker");

        let sink = ClickHouseOrderEventSink::new(clickhouse_client, config.table.clone());
        let service = Arc::new(OrderEventService::new(Arc::new(sink)));

        let processor = ServiceBuilder::new()
            .layer(ConsumeLoggingLayer::new())
            .service(OrderEventProcessor::new(service));

        let consumer_client = nats_client.create_consumer_client();
        let consumer = OrderConsumer::new(
            consumer_client,
            &config.stream,
            &config.consumer_name,
            &config.subject,
            config.fetch_batch_size,
            config.fetch_wait_secs,
            processor,
        )
        .await?;

        info!("Ingest worker initialized");

        Ok(Self { consumer })
    }

    /// Hand the consumer loop to the runner as a cancellable process.
    pub async fn run(self, ctx: CancellationToken) -> anyhow::Result<()> {
        self.consumer.run(ctx).await
    }
}
