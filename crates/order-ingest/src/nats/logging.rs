use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::nats::{ConsumeRequest, ConsumeResponse};
use tower::{Layer, Service};
use tracing::{error, info};

/// Tower layer that logs each consumed delivery: subject, payload size,
/// ack/nak outcome, and how long processing took.
#[derive(Clone, Default)]
pub struct ConsumeLoggingLayer;

impl ConsumeLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ConsumeLoggingLayer {
    type Service = ConsumeLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ConsumeLoggingService { inner: service }
    }
}

#[derive(Clone)]
pub struct ConsumeLoggingService<S> {
    inner: S,
}

impl<S> Service<ConsumeRequest> for ConsumeLoggingService<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let subject = req.subject.clone();
        let payload_size = req.payload.len();
        let start = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            info!(
                subject = %subject,
                payload_bytes = payload_size,
                "received delivery"
            );

            let result = inner.call(req).await;
            let duration_ms = start.elapsed().as_millis();

            match &result {
                Ok(response) => {
                    let outcome = if response.is_ack() { "ack" } else { "nak" };
                    info!(
                        subject = %subject,
                        payload_bytes = payload_size,
                        outcome = %outcome,
                        duration_ms = %duration_ms,
                        "processed delivery from {subject} in {duration_ms}ms [{outcome}]"
                    );
                }
                Err(e) => {
                    error!(
                        subject = %subject,
                        payload_bytes = payload_size,
                        duration_ms = %duration_ms,
                        error = %e,
                        "failed to process delivery from {subject} in {duration_ms}ms: {e}"
                    );
                }
            }

            result
        })
    }
}
