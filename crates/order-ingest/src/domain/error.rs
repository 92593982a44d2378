use thiserror::Error;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// The payload could not be decoded as a JSON object. Terminal for the
    /// delivery; the message is nak'd so the broker redelivers it.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The warehouse rejected the row or the write did not complete. The
    /// message is nak'd; the broker's redelivery policy handles retry.
    #[error("sink write failed: {0}")]
    SinkWrite(#[from] anyhow::Error),
}
