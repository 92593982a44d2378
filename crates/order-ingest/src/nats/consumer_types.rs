use bytes::Bytes;

/// One delivery, detached from its broker handle.
///
/// Owns the subject and payload so it can flow through Tower middleware
/// without borrowing from the fetched batch. The ack handle never leaves the
/// consumer loop; processing only decides the outcome.
#[derive(Debug, Clone)]
pub struct ConsumeRequest {
    pub subject: String,
    pub payload: Bytes,
}

impl ConsumeRequest {
    pub fn new(subject: String, payload: Bytes) -> Self {
        Self { subject, payload }
    }
}

/// Outcome of processing one delivery.
#[derive(Debug, Clone)]
pub enum ConsumeResponse {
    /// Durably processed: acknowledge, the broker drops the message.
    Ack,
    /// Not durably processed: withhold acknowledgment so the broker
    /// redelivers per its retry policy.
    Nak(Option<String>),
}

impl ConsumeResponse {
    pub fn ack() -> Self {
        Self::Ack
    }

    pub fn nak(reason: impl Into<String>) -> Self {
        Self::Nak(Some(reason.into()))
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }

    pub fn is_nak(&self) -> bool {
        matches!(self, Self::Nak(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_request_owns_data() {
        let req = ConsumeRequest::new("orders.created".to_string(), Bytes::from("{}"));
        assert_eq!(req.subject, "orders.created");
        assert_eq!(req.payload, Bytes::from("{}"));
    }

    #[test]
    fn test_consume_response_outcomes() {
        assert!(ConsumeResponse::ack().is_ack());
        assert!(!ConsumeResponse::ack().is_nak());

        let nak = ConsumeResponse::nak("sink down");
        assert!(nak.is_nak());
        if let ConsumeResponse::Nak(Some(reason)) = nak {
            assert_eq!(reason, "sink down");
        } else {
            panic!("expected Nak with reason");
        }
    }
}
