pub mod clickhouse;
pub mod domain;
pub mod nats;
pub mod worker;

pub use self::clickhouse::*;
pub use self::domain::*;
pub use self::nats::*;
pub use self::worker::*;

// Re-export mocks when the testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockOrderEventSink;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockJetStreamConsumer;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockPullConsumer;
