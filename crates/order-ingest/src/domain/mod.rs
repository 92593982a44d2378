mod coerce;
mod error;
mod order_event;
mod order_event_service;

pub use coerce::*;
pub use error::*;
pub use order_event::*;
pub use order_event_service::*;
