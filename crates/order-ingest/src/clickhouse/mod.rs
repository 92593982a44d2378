mod client;
mod order_event_sink;

pub use client::*;
pub use order_event_sink::*;
