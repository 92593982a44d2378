mod client;
mod consumer;
mod consumer_types;
mod logging;
mod processor;
mod traits;

pub use client::*;
pub use consumer::*;
pub use consumer_types::*;
pub use logging::*;
pub use processor::*;
pub use traits::*;
