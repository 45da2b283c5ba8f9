//! Client facade and its builder

mod builder;
mod client;

pub use builder::{Gemgate, GemgateBuilder};
pub use client::{GatewayStatus, GemgateClient};
