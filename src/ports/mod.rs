//! Port traits implemented by the adapters.

pub mod candle_store;
pub mod config_port;
