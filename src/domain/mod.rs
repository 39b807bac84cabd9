//! Core domain types and logic.

pub mod candle;
pub mod timeframe;
pub mod resample;
pub mod position;
pub mod strategy;
pub mod backtest;
pub mod sweep;
pub mod config_validation;
pub mod error;
