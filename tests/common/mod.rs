#![allow(dead_code)]

use candlebt::domain::backtest::{BacktestConfig, OPEN_END_TS};
pub use candlebt::domain::candle::Candle;
use candlebt::domain::error::BacktestError;
use candlebt::ports::candle_store::CandleStore;
use std::collections::HashMap;

pub const MINUTE_MS: i64 = 60_000;
pub const HOUR_MS: i64 = 3_600_000;

pub struct MockCandleStore {
    pub data: HashMap<(String, String), Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockCandleStore {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, exchange: &str, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data
            .insert((exchange.to_string(), symbol.to_string()), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<(), BacktestError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(BacktestError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl CandleStore for MockCandleStore {
    fn fetch_candles(&self, exchange: &str, symbol: &str) -> Result<Vec<Candle>, BacktestError> {
        self.check(symbol)?;
        Ok(self
            .data
            .get(&(exchange.to_string(), symbol.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, BacktestError> {
        let mut symbols: Vec<String> = self
            .data
            .keys()
            .filter(|(e, _)| e == exchange)
            .map(|(_, s)| s.clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        exchange: &str,
        symbol: &str,
    ) -> Result<Option<(i64, i64, usize)>, BacktestError> {
        let candles = self.fetch_candles(exchange, symbol)?;
        match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => Ok(Some((first.timestamp, last.timestamp, candles.len()))),
            _ => Ok(None),
        }
    }
}

/// Candle with high/low half a point around `close` and open equal to close.
pub fn make_candle(timestamp: i64, close: f64) -> Candle {
    Candle::new(timestamp, close, close + 0.5, close - 0.5, close, 1.0)
}

/// One candle per `step_ms`, starting at 0.
pub fn series(step_ms: i64, closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_candle(i as i64 * step_ms, close))
        .collect()
}

/// Oscillating close series long enough to produce several trades on both
/// strategies.
pub fn wave(count: usize, step_ms: i64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + 10.0 * (x / 6.0).sin() + 2.0 * (x / 1.7).cos();
            Candle::new(
                i as i64 * step_ms,
                close - 0.3,
                close + 1.0,
                close - 1.0,
                close,
                10.0 + (i % 5) as f64,
            )
        })
        .collect()
}

pub fn sample_config(interval: &str) -> BacktestConfig {
    BacktestConfig {
        exchange: "binance".into(),
        symbol: "BTCUSDT".into(),
        interval: interval.into(),
        start_ts: 0,
        end_ts: OPEN_END_TS,
    }
}
