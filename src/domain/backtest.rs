//! Backtest context: one resampled series plus the result of the last run.

use crate::domain::candle::{self, Candle};
use crate::domain::error::BacktestError;
use crate::domain::position::BacktestResult;
use crate::domain::resample::resample;
use crate::domain::strategy::Strategy;
use crate::ports::candle_store::CandleStore;
use std::time::Instant;

/// Inclusive upper bound used when no end date is configured.
pub const OPEN_END_TS: i64 = 9_999_999_999_999;

/// Market selection and time window for a backtest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktestConfig {
    pub exchange: String,
    pub symbol: String,
    pub interval: String,
    pub start_ts: i64,
    pub end_ts: i64,
}

#[derive(Debug, Clone)]
pub struct Backtest {
    config: BacktestConfig,
    candles: Vec<Candle>,
    result: BacktestResult,
}

impl Backtest {
    /// Fetch raw candles from `store` and resample them once.
    ///
    /// Missing data is not an error: the backtest is built with no candles
    /// and every run produces a zero result.
    pub fn load(store: &dyn CandleStore, config: BacktestConfig) -> Result<Self, BacktestError> {
        let started = Instant::now();
        let raw = store.fetch_candles(&config.exchange, &config.symbol)?;
        tracing::info!(
            exchange = %config.exchange,
            symbol = %config.symbol,
            candles = raw.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched candles"
        );
        if raw.is_empty() {
            tracing::warn!(
                exchange = %config.exchange,
                symbol = %config.symbol,
                "no data"
            );
        }
        Self::from_candles(config, &raw)
    }

    /// Build from an in-memory raw series, which must be sorted by timestamp.
    pub fn from_candles(config: BacktestConfig, raw: &[Candle]) -> Result<Self, BacktestError> {
        if let Some(index) = candle::first_out_of_order(raw) {
            return Err(BacktestError::UnsortedCandles {
                index,
                timestamp: raw[index].timestamp,
            });
        }

        let candles = resample(raw, &config.interval, config.start_ts, config.end_ts);
        tracing::info!(
            symbol = %config.symbol,
            interval = %config.interval,
            candles = candles.len(),
            "resampled"
        );

        Ok(Self {
            config,
            candles,
            result: BacktestResult::default(),
        })
    }

    /// Run `strategy` over the resampled series, replacing any previous result.
    ///
    /// On error the stored result is left at zero.
    pub fn execute_backtest(&mut self, strategy: &dyn Strategy) -> Result<(), BacktestError> {
        self.result = BacktestResult::default();
        self.result = strategy.run(&self.candles)?;
        tracing::debug!(
            strategy = %strategy,
            pnl = self.result.pnl,
            max_drawdown = self.result.max_drawdown,
            trades = self.result.trades.len(),
            "backtest complete"
        );
        Ok(())
    }

    pub fn pnl(&self) -> f64 {
        self.result.pnl
    }

    pub fn max_drawdown(&self) -> f64 {
        self.result.max_drawdown
    }

    pub fn trade_count(&self) -> usize {
        self.result.trades.len()
    }

    pub fn result(&self) -> &BacktestResult {
        &self.result
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::{MaCrossover, TrendReversal};

    fn sample_config(interval: &str) -> BacktestConfig {
        BacktestConfig {
            exchange: "binance".into(),
            symbol: "BTCUSDT".into(),
            interval: interval.into(),
            start_ts: 0,
            end_ts: OPEN_END_TS,
        }
    }

    fn minutes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 60_000, c, c, c, c, 1.0))
            .collect()
    }

    #[test]
    fn accessors_are_zero_before_any_run() {
        let bt = Backtest::from_candles(sample_config("1m"), &minutes(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(bt.pnl(), 0.0);
        assert_eq!(bt.max_drawdown(), 0.0);
        assert_eq!(bt.trade_count(), 0);
    }

    #[test]
    fn unsorted_input_is_rejected() {
        let mut raw = minutes(&[1.0, 2.0, 3.0]);
        raw.swap(1, 2);
        let err = Backtest::from_candles(sample_config("1m"), &raw).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::UnsortedCandles { index: 2, timestamp: 60_000 }
        ));
    }

    #[test]
    fn bad_interval_behaves_like_missing_data() {
        let raw = minutes(&[1.0, 2.0, 3.0, 2.0, 1.0]);
        let mut bt = Backtest::from_candles(sample_config("5x"), &raw).unwrap();
        assert!(bt.candles().is_empty());
        bt.execute_backtest(&TrendReversal::default()).unwrap();
        assert_eq!(bt.pnl(), 0.0);
        assert_eq!(bt.max_drawdown(), 0.0);
    }

    #[test]
    fn rerun_overwrites_previous_result() {
        let closes = [1.0, 2.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let mut bt = Backtest::from_candles(sample_config("1m"), &minutes(&closes)).unwrap();

        bt.execute_backtest(&MaCrossover::new(2, 4)).unwrap();
        assert!(bt.pnl() != 0.0);

        bt.execute_backtest(&MaCrossover::new(2, 40)).unwrap();
        assert_eq!(bt.pnl(), 0.0);
        assert_eq!(bt.max_drawdown(), 0.0);
    }

    #[test]
    fn failed_run_leaves_zero_result() {
        let closes = [1.0, 2.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let mut bt = Backtest::from_candles(sample_config("1m"), &minutes(&closes)).unwrap();
        bt.execute_backtest(&MaCrossover::new(2, 4)).unwrap();

        assert!(bt.execute_backtest(&MaCrossover::new(0, 4)).is_err());
        assert_eq!(bt.pnl(), 0.0);
        assert_eq!(bt.trade_count(), 0);
    }
}
