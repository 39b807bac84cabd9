//! Candle store port.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;

pub trait CandleStore {
    /// All raw candles for `symbol` on `exchange`, ascending by timestamp.
    ///
    /// An unknown exchange or symbol yields an empty `Vec`, not an error.
    fn fetch_candles(&self, exchange: &str, symbol: &str) -> Result<Vec<Candle>, BacktestError>;

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, BacktestError>;

    /// First timestamp, last timestamp and row count, if any rows exist.
    fn get_data_range(
        &self,
        exchange: &str,
        symbol: &str,
    ) -> Result<Option<(i64, i64, usize)>, BacktestError>;
}
