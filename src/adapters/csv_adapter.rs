//! CSV candle store: one `<exchange>/<symbol>.csv` file per market.
//!
//! Files carry a header row followed by
//! `timestamp,open,high,low,close,volume` records, timestamp in epoch ms.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::ports::candle_store::CandleStore;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    /// Fails when `base_path` is not an existing directory.
    pub fn new(base_path: PathBuf) -> Result<Self, BacktestError> {
        if !base_path.is_dir() {
            return Err(BacktestError::Database {
                reason: format!("store not found: {}", base_path.display()),
            });
        }
        Ok(Self { base_path })
    }

    fn csv_path(&self, exchange: &str, symbol: &str) -> PathBuf {
        self.base_path.join(exchange).join(format!("{symbol}.csv"))
    }
}

fn field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    path: &Path,
) -> Result<T, BacktestError>
where
    T::Err: std::fmt::Display,
{
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    let raw = record.get(index).ok_or_else(|| BacktestError::Csv {
        path: path.display().to_string(),
        reason: format!("line {line}: missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e: T::Err| BacktestError::Csv {
        path: path.display().to_string(),
        reason: format!("line {line}: invalid {name} '{raw}': {e}"),
    })
}

/// Read every candle from a CSV file, in file order.
pub fn read_candles_file(path: &Path) -> Result<Vec<Candle>, BacktestError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| BacktestError::Csv {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut candles = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| BacktestError::Csv {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        candles.push(Candle {
            timestamp: field(&record, 0, "timestamp", path)?,
            open: field(&record, 1, "open", path)?,
            high: field(&record, 2, "high", path)?,
            low: field(&record, 3, "low", path)?,
            close: field(&record, 4, "close", path)?,
            volume: field(&record, 5, "volume", path)?,
        });
    }
    Ok(candles)
}

impl CandleStore for CsvAdapter {
    fn fetch_candles(&self, exchange: &str, symbol: &str) -> Result<Vec<Candle>, BacktestError> {
        let path = self.csv_path(exchange, symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_candles_file(&path)
    }

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, BacktestError> {
        let dir = self.base_path.join(exchange);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut symbols = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        exchange: &str,
        symbol: &str,
    ) -> Result<Option<(i64, i64, usize)>, BacktestError> {
        let candles = self.fetch_candles(exchange, symbol)?;
        let first = candles.iter().map(|c| c.timestamp).min();
        let last = candles.iter().map(|c| c.timestamp).max();
        Ok(first.zip(last).map(|(first, last)| (first, last, candles.len())))
    }
}
