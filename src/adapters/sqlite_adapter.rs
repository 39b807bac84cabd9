//! SQLite candle store.

use crate::domain::candle::Candle;
use crate::domain::config_validation::pool_size;
use crate::domain::error::BacktestError;
use crate::ports::candle_store::CandleStore;
use crate::ports::config_port::ConfigPort;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OpenFlags};
use std::path::Path;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> BacktestError {
    BacktestError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> BacktestError {
    BacktestError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    /// Opens the configured store read-only. The file must already exist.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BacktestError> {
        let db_path = config.require_string("store", "path")?;
        Self::open(db_path, pool_size(config)?)
    }

    /// Opens the configured store for writing, creating the file and schema
    /// when missing.
    pub fn create_from_config(config: &dyn ConfigPort) -> Result<Self, BacktestError> {
        let db_path = config.require_string("store", "path")?;
        let adapter = Self::create(db_path, pool_size(config)?)?;
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(BacktestError::Database {
                reason: format!("store not found: {}", path.display()),
            });
        }
        let manager = SqliteConnectionManager::file(path).with_flags(
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        );
        Self::build(manager, pool_size)
    }

    pub fn create<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self, BacktestError> {
        Self::build(SqliteConnectionManager::file(path), pool_size)
    }

    fn build(manager: SqliteConnectionManager, pool_size: u32) -> Result<Self, BacktestError> {
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, BacktestError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, BacktestError> {
        self.pool.get().map_err(db_err)
    }

    pub fn initialize_schema(&self) -> Result<(), BacktestError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS candles (
                    exchange TEXT NOT NULL,
                    symbol TEXT NOT NULL,
                    timestamp INTEGER NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume REAL NOT NULL,
                    PRIMARY KEY (exchange, symbol, timestamp)
                );",
            )
            .map_err(query_err)
    }

    /// Upsert candles for one market; returns the number of rows written.
    pub fn insert_candles(
        &self,
        exchange: &str,
        symbol: &str,
        candles: &[Candle],
    ) -> Result<usize, BacktestError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO candles
                     (exchange, symbol, timestamp, open, high, low, close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(query_err)?;
            for c in candles {
                stmt.execute(params![
                    exchange,
                    symbol,
                    c.timestamp,
                    c.open,
                    c.high,
                    c.low,
                    c.close,
                    c.volume
                ])
                .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)?;
        tracing::info!(exchange, symbol, rows = candles.len(), "candles stored");
        Ok(candles.len())
    }
}

impl CandleStore for SqliteAdapter {
    fn fetch_candles(&self, exchange: &str, symbol: &str) -> Result<Vec<Candle>, BacktestError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, open, high, low, close, volume
                 FROM candles
                 WHERE exchange = ?1 AND symbol = ?2
                 ORDER BY timestamp ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![exchange, symbol], |row| {
                Ok(Candle {
                    timestamp: row.get(0)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, BacktestError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM candles WHERE exchange = ?1 ORDER BY symbol")
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![exchange], |row| row.get(0))
            .map_err(query_err)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(query_err)
    }

    fn get_data_range(
        &self,
        exchange: &str,
        symbol: &str,
    ) -> Result<Option<(i64, i64, usize)>, BacktestError> {
        let conn = self.conn()?;
        let (min, max, count): (Option<i64>, Option<i64>, i64) = conn
            .query_row(
                "SELECT MIN(timestamp), MAX(timestamp), COUNT(*)
                 FROM candles WHERE exchange = ?1 AND symbol = ?2",
                params![exchange, symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => Ok(Some((min, max, count as usize))),
            _ => Ok(None),
        }
    }
}
