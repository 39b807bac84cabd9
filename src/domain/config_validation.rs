//! Configuration validation.
//!
//! Validates every config field before any data is touched.

use crate::domain::backtest::OPEN_END_TS;
use crate::domain::error::BacktestError;
use crate::domain::strategy::StrategyKind;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_store(config)?;
    validate_interval(config)?;
    validate_dates(config)?;
    validate_strategy_names(config)?;
    validate_psar(config)?;
    validate_sma(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// `YYYY-MM-DD` at midnight UTC, in epoch milliseconds.
pub fn date_to_ms(section: &str, key: &str, value: &str) -> Result<i64, BacktestError> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(section, key, "invalid date format (expected YYYY-MM-DD)"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| invalid(section, key, "date out of range"))
}

/// Configured `[start, end]` window in ms, defaulting to the whole history.
pub fn window_ms(config: &dyn ConfigPort) -> Result<(i64, i64), BacktestError> {
    let start = match config.get_string("backtest", "start_date") {
        Some(s) if !s.trim().is_empty() => date_to_ms("backtest", "start_date", &s)?,
        _ => 0,
    };
    let end = match config.get_string("backtest", "end_date") {
        Some(s) if !s.trim().is_empty() => date_to_ms("backtest", "end_date", &s)?,
        _ => OPEN_END_TS,
    };
    Ok((start, end))
}

pub const MAX_POOL_SIZE: u32 = 64;

fn validate_store(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let backend = config
        .get_string("store", "backend")
        .unwrap_or_else(|| "sqlite".to_string());
    match backend.trim().to_lowercase().as_str() {
        "sqlite" | "csv" => {}
        other => {
            return Err(invalid(
                "store",
                "backend",
                format!("unknown backend '{other}' (expected sqlite or csv)"),
            ));
        }
    }
    config.require_string("store", "path")?;
    pool_size(config)?;
    Ok(())
}

/// `[store] pool_size`, defaulting to 4 and bounded by [`MAX_POOL_SIZE`].
pub fn pool_size(config: &dyn ConfigPort) -> Result<u32, BacktestError> {
    let raw = config.get_int("store", "pool_size", 4);
    u32::try_from(raw)
        .ok()
        .filter(|n| (1..=MAX_POOL_SIZE).contains(n))
        .ok_or_else(|| {
            invalid(
                "store",
                "pool_size",
                format!("pool_size {raw} must be between 1 and {MAX_POOL_SIZE}"),
            )
        })
}

fn validate_interval(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if let Some(interval) = config.get_string("backtest", "interval") {
        Timeframe::parse(&interval)?;
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let (start, end) = window_ms(config)?;
    if start > end {
        return Err(invalid(
            "backtest",
            "end_date",
            "end_date must not be before start_date",
        ));
    }
    Ok(())
}

fn validate_strategy_names(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match config.get_string("backtest", "strategy") {
        Some(name) if name.trim().eq_ignore_ascii_case("all") => Ok(()),
        Some(name) => name
            .parse::<StrategyKind>()
            .map(|_| ())
            .map_err(|e| invalid("backtest", "strategy", e.to_string())),
        None => Ok(()),
    }
}

fn validate_psar(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    for key in ["initial_af", "max_af", "increment"] {
        let value = config.get_double("psar", key, 0.0);
        if !value.is_finite() || value < 0.0 {
            return Err(invalid("psar", key, format!("{key} must be non-negative")));
        }
    }
    Ok(())
}

fn validate_sma(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    for key in ["fast_period", "slow_period"] {
        if config.get_int("sma", key, 1) < 1 {
            return Err(invalid("sma", key, format!("{key} must be at least 1")));
        }
    }
    Ok(())
}
