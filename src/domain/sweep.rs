//! Grid parameter sweep over one loaded backtest.
//!
//! Every combination runs against the same resampled candles. Results can be
//! ranked by PnL or reduced to the PnL/drawdown Pareto front.

use crate::domain::backtest::Backtest;
use crate::domain::error::BacktestError;
use crate::domain::strategy::{MaCrossover, Strategy, TrendReversal};
use std::cmp::Ordering;

/// Slack for float accumulation when stepping toward an inclusive end.
const RANGE_EPSILON: f64 = 1e-9;

/// Largest number of values a single range may expand to.
pub const MAX_RANGE_VALUES: usize = 10_000;

/// Largest number of parameter combinations one sweep may run.
pub const MAX_SWEEP_COMBINATIONS: usize = 100_000;

/// Inclusive `start..=end` range walked in `step` increments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl ParamRange {
    pub fn single(value: f64) -> Self {
        Self {
            start: value,
            end: value,
            step: 1.0,
        }
    }

    /// Parse `start:end:step` or a single value.
    pub fn parse(name: &str, s: &str) -> Result<Self, BacktestError> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let number = |raw: &str| -> Result<f64, BacktestError> {
            raw.parse::<f64>().map_err(|_| {
                BacktestError::invalid_parameter(name, format!("'{raw}' is not a number"))
            })
        };

        let range = match parts.as_slice() {
            [value] => Self::single(number(*value)?),
            [start, end, step] => Self {
                start: number(*start)?,
                end: number(*end)?,
                step: number(*step)?,
            },
            _ => {
                return Err(BacktestError::invalid_parameter(
                    name,
                    format!("expected start:end:step or a single value, got '{s}'"),
                ));
            }
        };
        range.validate(name)?;
        Ok(range)
    }

    pub fn validate(&self, name: &str) -> Result<(), BacktestError> {
        if !self.start.is_finite() || !self.end.is_finite() || !self.step.is_finite() {
            return Err(BacktestError::invalid_parameter(name, "bounds must be finite"));
        }
        if self.step <= 0.0 {
            return Err(BacktestError::invalid_parameter(name, "step must be positive"));
        }
        if self.end < self.start {
            return Err(BacktestError::invalid_parameter(name, "end is before start"));
        }
        let steps = self.raw_len();
        if !steps.is_finite() || steps > MAX_RANGE_VALUES as f64 {
            return Err(BacktestError::invalid_parameter(
                name,
                format!("range expands to more than {MAX_RANGE_VALUES} values"),
            ));
        }
        Ok(())
    }

    fn raw_len(&self) -> f64 {
        ((self.end - self.start) / self.step + RANGE_EPSILON).floor() + 1.0
    }

    /// Number of values in the range, capped at [`MAX_RANGE_VALUES`].
    pub fn len(&self) -> usize {
        let steps = self.raw_len();
        if steps.is_nan() || steps < 1.0 {
            0
        } else {
            steps.min(MAX_RANGE_VALUES as f64) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.start + self.step * i as f64)
            .collect()
    }

    /// Values rounded to whole bar counts, dropping duplicates and zero.
    pub fn periods(&self) -> Vec<usize> {
        let mut periods: Vec<usize> = self
            .values()
            .into_iter()
            .map(|v| v.round())
            .filter(|v| *v >= 1.0)
            .map(|v| v as usize)
            .collect();
        periods.dedup();
        periods
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepEntry {
    pub label: String,
    pub pnl: f64,
    pub max_drawdown: f64,
    pub trades: usize,
}

fn evaluate(backtest: &mut Backtest, strategy: &dyn Strategy) -> Result<SweepEntry, BacktestError> {
    backtest.execute_backtest(strategy)?;
    Ok(SweepEntry {
        label: strategy.to_string(),
        pnl: backtest.pnl(),
        max_drawdown: backtest.max_drawdown(),
        trades: backtest.trade_count(),
    })
}

fn check_combinations(count: usize) -> Result<(), BacktestError> {
    if count > MAX_SWEEP_COMBINATIONS {
        return Err(BacktestError::invalid_parameter(
            "sweep",
            format!("{count} combinations exceeds the limit of {MAX_SWEEP_COMBINATIONS}"),
        ));
    }
    Ok(())
}

pub fn sweep_trend_reversal(
    backtest: &mut Backtest,
    initial_af: &ParamRange,
    max_af: &ParamRange,
    increment: &ParamRange,
) -> Result<Vec<SweepEntry>, BacktestError> {
    initial_af.validate("initial_af")?;
    max_af.validate("max_af")?;
    increment.validate("increment")?;
    check_combinations(
        initial_af
            .len()
            .saturating_mul(max_af.len())
            .saturating_mul(increment.len()),
    )?;

    let mut entries = Vec::new();
    for af in initial_af.values() {
        for cap in max_af.values() {
            for step in increment.values() {
                let strategy = TrendReversal::new(af, cap, step);
                entries.push(evaluate(backtest, &strategy)?);
            }
        }
    }
    tracing::info!(combinations = entries.len(), "psar sweep finished");
    Ok(entries)
}

/// Combinations where `fast >= slow` are skipped.
pub fn sweep_ma_crossover(
    backtest: &mut Backtest,
    fast: &ParamRange,
    slow: &ParamRange,
) -> Result<Vec<SweepEntry>, BacktestError> {
    fast.validate("fast_period")?;
    slow.validate("slow_period")?;
    check_combinations(fast.len().saturating_mul(slow.len()))?;

    let mut entries = Vec::new();
    for fast_period in fast.periods() {
        for slow_period in slow.periods() {
            if fast_period >= slow_period {
                continue;
            }
            let strategy = MaCrossover::new(fast_period, slow_period);
            entries.push(evaluate(backtest, &strategy)?);
        }
    }
    tracing::info!(combinations = entries.len(), "sma sweep finished");
    Ok(entries)
}

/// Best PnL first; ties broken by smaller drawdown.
pub fn rank(entries: &mut [SweepEntry]) {
    entries.sort_by(|a, b| {
        b.pnl
            .partial_cmp(&a.pnl)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.max_drawdown
                    .partial_cmp(&b.max_drawdown)
                    .unwrap_or(Ordering::Equal)
            })
    });
}

fn dominates(a: &SweepEntry, b: &SweepEntry) -> bool {
    a.pnl >= b.pnl
        && a.max_drawdown <= b.max_drawdown
        && (a.pnl > b.pnl || a.max_drawdown < b.max_drawdown)
}

/// Entries no other entry beats on both PnL and drawdown, ranked.
pub fn pareto_front(entries: &[SweepEntry]) -> Vec<SweepEntry> {
    let mut front: Vec<SweepEntry> = entries
        .iter()
        .filter(|candidate| !entries.iter().any(|other| dominates(other, candidate)))
        .cloned()
        .collect();
    rank(&mut front);
    front
}
