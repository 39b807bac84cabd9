//! Dual simple-moving-average crossover strategy.
//!
//! Always in the market once the slow window fills: long while the fast
//! average is above the slow one, short while it is below, holding on ties.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::domain::position::PnlTracker;
use crate::domain::strategy::Strategy;
use std::collections::VecDeque;
use std::fmt;

pub const DEFAULT_FAST_PERIOD: usize = 9;
pub const DEFAULT_SLOW_PERIOD: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaCrossover {
    pub fast_period: usize,
    pub slow_period: usize,
}

impl MaCrossover {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
        }
    }
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self::new(DEFAULT_FAST_PERIOD, DEFAULT_SLOW_PERIOD)
    }
}

impl fmt::Display for MaCrossover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SMA({}/{})", self.fast_period, self.slow_period)
    }
}

/// Trailing window of closes with a running sum.
///
/// The sum accumulates rounding error as values enter and leave, so two means
/// over identical non-representable closes may differ in the last bit and
/// break an exact tie that would otherwise hold the position.
#[derive(Debug)]
struct RollingMean {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingMean {
    fn new(period: usize) -> Self {
        Self {
            period,
            values: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }

    fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;
        if self.values.len() > self.period {
            if let Some(evicted) = self.values.pop_front() {
                self.sum -= evicted;
            }
        }
    }

    fn is_full(&self) -> bool {
        self.values.len() >= self.period
    }

    fn mean(&self) -> f64 {
        self.sum / self.period as f64
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &'static str {
        "SMA"
    }

    fn min_candles(&self) -> usize {
        self.slow_period
    }

    fn validate(&self) -> Result<(), BacktestError> {
        if self.fast_period == 0 {
            return Err(BacktestError::invalid_parameter(
                "fast_period",
                "must be at least 1",
            ));
        }
        if self.slow_period == 0 {
            return Err(BacktestError::invalid_parameter(
                "slow_period",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    fn simulate(&self, candles: &[Candle], tracker: &mut PnlTracker) {
        let mut fast = RollingMean::new(self.fast_period);
        let mut slow = RollingMean::new(self.slow_period);

        for candle in candles {
            fast.push(candle.close);
            slow.push(candle.close);

            if !slow.is_full() {
                continue;
            }

            let fast_avg = fast.mean();
            let slow_avg = slow.mean();

            if fast_avg > slow_avg && !tracker.position().is_long() {
                tracker.enter_long(candle.timestamp, candle.close);
            } else if fast_avg < slow_avg && !tracker.position().is_short() {
                tracker.enter_short(candle.timestamp, candle.close);
            }
        }
    }
}
