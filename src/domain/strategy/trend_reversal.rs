//! Trend-reversal strategy driven by a parabolic stop-and-reverse level.
//!
//! The trend counter is signed: its sign is the direction and its magnitude
//! the number of consecutive bars in that direction (a fresh reversal is ±1).
//! Going long happens when a downtrend flips to +1, going short when an
//! uptrend flips negative. Entries and exits are at the bar's close.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::domain::position::PnlTracker;
use crate::domain::strategy::Strategy;
use std::fmt;

pub const DEFAULT_INITIAL_AF: f64 = 0.02;
pub const DEFAULT_MAX_AF: f64 = 0.2;
pub const DEFAULT_INCREMENT: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendReversal {
    pub initial_af: f64,
    pub max_af: f64,
    pub increment: f64,
}

impl TrendReversal {
    pub fn new(initial_af: f64, max_af: f64, increment: f64) -> Self {
        Self {
            initial_af,
            max_af,
            increment,
        }
    }
}

impl Default for TrendReversal {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_AF, DEFAULT_MAX_AF, DEFAULT_INCREMENT)
    }
}

impl fmt::Display for TrendReversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PSAR(af={}, max_af={}, step={})",
            self.initial_af, self.max_af, self.increment
        )
    }
}

/// Indicator state for one bar; the next bar's state is derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SarState {
    trend: i64,
    extreme_point: f64,
    sar: f64,
    acceleration_factor: f64,
}

impl SarState {
    fn seed(first: &Candle, second: &Candle, initial_af: f64) -> Self {
        if second.close > first.close {
            Self {
                trend: 1,
                extreme_point: second.high,
                sar: first.high,
                acceleration_factor: initial_af,
            }
        } else {
            Self {
                trend: -1,
                extreme_point: second.low,
                sar: first.low,
                acceleration_factor: initial_af,
            }
        }
    }

    /// `before_last` and `last` are the two bars preceding `current`.
    fn next(
        &self,
        params: &TrendReversal,
        before_last: &Candle,
        last: &Candle,
        current: &Candle,
    ) -> Self {
        let mut candidate =
            self.sar + self.acceleration_factor * (self.extreme_point - self.sar);

        let trend = if self.trend < 0 {
            if self.trend <= -2 {
                candidate = candidate.max(last.high.max(before_last.high));
            }
            if candidate < current.high {
                1
            } else {
                self.trend - 1
            }
        } else {
            if self.trend >= 2 {
                candidate = candidate.min(last.low.min(before_last.low));
            }
            if candidate > current.low {
                -1
            } else {
                self.trend + 1
            }
        };

        let extreme_point = match trend {
            -1 => current.low,
            1 => current.high,
            t if t < 0 => current.low.min(self.extreme_point),
            _ => current.high.max(self.extreme_point),
        };

        if trend.abs() == 1 {
            Self {
                trend,
                extreme_point,
                sar: self.extreme_point,
                acceleration_factor: params.initial_af,
            }
        } else {
            let acceleration_factor = if extreme_point == self.extreme_point {
                self.acceleration_factor
            } else {
                params.max_af.min(self.acceleration_factor + params.increment)
            };
            Self {
                trend,
                extreme_point,
                sar: candidate,
                acceleration_factor,
            }
        }
    }
}

impl Strategy for TrendReversal {
    fn name(&self) -> &'static str {
        "PSAR"
    }

    fn min_candles(&self) -> usize {
        3
    }

    fn validate(&self) -> Result<(), BacktestError> {
        for (name, value) in [
            ("initial_af", self.initial_af),
            ("max_af", self.max_af),
            ("increment", self.increment),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(BacktestError::invalid_parameter(
                    name,
                    format!("must be a non-negative number, got {value}"),
                ));
            }
        }
        Ok(())
    }

    fn simulate(&self, candles: &[Candle], tracker: &mut PnlTracker) {
        let [first, second, ..] = candles else {
            return;
        };
        let mut previous = SarState::seed(first, second, self.initial_af);

        for window in candles.windows(3) {
            let [before_last, last, current] = window else {
                continue;
            };
            let next = previous.next(self, before_last, last, current);

            if previous.trend < 0 && next.trend == 1 {
                tracker.enter_long(current.timestamp, current.close);
            } else if previous.trend > 0 && next.trend < 0 {
                tracker.enter_short(current.timestamp, current.close);
            }

            previous = next;
        }
    }
}
