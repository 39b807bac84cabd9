//! Strategy simulation contract and the built-in strategies.
//!
//! A strategy is a parameter set plus one capability: a single pass over a
//! resampled candle series that drives a [`PnlTracker`]. Warmup and parameter
//! checks are shared through the provided [`Strategy::run`].

pub mod ma_cross;
pub mod trend_reversal;

pub use ma_cross::MaCrossover;
pub use trend_reversal::TrendReversal;

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::domain::position::{BacktestResult, PnlTracker};
use std::fmt;
use std::str::FromStr;

pub trait Strategy: fmt::Display {
    /// Short upper-case name used in reports.
    fn name(&self) -> &'static str;

    /// Fewest resampled candles needed to produce any signal.
    fn min_candles(&self) -> usize;

    fn validate(&self) -> Result<(), BacktestError>;

    /// Feed every candle through the strategy's state machine.
    fn simulate(&self, candles: &[Candle], tracker: &mut PnlTracker);

    /// Validate, then simulate. Too little history is a zero result, not an error.
    fn run(&self, candles: &[Candle]) -> Result<BacktestResult, BacktestError> {
        self.validate()?;
        if candles.len() < self.min_candles() {
            tracing::debug!(
                strategy = self.name(),
                candles = candles.len(),
                needed = self.min_candles(),
                "insufficient history"
            );
            return Ok(BacktestResult::default());
        }
        let mut tracker = PnlTracker::new();
        self.simulate(candles, &mut tracker);
        Ok(tracker.finish())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    TrendReversal,
    MaCrossover,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::TrendReversal, StrategyKind::MaCrossover];

    /// Config section holding this strategy's parameters.
    pub fn section(&self) -> &'static str {
        match self {
            StrategyKind::TrendReversal => "psar",
            StrategyKind::MaCrossover => "sma",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "psar" | "trend_reversal" => Ok(StrategyKind::TrendReversal),
            "sma" | "ma_cross" | "crossover" => Ok(StrategyKind::MaCrossover),
            other => Err(BacktestError::invalid_parameter(
                "strategy",
                format!("unknown strategy '{other}' (expected psar or sma)"),
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("psar".parse::<StrategyKind>().unwrap(), StrategyKind::TrendReversal);
        assert_eq!(" PSAR ".parse::<StrategyKind>().unwrap(), StrategyKind::TrendReversal);
        assert_eq!("sma".parse::<StrategyKind>().unwrap(), StrategyKind::MaCrossover);
        assert_eq!("ma_cross".parse::<StrategyKind>().unwrap(), StrategyKind::MaCrossover);
    }

    #[test]
    fn kind_rejects_unknown() {
        let err = "ichimoku".parse::<StrategyKind>().unwrap_err();
        assert!(matches!(err, BacktestError::InvalidParameter { ref name, .. } if name == "strategy"));
    }

    #[test]
    fn kind_display_is_section_name() {
        assert_eq!(StrategyKind::TrendReversal.to_string(), "psar");
        assert_eq!(StrategyKind::MaCrossover.to_string(), "sma");
    }

    #[test]
    fn run_rejects_invalid_parameters_before_warmup_check() {
        let strategy = MaCrossover::new(0, 4);
        assert!(strategy.run(&[]).is_err());
    }
}
