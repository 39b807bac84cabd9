//! Resampling timeframe parsing (`<integer><unit>`, unit one of m/h/d).

use crate::domain::error::BacktestError;
use std::fmt;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeframe {
    pub label: String,
    pub width_ms: i64,
}

impl Timeframe {
    pub fn parse(interval: &str) -> Result<Self, BacktestError> {
        let trimmed = interval.trim();
        let invalid = |reason: String| BacktestError::InvalidInterval {
            interval: interval.to_string(),
            reason,
        };

        let unit = trimmed
            .chars()
            .last()
            .ok_or_else(|| invalid("empty interval".into()))?;
        let unit_ms = match unit {
            'm' => MINUTE_MS,
            'h' => HOUR_MS,
            'd' => DAY_MS,
            other => return Err(invalid(format!("unknown unit '{other}'"))),
        };

        let number_part = &trimmed[..trimmed.len() - unit.len_utf8()];
        let count: i64 = number_part
            .parse()
            .map_err(|_| invalid(format!("'{number_part}' is not an integer")))?;

        let width_ms = count
            .checked_mul(unit_ms)
            .ok_or_else(|| invalid("width overflows".into()))?;
        if width_ms <= 0 {
            return Err(invalid("width must be positive".into()));
        }

        Ok(Self {
            label: trimmed.to_string(),
            width_ms,
        })
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}
