//! Time-bucket resampling of fine-grained candles.
//!
//! Input must be sorted ascending by timestamp. Buckets are aligned to the
//! epoch; empty buckets are not materialised.

use crate::domain::candle::Candle;
use crate::domain::timeframe::Timeframe;

/// Resample `candles` into `interval`-wide buckets within `[start_ts, end_ts]`.
///
/// An unparsable interval yields an empty series (logged), which callers
/// treat the same as missing data.
pub fn resample(candles: &[Candle], interval: &str, start_ts: i64, end_ts: i64) -> Vec<Candle> {
    match Timeframe::parse(interval) {
        Ok(timeframe) => resample_to(candles, &timeframe, start_ts, end_ts),
        Err(e) => {
            tracing::warn!("{e}");
            Vec::new()
        }
    }
}

pub fn resample_to(
    candles: &[Candle],
    timeframe: &Timeframe,
    start_ts: i64,
    end_ts: i64,
) -> Vec<Candle> {
    let width = timeframe.width_ms;
    let mut result = Vec::new();
    let mut current: Option<Candle> = None;

    for candle in candles {
        if candle.timestamp < start_ts {
            continue;
        }
        if candle.timestamp > end_ts {
            break;
        }

        match current.as_mut() {
            Some(bucket) if candle.timestamp < bucket.timestamp.saturating_add(width) => {
                bucket.absorb(candle);
            }
            _ => {
                if let Some(done) = current.take() {
                    result.push(done);
                }
                current = Some(Candle {
                    timestamp: candle.bucket_start(width),
                    ..*candle
                });
            }
        }
    }

    if let Some(done) = current {
        result.push(done);
    }

    tracing::debug!(
        candles = result.len(),
        timeframe = %timeframe,
        "resampled candles"
    );
    result
}
