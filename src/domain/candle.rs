//! OHLCV candle representation.

/// One OHLCV aggregate. `timestamp` is epoch milliseconds.
///
/// `low <= min(open, close) <= max(open, close) <= high` is assumed from
/// upstream data and never validated here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Start of the `width_ms` bucket containing this candle, floored to the epoch.
    pub fn bucket_start(&self, width_ms: i64) -> i64 {
        self.timestamp - self.timestamp.rem_euclid(width_ms)
    }

    /// Fold a later candle of the same bucket into this one.
    pub(crate) fn absorb(&mut self, later: &Candle) {
        if later.high > self.high {
            self.high = later.high;
        }
        if later.low < self.low {
            self.low = later.low;
        }
        self.close = later.close;
        self.volume += later.volume;
    }
}

/// Position of the first candle whose timestamp is lower than its predecessor's.
pub fn first_out_of_order(candles: &[Candle]) -> Option<usize> {
    candles
        .windows(2)
        .position(|pair| pair[1].timestamp < pair[0].timestamp)
        .map(|i| i + 1)
}
