use candlebt::domain::backtest::OPEN_END_TS;
use candlebt::domain::candle::Candle;
use candlebt::domain::position::PnlTracker;
use candlebt::domain::resample::resample;
use candlebt::domain::strategy::{self as strategies, MaCrossover, TrendReversal};
use candlebt::domain::strategy::Strategy as _;
use proptest::prelude::*;

/// Sorted candles with well-formed ranges and whole-number volumes.
fn candles_strategy() -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec(
        (1i64..300_000, 1.0f64..1_000.0, 1.0f64..1_000.0, 0.0f64..50.0, 0u32..1_000),
        1..150,
    )
    .prop_map(|rows| {
        let mut ts = 0i64;
        rows.into_iter()
            .map(|(gap, open, close, spread, volume)| {
                ts += gap;
                Candle::new(
                    ts,
                    open,
                    open.max(close) + spread,
                    open.min(close) - spread.min(0.5),
                    close,
                    f64::from(volume),
                )
            })
            .collect()
    })
}

fn interval_strategy() -> impl Strategy<Value = (&'static str, i64)> {
    prop_oneof![
        Just(("1m", 60_000i64)),
        Just(("5m", 300_000)),
        Just(("15m", 900_000)),
        Just(("1h", 3_600_000)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn resampling_is_idempotent(candles in candles_strategy(), (interval, _) in interval_strategy()) {
        let once = resample(&candles, interval, 0, OPEN_END_TS);
        let twice = resample(&once, interval, 0, OPEN_END_TS);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn resampling_conserves_volume(candles in candles_strategy(), (interval, _) in interval_strategy()) {
        let out = resample(&candles, interval, 0, OPEN_END_TS);
        let before: f64 = candles.iter().map(|c| c.volume).sum();
        let after: f64 = out.iter().map(|c| c.volume).sum();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn buckets_are_aligned_and_ordered(candles in candles_strategy(), (interval, width) in interval_strategy()) {
        let out = resample(&candles, interval, 0, OPEN_END_TS);
        prop_assert!(out.len() <= candles.len());
        prop_assert!(out.iter().all(|c| c.timestamp.rem_euclid(width) == 0));
        prop_assert!(out.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        prop_assert!(out.iter().all(|c| c.high >= c.open.max(c.close) && c.low <= c.open.min(c.close)));
    }

    #[test]
    fn window_bounds_respected(
        candles in candles_strategy(),
        start in 0i64..5_000_000,
        len in 0i64..5_000_000,
    ) {
        let end = start + len;
        let out = resample(&candles, "1m", start, end);
        let inside: Vec<&Candle> = candles
            .iter()
            .filter(|c| c.timestamp >= start && c.timestamp <= end)
            .collect();
        let inside_volume: f64 = inside.iter().map(|c| c.volume).sum();
        let out_volume: f64 = out.iter().map(|c| c.volume).sum();
        prop_assert_eq!(inside_volume, out_volume);
        prop_assert_eq!(out.is_empty(), inside.is_empty());
    }

    #[test]
    fn drawdown_is_monotonic_and_non_negative(
        signals in prop::collection::vec((any::<bool>(), 1.0f64..1_000.0), 0..100),
    ) {
        let mut tracker = PnlTracker::new();
        let mut previous = 0.0;
        for (i, (go_long, price)) in signals.into_iter().enumerate() {
            if go_long {
                tracker.enter_long(i as i64, price);
            } else {
                tracker.enter_short(i as i64, price);
            }
            prop_assert!(tracker.max_drawdown() >= previous);
            previous = tracker.max_drawdown();
        }
        prop_assert!(previous >= 0.0);

        let pnl = tracker.running_pnl();
        let result = tracker.finish();
        let summed: f64 = result.trades.iter().map(|t| t.pnl_pct).sum();
        prop_assert!((result.pnl - summed).abs() <= 1e-6 * (1.0 + summed.abs()));
        prop_assert_eq!(result.pnl, pnl);
    }

    #[test]
    fn strategy_results_are_consistent(candles in candles_strategy()) {
        let series = resample(&candles, "1m", 0, OPEN_END_TS);
        for strategy in [
            Box::new(TrendReversal::default()) as Box<dyn strategies::Strategy>,
            Box::new(MaCrossover::new(2, 5)),
        ] {
            let result = strategy.run(&series).unwrap();
            prop_assert!(result.max_drawdown >= 0.0);
            prop_assert!(result.pnl.is_finite());
            prop_assert!(result.trades.windows(2).all(|w| w[0].exit_timestamp <= w[1].entry_timestamp));
        }
    }
}
