use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use tradechart::prelude::*;

const TOKENS: [&str; 11] = ["1m", "2m", "3m", "5m", "15m", "30m", "1h", "4h", "1d", "1w", "1mo"];

fn date(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(i64::from(offset))
}

fn symbol() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("AAPL".to_string()),
        Just("BTC-USD".to_string()),
        Just("EURUSD=X".to_string()),
        Just("ES=F".to_string()),
        "[A-Z]{1,5}",
    ]
}

fn steps() -> impl Strategy<Value = Vec<NaiveDateTime>> {
    (1i64..=1440, 0usize..300).prop_map(|(minutes, n)| {
        let t0 = date(0).and_hms_opt(9, 30, 0).unwrap();
        (0..n as i32).map(|i| t0 + Duration::minutes(minutes * i64::from(i))).collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn synthesized_candles_hold_ohlc_order(symbol in symbol(), timestamps in steps()) {
        let series = synthesize(&symbol, &timestamps, AssetClass::infer(&symbol)).unwrap();
        prop_assert_eq!(series.len(), timestamps.len());
        for candle in series.iter() {
            prop_assert!(candle.low() <= candle.open() && candle.open() <= candle.high());
            prop_assert!(candle.low() <= candle.close() && candle.close() <= candle.high());
            prop_assert!(candle.low() > 0.0);
            prop_assert!(candle.volume() >= 0.0);
        }
    }

    #[test]
    fn synthesis_is_bit_identical(symbol in symbol(), timestamps in steps()) {
        let bits = |s: &Series| s.iter().flat_map(|c| [c.open(), c.high(), c.low(), c.close(), c.volume()].map(f64::to_bits)).collect::<Vec<_>>();
        let a = synthesize(&symbol, &timestamps, AssetClass::Equity).unwrap();
        let b = synthesize(&symbol, &timestamps, AssetClass::Equity).unwrap();
        prop_assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn sessions_are_strictly_increasing(token in prop::sample::select(TOKENS.to_vec()), start in 0u32..1500, len in 0u32..120) {
        let timestamps = session_timestamps(token, date(start), date(start + len)).unwrap();
        prop_assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn intraday_sessions_stay_in_window(token in prop::sample::select(TOKENS[..8].to_vec()), start in 0u32..1500, len in 0u32..90) {
        let open = chrono::NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let close = chrono::NaiveTime::from_hms_opt(16, 0, 0).unwrap();
        for t in session_timestamps(token, date(start), date(start + len)).unwrap() {
            prop_assert!(t.time() >= open && t.time() < close);
            prop_assert!(chrono::Datelike::weekday(&t).number_from_monday() <= 5);
        }
    }

    #[test]
    fn fibonacci_levels_keep_direction(y0 in -1e6f64..1e6, y1 in -1e6f64..1e6) {
        let levels = fibonacci_levels(y0, y1);
        prop_assert_eq!(levels[0], y0);
        prop_assert!((levels[6] - y1).abs() <= 1e-9 * y1.abs().max(1.0));
        let rising = y1 >= y0;
        let ordered = levels.windows(2).all(|w| if rising { w[0] <= w[1] } else { w[0] >= w[1] });
        prop_assert!(ordered);
    }
}
