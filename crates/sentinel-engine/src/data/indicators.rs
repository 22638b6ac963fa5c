//! Technical indicator grid computed from daily bars

use std::collections::BTreeMap;

use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage, FastStochastic, KeltnerChannel,
    MovingAverageConvergenceDivergence, OnBalanceVolume, RelativeStrengthIndex, SimpleMovingAverage,
};
use ta::{Close, DataItem, High, Low, Next};

use super::yahoo::PriceBar;
use crate::error::{Result, SentinelError};

/// Fewer bars than this yields an empty grid
pub const MIN_BARS: usize = 50;

/// Indicators whose lookback can exceed `MIN_BARS`; left out until filled
const LONG_WINDOWS: [(&str, usize); 1] = [("sma_200", 200)];

fn indicator_err(e: ta::errors::TaError) -> SentinelError {
    SentinelError::IndicatorError(e.to_string())
}

/// Latest value of every indicator, keyed by name.
///
/// Bars that fail OHLC validation are skipped.
pub fn compute_indicators(bars: &[PriceBar]) -> Result<BTreeMap<String, f64>> {
    let items: Vec<DataItem> = bars
        .iter()
        .filter_map(|bar| {
            DataItem::builder()
                .open(bar.open)
                .high(bar.high)
                .low(bar.low)
                .close(bar.close)
                .volume(bar.volume)
                .build()
                .ok()
        })
        .collect();

    let mut out = BTreeMap::new();
    let [.., previous, last] = items.as_slice() else {
        return Ok(out);
    };
    if items.len() < MIN_BARS {
        return Ok(out);
    }

    let mut sma_50 = SimpleMovingAverage::new(50).map_err(indicator_err)?;
    let mut sma_200 = SimpleMovingAverage::new(200).map_err(indicator_err)?;
    let mut ema_20 = ExponentialMovingAverage::new(20).map_err(indicator_err)?;
    let mut rsi = RelativeStrengthIndex::new(14).map_err(indicator_err)?;
    let mut macd = MovingAverageConvergenceDivergence::new(12, 26, 9).map_err(indicator_err)?;
    let mut bb = BollingerBands::new(20, 2.0).map_err(indicator_err)?;
    let mut kc = KeltnerChannel::new(20, 2.0).map_err(indicator_err)?;
    let mut atr = AverageTrueRange::new(14).map_err(indicator_err)?;
    let mut stoch = FastStochastic::new(14).map_err(indicator_err)?;
    let mut obv = OnBalanceVolume::new();

    for item in &items {
        let close = item.close();
        let values = [
            ("sma_50", sma_50.next(close)),
            ("sma_200", sma_200.next(close)),
            ("ema_20", ema_20.next(close)),
            ("rsi", rsi.next(close)),
            ("atr", atr.next(item)),
            ("stoch_k", stoch.next(item)),
            ("obv", obv.next(item)),
        ];
        out.extend(values.map(|(k, v)| (k.to_string(), v)));

        let m = macd.next(close);
        out.insert("macd".to_string(), m.macd);
        out.insert("macd_signal".to_string(), m.signal);
        out.insert("macd_hist".to_string(), m.histogram);

        let b = bb.next(close);
        out.insert("bb_upper".to_string(), b.upper);
        out.insert("bb_lower".to_string(), b.lower);

        out.insert("kc_upper".to_string(), kc.next(item).upper);
    }

    for (key, window) in LONG_WINDOWS {
        if items.len() < window {
            out.remove(key);
        }
    }

    // classic floor pivots from the previous session
    let pivot = (previous.high() + previous.low() + previous.close()) / 3.0;
    out.insert("current_price".to_string(), last.close());
    out.insert("pivot_point".to_string(), pivot);
    out.insert("r1".to_string(), 2.0 * pivot - previous.low());
    out.insert("s1".to_string(), 2.0 * pivot - previous.high());

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bars(n: usize) -> Vec<PriceBar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                PriceBar {
                    timestamp: Utc::now(),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_short_history_yields_empty_grid() {
        assert!(compute_indicators(&bars(MIN_BARS - 1)).unwrap().is_empty());
        assert!(compute_indicators(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_full_grid_on_uptrend() {
        let grid = compute_indicators(&bars(250)).unwrap();
        for key in [
            "current_price", "sma_50", "sma_200", "ema_20", "rsi", "macd", "macd_signal",
            "macd_hist", "bb_upper", "bb_lower", "kc_upper", "atr", "obv", "stoch_k",
            "pivot_point", "r1", "s1",
        ] {
            assert!(grid.contains_key(key), "missing {key}");
        }

        assert!((grid["current_price"] - 349.0).abs() < 1e-9);
        assert!(grid["sma_50"] > grid["sma_200"]);
        assert!(grid["rsi"] > 70.0);
        assert!(grid["macd"] > 0.0);
        assert!(grid["bb_upper"] > grid["bb_lower"]);
        // pivot of the previous bar: (349 + 347 + 348) / 3
        assert!((grid["pivot_point"] - 348.0).abs() < 1e-9);
        assert!((grid["r1"] - 349.0).abs() < 1e-9);
        assert!((grid["s1"] - 347.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_windows_wait_for_enough_history() {
        let grid = compute_indicators(&bars(120)).unwrap();
        assert!(!grid.contains_key("sma_200"));
        assert!(grid.contains_key("sma_50"));
        assert!((grid["current_price"] - 219.0).abs() < 1e-9);

        assert!(compute_indicators(&bars(199)).unwrap().get("sma_200").is_none());
        assert!(compute_indicators(&bars(200)).unwrap().contains_key("sma_200"));
    }

    #[test]
    fn test_invalid_bars_are_skipped() {
        let mut history = bars(60);
        for bar in history.iter_mut().take(15) {
            bar.low = bar.high + 5.0;
        }
        assert!(compute_indicators(&history).unwrap().is_empty());
    }
}
