//! Indicator library
//!
//! Pure functions over a bar slice. Every series is index-aligned with the
//! input and holds NaN until the indicator has enough history; nothing here
//! fails on short input.

pub mod candles;
pub mod levels;
pub mod momentum;
pub mod moving_average;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use candles::{analyze_candle_pattern, CandlePattern};
pub use levels::{find_support_resistance, SupportResistanceLevel};
pub use momentum::{macd, rsi, Macd};
pub use moving_average::{ema, rolling_mean, sma};
pub use trend::{adx, AdxSeries};
pub use volatility::{atr, bollinger, true_range, BollingerBands};
pub use volume::{average_volume, bar_pressure, obv, volume_pressure};

use serde::Serialize;

use crate::{config::IndicatorPeriods, OHLCV};

/// Series of `n` undefined values
#[inline]
pub(crate) fn undefined(n: usize) -> Vec<f64> {
    vec![f64::NAN; n]
}

/// Defined value of `series` at `i`, or None during warm-up / out of range
#[inline]
pub fn value_at(series: &[f64], i: usize) -> Option<f64> {
    series.get(i).copied().filter(|v| v.is_finite())
}

/// Close prices of `bars`
pub fn closes<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter().map(|b| b.close()).collect()
}

// ============================================================
// INDICATOR BUNDLE
// ============================================================

/// Every indicator series the scoring pipeline reads, computed once per
/// symbol and shared by the live engine, the validators and the replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorBundle {
    pub closes: Vec<f64>,
    pub sma_fast: Vec<f64>,
    pub sma_slow: Vec<f64>,
    pub ema_fast: Vec<f64>,
    pub ema_mid: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub rsi: Vec<f64>,
    pub macd: Macd,
    pub bollinger: BollingerBands,
    pub atr: Vec<f64>,
    pub obv: Vec<f64>,
    pub adx: AdxSeries,
    pub pressure: Vec<f64>,
}

impl IndicatorBundle {
    pub fn compute<T: OHLCV>(bars: &[T], periods: &IndicatorPeriods) -> Self {
        let closes = closes(bars);
        Self {
            sma_fast: sma(&closes, periods.sma_fast.get()),
            sma_slow: sma(&closes, periods.sma_slow.get()),
            ema_fast: ema(&closes, periods.ema_fast.get()),
            ema_mid: ema(&closes, periods.ema_mid.get()),
            ema_slow: ema(&closes, periods.ema_slow.get()),
            rsi: rsi(&closes, periods.rsi.get()),
            macd: macd(
                &closes,
                periods.macd_fast.get(),
                periods.macd_slow.get(),
                periods.macd_signal.get(),
            ),
            bollinger: bollinger(&closes, periods.bollinger.get(), periods.bollinger_k),
            atr: atr(bars, periods.atr.get()),
            obv: obv(bars),
            adx: adx(bars, periods.adx.get()),
            pressure: volume_pressure(bars),
            closes,
        }
    }

    /// Number of bars the bundle was computed over
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}
