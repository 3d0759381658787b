//! Post-classification checks
//!
//! Both validators are advisory: they describe how trustworthy a BUY/SELL
//! looks without changing it, unless [`crate::config::AdvisoryPolicy`] asks
//! for enforcement.

pub mod backtest;
pub mod quality;

pub use backtest::{BacktestExample, BacktestResult, BacktestValidator};
pub use quality::{
    is_false_breakout, is_stop_hunt, RedFlag, RedFlagKind, SignalQuality, SignalValidator, Verdict,
};

use serde::Serialize;

use crate::{
    indicators::{value_at, IndicatorBundle},
    OHLCV,
};

/// Indicator readings at one bar, as the signal validator consumes them
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub adx: Option<f64>,
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
}

impl IndicatorSnapshot {
    pub fn at<T: OHLCV>(bars: &[T], bundle: &IndicatorBundle, i: usize) -> Self {
        Self {
            close: bars.get(i).map_or(f64::NAN, |b| b.close()),
            adx: value_at(&bundle.adx.adx, i),
            sma_fast: value_at(&bundle.sma_fast, i),
            sma_slow: value_at(&bundle.sma_slow, i),
            ema_slow: value_at(&bundle.ema_slow, i),
            rsi: value_at(&bundle.rsi, i),
            atr: value_at(&bundle.atr, i),
        }
    }
}
