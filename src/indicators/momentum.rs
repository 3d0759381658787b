//! Momentum oscillators: RSI and MACD

use serde::Serialize;

use super::{
    moving_average::{ema, sma},
    undefined,
};

// ============================================================
// RSI
// ============================================================

/// RSI from Wilder-smoothed average gain and loss
#[inline]
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Relative Strength Index.
///
/// The averages are seeded with the mean gain and loss over the first
/// `period` changes, then Wilder-smoothed. The first value lands on index
/// `period + 1`.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = undefined(n);
    if period == 0 || n < period + 2 {
        return out;
    }

    let change = |i: usize| closes[i] - closes[i - 1];
    let p = period as f64;

    let (mut avg_gain, mut avg_loss) = (1..=period).fold((0.0, 0.0), |(g, l), i| {
        let c = change(i);
        (g + c.max(0.0), l + (-c).max(0.0))
    });
    avg_gain /= p;
    avg_loss /= p;

    for (i, slot) in out.iter_mut().enumerate().skip(period + 1) {
        let c = change(i);
        avg_gain = (avg_gain * (p - 1.0) + c.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-c).max(0.0)) / p;
        *slot = rsi_value(avg_gain, avg_loss);
    }
    out
}

// ============================================================
// MACD
// ============================================================

/// MACD line, signal line and histogram, index-aligned with the input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Macd {
    pub line: Vec<f64>,
    /// Simple moving average of `line` (not the textbook EMA)
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD with an SMA-smoothed signal line
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = sma(&line, signal);
    let histogram = line.iter().zip(&signal_line).map(|(l, s)| l - s).collect();

    Macd {
        line,
        signal: signal_line,
        histogram,
    }
}
