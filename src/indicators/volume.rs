//! Volume flow: OBV and per-bar buying/selling pressure

use crate::{OHLCVExt, OHLCV};

/// On-Balance Volume, starting from 0 at the first bar
pub fn obv<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut running = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if let Some(prev) = i.checked_sub(1).map(|p| bars[p].close()) {
            if bar.close() > prev {
                running += bar.volume();
            } else if bar.close() < prev {
                running -= bar.volume();
            }
        }
        out.push(running);
    }
    out
}

/// Signed volume-weighted pressure of one bar.
///
/// 70% weight on where the close sits in the range (rescaled to -1..1),
/// 30% on the body relative to the range. Zero-range bars carry none.
#[inline]
pub fn bar_pressure<T: OHLCV>(bar: &T) -> f64 {
    match bar.close_position() {
        Some(pos) => {
            let body = (bar.close() - bar.open()) / bar.range();
            bar.volume() * (0.7 * (2.0 * pos - 1.0) + 0.3 * body)
        }
        None => 0.0,
    }
}

/// [`bar_pressure`] for every bar
pub fn volume_pressure<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter().map(bar_pressure).collect()
}

/// Mean volume of bars `end - window .. end` (exclusive of `end`)
pub fn average_volume<T: OHLCV>(bars: &[T], end: usize, window: usize) -> Option<f64> {
    if window == 0 || end < window || end > bars.len() {
        return None;
    }
    Some(bars[end - window..end].iter().map(|b| b.volume()).sum::<f64>() / window as f64)
}
