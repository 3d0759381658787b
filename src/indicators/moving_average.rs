//! Simple and exponential moving averages

use super::undefined;

/// Mean of each trailing window of `period` values.
///
/// A window containing NaN yields NaN, so warm-up gaps in the input carry
/// through to the output.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = undefined(values.len());
    if period == 0 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = window.iter().sum::<f64>() / period as f64;
    }
    out
}

/// Simple moving average, first defined at `period - 1`
#[inline]
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    rolling_mean(values, period)
}

/// Exponential moving average with smoothing `2 / (period + 1)`.
///
/// Seeded by the SMA of the first `period` defined values; leading NaNs in
/// the input shift the seed accordingly.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = undefined(values.len());
    if period == 0 {
        return out;
    }
    let Some(first) = values.iter().position(|v| v.is_finite()) else {
        return out;
    };
    let seed_at = first + period - 1;
    if seed_at >= values.len() {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = values[first..=seed_at].iter().sum::<f64>() / period as f64;
    out[seed_at] = prev;
    for i in seed_at + 1..values.len() {
        prev = (values[i] - prev) * k + prev;
        out[i] = prev;
    }
    out
}
