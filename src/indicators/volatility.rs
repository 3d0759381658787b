//! Volatility: Bollinger Bands, true range and ATR

use serde::Serialize;

use super::{moving_average::sma, undefined, value_at};
use crate::OHLCV;

// ============================================================
// BOLLINGER BANDS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BollingerBands {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

impl BollingerBands {
    /// Band width relative to the middle band
    pub fn width_ratio(&self, i: usize) -> Option<f64> {
        let (u, l, m) = (
            value_at(&self.upper, i)?,
            value_at(&self.lower, i)?,
            value_at(&self.middle, i)?,
        );
        (m > 0.0).then(|| (u - l) / m)
    }

    /// Where `price` sits between the bands (0 = lower, 1 = upper).
    /// None when the bands have collapsed.
    pub fn position(&self, i: usize, price: f64) -> Option<f64> {
        let (u, l) = (value_at(&self.upper, i)?, value_at(&self.lower, i)?);
        let width = u - l;
        (width > f64::EPSILON).then(|| (price - l) / width)
    }
}

/// Bollinger Bands around an SMA, using the population standard deviation
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> BollingerBands {
    let middle = sma(closes, period);
    let mut upper = undefined(closes.len());
    let mut lower = undefined(closes.len());

    for (i, &m) in middle.iter().enumerate() {
        if m.is_nan() {
            continue;
        }
        let window = &closes[i + 1 - period..=i];
        let variance = window.iter().map(|c| (c - m).powi(2)).sum::<f64>() / period as f64;
        let sd = variance.sqrt();
        upper[i] = m + k * sd;
        lower[i] = m - k * sd;
    }

    BollingerBands {
        middle,
        upper,
        lower,
    }
}

// ============================================================
// TRUE RANGE / ATR
// ============================================================

/// True range per bar; the first bar has no prior close and uses high - low
pub fn true_range<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = bar.high() - bar.low();
            match i.checked_sub(1).map(|p| bars[p].close()) {
                Some(pc) => hl.max((bar.high() - pc).abs()).max((bar.low() - pc).abs()),
                None => hl,
            }
        })
        .collect()
}

/// Average True Range, Wilder-smoothed.
///
/// First value at index `period`: the mean of the true ranges of bars
/// `1..=period`, the ones that have a previous close.
pub fn atr<T: OHLCV>(bars: &[T], period: usize) -> Vec<f64> {
    let tr = true_range(bars);
    let mut out = undefined(bars.len());
    if period == 0 || bars.len() <= period {
        return out;
    }

    let p = period as f64;
    let mut prev = tr[1..=period].iter().sum::<f64>() / p;
    out[period] = prev;
    for i in period + 1..bars.len() {
        prev = (prev * (p - 1.0) + tr[i]) / p;
        out[i] = prev;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PricePoint;

    fn bar(o: f64, h: f64, l: f64, c: f64) -> PricePoint {
        PricePoint::new(0, o, h, l, c, 1)
    }

    #[test]
    fn test_bollinger_population_std() {
        let closes = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bands = bollinger(&closes, 8, 2.0);
        // mean 5, population sd 2
        assert_eq!(bands.middle[7], 5.0);
        assert_eq!(bands.upper[7], 9.0);
        assert_eq!(bands.lower[7], 1.0);
        assert!(bands.upper[6].is_nan());
        assert_eq!(bands.position(7, 5.0), Some(0.5));
        assert_eq!(bands.width_ratio(7), Some(1.6));
    }

    #[test]
    fn test_bollinger_flat_collapses() {
        let bands = bollinger(&[3.0; 5], 5, 2.0);
        assert_eq!(bands.upper[4], 3.0);
        assert_eq!(bands.lower[4], 3.0);
        assert_eq!(bands.position(4, 3.0), None);
        assert_eq!(bands.width_ratio(4), Some(0.0));
    }

    #[test]
    fn test_true_range_uses_gap() {
        let bars = [bar(10.0, 11.0, 9.0, 10.0), bar(13.0, 14.0, 12.5, 13.5)];
        let tr = true_range(&bars);
        assert_eq!(tr[0], 2.0);
        // gap up: high - prev close
        assert_eq!(tr[1], 4.0);
    }

    #[test]
    fn test_atr_seed_and_smoothing() {
        let bars: Vec<_> = (0..6).map(|_| bar(10.0, 11.0, 9.0, 10.0)).collect();
        let out = atr(&bars, 3);
        assert!(out[2].is_nan());
        assert_eq!(out[3], 2.0);
        assert_eq!(out[5], 2.0);
        assert!(atr(&bars[..3], 3).iter().all(|v| v.is_nan()));
    }
}
