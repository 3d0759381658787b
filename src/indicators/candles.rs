//! Candle shapes for one bar relative to its predecessor

use serde::Serialize;

use crate::{Direction, OHLCVExt, OHLCV};

/// Doji: body under this fraction of the range
const DOJI_BODY_RATIO: f64 = 0.1;
/// Hammer / shooting star: long wick over this multiple of the body
const LONG_WICK_FACTOR: f64 = 2.0;
/// Hammer / shooting star: opposite wick under this multiple of the body
const SHORT_WICK_FACTOR: f64 = 0.5;
/// Harami: prior body at least this multiple of the current one
const HARAMI_BODY_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CandlePattern {
    pub bullish_engulfing: bool,
    pub bearish_engulfing: bool,
    pub hammer: bool,
    pub shooting_star: bool,
    pub doji: bool,
    pub bullish_harami: bool,
    pub bearish_harami: bool,
}

impl CandlePattern {
    /// Direction of the engulfing flag, if any
    pub fn engulfing(&self) -> Option<Direction> {
        match (self.bullish_engulfing, self.bearish_engulfing) {
            (true, _) => Some(Direction::Bullish),
            (_, true) => Some(Direction::Bearish),
            _ => None,
        }
    }

    pub fn harami(&self) -> Option<Direction> {
        match (self.bullish_harami, self.bearish_harami) {
            (true, _) => Some(Direction::Bullish),
            (_, true) => Some(Direction::Bearish),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Classify bar `index` against bar `index - 1`.
///
/// Out-of-range indices yield no flags. A zero-range bar is a doji and
/// nothing else.
pub fn analyze_candle_pattern<T: OHLCV>(bars: &[T], index: usize) -> CandlePattern {
    let mut pattern = CandlePattern::default();
    let Some(cur) = bars.get(index) else {
        return pattern;
    };

    let range = cur.range();
    if range <= f64::EPSILON {
        pattern.doji = true;
        return pattern;
    }

    let body = cur.body();
    pattern.doji = body < DOJI_BODY_RATIO * range;

    if body > 0.0 {
        let (upper, lower) = (cur.upper_shadow(), cur.lower_shadow());
        pattern.hammer = cur.is_bullish()
            && lower > LONG_WICK_FACTOR * body
            && upper < SHORT_WICK_FACTOR * body;
        pattern.shooting_star = cur.is_bearish()
            && upper > LONG_WICK_FACTOR * body
            && lower < SHORT_WICK_FACTOR * body;
    }

    let Some(prev) = index.checked_sub(1).and_then(|p| bars.get(p)) else {
        return pattern;
    };
    let prev_body = prev.body();

    if prev.is_bearish() && cur.is_bullish() {
        pattern.bullish_engulfing =
            cur.open() <= prev.close() && cur.close() >= prev.open() && body > prev_body;
        pattern.bullish_harami = prev_body >= HARAMI_BODY_FACTOR * body
            && cur.open() >= prev.close()
            && cur.close() <= prev.open();
    } else if prev.is_bullish() && cur.is_bearish() {
        pattern.bearish_engulfing =
            cur.open() >= prev.close() && cur.close() <= prev.open() && body > prev_body;
        pattern.bearish_harami = prev_body >= HARAMI_BODY_FACTOR * body
            && cur.open() <= prev.close()
            && cur.close() >= prev.open();
    }

    pattern
}
