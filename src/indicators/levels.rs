//! Support and resistance from clustered pivots

use std::collections::VecDeque;

use serde::Serialize;

use crate::OHLCV;

/// Bars on each side a pivot must dominate
pub const PIVOT_RADIUS: usize = 5;
/// Pivots within this relative distance merge into one level
pub const CLUSTER_TOLERANCE: f64 = 0.02;
/// Touches needed for full strength
const FULL_STRENGTH_TOUCHES: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportResistanceLevel {
    /// Mean price of the clustered pivots
    pub price: f64,
    pub touches: u32,
    /// Built from at least one pivot low
    pub is_support: bool,
    /// Built from at least one pivot high
    pub is_resistance: bool,
    /// `min(1, touches / 5)`
    pub strength: f64,
}

impl SupportResistanceLevel {
    fn new(price: f64, is_high: bool) -> Self {
        let mut level = Self {
            price,
            touches: 0,
            is_support: false,
            is_resistance: false,
            strength: 0.0,
        };
        level.touch(price, is_high);
        level
    }

    fn touch(&mut self, price: f64, is_high: bool) {
        let n = self.touches as f64;
        self.price = (self.price * n + price) / (n + 1.0);
        self.touches += 1;
        self.strength = (self.touches as f64 / FULL_STRENGTH_TOUCHES).min(1.0);
        if is_high {
            self.is_resistance = true;
        } else {
            self.is_support = true;
        }
    }

    /// Relative distance from `price` to the level
    pub fn distance(&self, price: f64) -> f64 {
        (price - self.price).abs() / self.price
    }
}

/// Window extrema of width `2 * PIVOT_RADIUS + 1`, centred on each eligible
/// bar. Monotonic deque, single pass. `beats(a, b)` is true when `a` is
/// strictly more extreme than `b`.
///
/// A bar is a pivot only when it is the earliest extreme in its window, so a
/// run of equal highs or lows yields one pivot at its first bar.
fn window_extrema(values: &[f64], beats: impl Fn(f64, f64) -> bool) -> Vec<bool> {
    let width = 2 * PIVOT_RADIUS + 1;
    let mut is_pivot = vec![false; values.len()];
    let mut deque: VecDeque<usize> = VecDeque::new();

    for (i, &v) in values.iter().enumerate() {
        // equal values stay queued behind the earlier one
        while deque.back().is_some_and(|&b| beats(v, values[b])) {
            deque.pop_back();
        }
        deque.push_back(i);
        if deque.front().is_some_and(|&f| f + width <= i) {
            deque.pop_front();
        }
        if i + 1 >= width {
            let centre = i - PIVOT_RADIUS;
            is_pivot[centre] = deque.front() == Some(&centre);
        }
    }
    is_pivot
}

/// Support/resistance levels from pivots in the last `lookback` bars.
///
/// Pivots are clustered in chronological order into the first level within
/// 2%. The result is sorted by strength (descending), then price.
pub fn find_support_resistance<T: OHLCV>(bars: &[T], lookback: usize) -> Vec<SupportResistanceLevel> {
    let start = bars.len().saturating_sub(lookback);
    let window = &bars[start..];

    let highs: Vec<f64> = window.iter().map(|b| b.high()).collect();
    let lows: Vec<f64> = window.iter().map(|b| b.low()).collect();
    let pivot_highs = window_extrema(&highs, |a, b| a > b);
    let pivot_lows = window_extrema(&lows, |a, b| a < b);

    let mut levels: Vec<SupportResistanceLevel> = Vec::new();
    let mut add = |price: f64, is_high: bool| {
        match levels
            .iter_mut()
            .find(|l| l.distance(price) <= CLUSTER_TOLERANCE)
        {
            Some(level) => level.touch(price, is_high),
            None => levels.push(SupportResistanceLevel::new(price, is_high)),
        }
    };

    for i in 0..window.len() {
        if pivot_highs[i] {
            add(highs[i], true);
        }
        if pivot_lows[i] {
            add(lows[i], false);
        }
    }

    levels.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then(a.price.total_cmp(&b.price))
    });
    levels
}
