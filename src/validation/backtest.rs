//! Historical analog backtest
//!
//! Finds past bars whose RSI, ADX, SMA order and distance from the fast SMA
//! resemble the current bar, then checks whether price moved 5% in the
//! signal's favour soon after each of them.

use std::fmt;

use serde::Serialize;

use crate::{
    indicators::{value_at, IndicatorBundle},
    Side, OHLCV,
};

/// Bars of history required before the current index
pub const MIN_HISTORY: usize = 60;
/// Most recent analog candidates considered
const MAX_LOOKBACK: usize = 100;
/// Warm-up skipped at the start of the series
const WARMUP: usize = 20;
/// Candidates this close to the current bar are excluded
const RECENT_EXCLUSION: usize = 10;
/// Forward horizons checked for the target move
pub const HORIZONS: [usize; 4] = [1, 3, 5, 10];
/// Favourable move that counts as success
pub const TARGET_MOVE: f64 = 0.05;
const MAX_EXAMPLES: usize = 3;

const RSI_TOLERANCE: f64 = 15.0;
const ADX_TOLERANCE: f64 = 15.0;
const POSITION_TOLERANCE: f64 = 0.05;

/// One analog and how it played out
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BacktestExample {
    pub index: usize,
    pub timestamp: Option<i64>,
    pub entry_price: f64,
    /// Largest favourable move over the next 10 bars, as a fraction
    pub max_move: f64,
    pub success: bool,
    /// First horizon that reached the target
    pub horizon: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub side: Side,
    pub total_signals: u32,
    pub successful_signals: u32,
    /// 0.5 when no analogs were found
    pub success_rate: f64,
    pub examples: Vec<BacktestExample>,
}

impl BacktestResult {
    fn empty(side: Side) -> Self {
        Self {
            side,
            total_signals: 0,
            successful_signals: 0,
            success_rate: 0.5,
            examples: Vec::new(),
        }
    }

    /// Confidence multiplier implied by the analog success rate.
    ///
    /// Fewer than three analogs is too small a sample to judge and maps to
    /// a flat 0.8.
    pub fn confidence_multiplier(&self) -> f64 {
        if self.total_signals < 3 {
            return 0.8;
        }
        match self.success_rate {
            r if r >= 0.7 => 1.0,
            r if r >= 0.5 => 0.7,
            r if r >= 0.3 => 0.4,
            _ => 0.0,
        }
    }

    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BacktestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_signals == 0 {
            return write!(f, "no similar {} setups in recent history", self.side);
        }
        write!(
            f,
            "{} similar {} setups, {} reached {:.0}% ({:.0}%)",
            self.total_signals,
            self.side,
            self.successful_signals,
            TARGET_MOVE * 100.0,
            self.success_rate * 100.0
        )
    }
}

/// Market state compared between the current bar and a candidate
#[derive(Debug, Clone, Copy)]
struct MarketState {
    rsi: f64,
    adx: f64,
    uptrend: bool,
    /// (close - SMA fast) / SMA fast
    position: f64,
}

impl MarketState {
    fn at(bundle: &IndicatorBundle, i: usize) -> Option<Self> {
        let sma_fast = value_at(&bundle.sma_fast, i)?;
        let sma_slow = value_at(&bundle.sma_slow, i)?;
        Some(Self {
            rsi: value_at(&bundle.rsi, i)?,
            adx: value_at(&bundle.adx.adx, i)?,
            uptrend: sma_fast > sma_slow,
            position: (bundle.closes[i] - sma_fast) / sma_fast,
        })
    }

    fn is_similar(&self, other: &Self) -> bool {
        (self.rsi - other.rsi).abs() <= RSI_TOLERANCE
            && (self.adx - other.adx).abs() <= ADX_TOLERANCE
            && self.uptrend == other.uptrend
            && (self.position - other.position).abs() <= POSITION_TOLERANCE
    }
}

/// Backtests a preliminary signal against analogous past bars
pub struct BacktestValidator;

impl BacktestValidator {
    /// Scan up to 100 bars before `current` (skipping the 10 most recent)
    /// for analog states and measure how often they paid off.
    pub fn validate<T: OHLCV>(
        side: Side,
        bars: &[T],
        current: usize,
        bundle: &IndicatorBundle,
    ) -> BacktestResult {
        let mut result = BacktestResult::empty(side);
        if current < MIN_HISTORY || current >= bars.len() || bundle.len() != bars.len() {
            return result;
        }
        let Some(now) = MarketState::at(bundle, current) else {
            return result;
        };

        let lookback = MAX_LOOKBACK.min(current - WARMUP);
        for i in (current - lookback)..(current - RECENT_EXCLUSION) {
            if i < WARMUP {
                continue;
            }
            let similar = MarketState::at(bundle, i).is_some_and(|past| past.is_similar(&now));
            if !similar {
                continue;
            }

            result.total_signals += 1;
            let horizon = target_horizon(bars, i, side);
            if horizon.is_some() {
                result.successful_signals += 1;
            }
            if result.examples.len() < MAX_EXAMPLES {
                result.examples.push(BacktestExample {
                    index: i,
                    timestamp: bars[i].timestamp(),
                    entry_price: bars[i].close(),
                    max_move: max_move(bars, i, side),
                    success: horizon.is_some(),
                    horizon,
                });
            }
        }

        if result.total_signals > 0 {
            result.success_rate = result.successful_signals as f64 / result.total_signals as f64;
        }
        result
    }
}

/// Favourable excursion from `entry` to `extreme`
#[inline]
fn excursion(side: Side, entry: f64, high: f64, low: f64) -> f64 {
    match side {
        Side::Buy => (high - entry) / entry,
        Side::Sell => (entry - low) / entry,
    }
}

/// First horizon within which price moved the target in the signal's favour
fn target_horizon<T: OHLCV>(bars: &[T], entry: usize, side: Side) -> Option<usize> {
    let entry_price = bars[entry].close();
    let mut high = entry_price;
    let mut low = entry_price;
    let mut scanned = entry;

    for horizon in HORIZONS {
        let end = entry + horizon;
        if end >= bars.len() {
            break;
        }
        for bar in &bars[scanned + 1..=end] {
            high = high.max(bar.high());
            low = low.min(bar.low());
        }
        scanned = end;
        if excursion(side, entry_price, high, low) >= TARGET_MOVE {
            return Some(horizon);
        }
    }
    None
}

/// Largest favourable move over the next 10 bars (0 when none)
fn max_move<T: OHLCV>(bars: &[T], entry: usize, side: Side) -> f64 {
    let entry_price = bars[entry].close();
    let end = (entry + 11).min(bars.len());
    bars[entry + 1..end]
        .iter()
        .map(|b| excursion(side, entry_price, b.high(), b.low()))
        .fold(0.0, f64::max)
}
