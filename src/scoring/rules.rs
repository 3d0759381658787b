//! Per-bar scoring rules
//!
//! [`score_at`] is the single scoring pass shared by the live engine (last
//! bar, [`ScoreScope::Live`]) and the historical replay (every bar,
//! [`ScoreScope::Replay`]). Rules whose inputs are still warming up abstain.

use super::trace::{BarScore, Rule};
use crate::{
    config::ScoringThresholds,
    indicators::{analyze_candle_pattern, average_volume, value_at, IndicatorBundle},
    Direction, OHLCVExt, OHLCV,
};

/// Bars in the breakout / OBV extreme window
const BREAKOUT_WINDOW: usize = 20;
/// Bars in each half of the price-structure comparison
const STRUCTURE_HALF: usize = 10;
const OBV_TREND_BARS: usize = 10;
const EMA_SLOPE_BARS: usize = 10;
const RSI_DELTA_BARS: usize = 5;
const PRESSURE_BARS: usize = 5;
const SQUEEZE_WIDTH: f64 = 0.05;

/// Which rule families a pass evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreScope {
    /// Every family
    Live,
    /// Trend, momentum, volume and price action only
    Replay,
}

/// Score bar `i`: family sub-scores, then the volatility and trend
/// adjustments. The S/R adjustment and classification are left to the caller.
pub fn score_at<T: OHLCV>(
    bars: &[T],
    bundle: &IndicatorBundle,
    i: usize,
    scope: ScoreScope,
    thresholds: &ScoringThresholds,
) -> BarScore {
    let mut score = BarScore::default();
    if i >= bars.len() {
        return score;
    }

    trend_rules(&mut score, bundle, i);
    momentum_rules(&mut score, bundle, i);
    if scope == ScoreScope::Live {
        bollinger_rules(&mut score, bundle, i);
    }
    volume_rules(&mut score, bars, bundle, i);
    if scope == ScoreScope::Live {
        candle_rules(&mut score, bars, bundle, i);
    }
    price_structure_rule(&mut score, bars, i);
    if scope == ScoreScope::Live {
        pressure_rule(&mut score, bars, bundle, i, thresholds);
    }

    score.breakdown.total = score.breakdown.raw_total() as f64;
    apply_adjustments(&mut score, bundle, i, thresholds);
    score
}

/// Defined value at `i - back`
#[inline]
fn back(series: &[f64], i: usize, back: usize) -> Option<f64> {
    i.checked_sub(back).and_then(|j| value_at(series, j))
}

#[inline]
fn signum(v: f64) -> i32 {
    match Direction::of(v) {
        Direction::Bullish => 1,
        Direction::Bearish => -1,
        Direction::Neutral => 0,
    }
}

// ============================================================
// TREND
// ============================================================

fn trend_rules(score: &mut BarScore, bundle: &IndicatorBundle, i: usize) {
    let close = bundle.closes[i];
    let fast = value_at(&bundle.ema_fast, i);
    let mid = value_at(&bundle.ema_mid, i);

    if let (Some(f), Some(m), Some(s)) = (fast, mid, value_at(&bundle.ema_slow, i)) {
        if f > m && m > s {
            score.fire(Rule::EmaStack, f, 2, true);
        } else if f < m && m < s {
            score.fire(Rule::EmaStack, f, -2, true);
        }
    }

    if let (Some(m), Some(m_prev)) = (mid, back(&bundle.ema_mid, i, EMA_SLOPE_BARS)) {
        let slope = signum(m - m_prev);
        if slope != 0 {
            score.fire(Rule::EmaSlope, (m - m_prev) / m_prev * 100.0, slope, false);
        }
    }

    if let Some(f) = fast {
        let side = signum(close - f);
        if side != 0 {
            score.fire(Rule::PriceVsEma, close, side, false);
        }
    }
}

// ============================================================
// MOMENTUM
// ============================================================

fn momentum_rules(score: &mut BarScore, bundle: &IndicatorBundle, i: usize) {
    if let Some(r) = value_at(&bundle.rsi, i) {
        if r < 30.0 {
            score.fire(Rule::RsiLevel, r, 2, false);
        } else if r > 70.0 {
            score.fire(Rule::RsiLevel, r, -2, false);
        } else if let Some(r_then) = back(&bundle.rsi, i, RSI_DELTA_BARS) {
            let delta = r - r_then;
            if delta >= 5.0 && r < 60.0 {
                score.fire(Rule::RsiMomentum, r, 1, false);
            } else if delta <= -5.0 && r > 40.0 {
                score.fire(Rule::RsiMomentum, r, -1, false);
            }
        }

        if let Some(r_prev) = back(&bundle.rsi, i, 1) {
            if r < 30.0 && r > r_prev {
                score.fire(Rule::RsiReversal, r, 2, true);
            } else if r > 70.0 && r < r_prev {
                score.fire(Rule::RsiReversal, r, -2, true);
            }
        }
    }

    let macd = &bundle.macd;
    let (line, signal) = (value_at(&macd.line, i), value_at(&macd.signal, i));
    let (prev_line, prev_signal) = (back(&macd.line, i, 1), back(&macd.signal, i, 1));

    let cross = match (line, signal, prev_line, prev_signal) {
        (Some(l), Some(s), Some(pl), Some(ps)) if pl <= ps && l > s => 1,
        (Some(l), Some(s), Some(pl), Some(ps)) if pl >= ps && l < s => -1,
        _ => 0,
    };
    if let (true, Some(l)) = (cross != 0, line) {
        score.fire(Rule::MacdCross, l, 3 * cross, true);
    } else if let Some(h) = value_at(&macd.histogram, i) {
        let side = signum(h);
        if side != 0 {
            score.fire(Rule::MacdHistogram, h, side, false);
        }
    }
}

// ============================================================
// BOLLINGER
// ============================================================

fn bollinger_rules(score: &mut BarScore, bundle: &IndicatorBundle, i: usize) {
    let bands = &bundle.bollinger;
    let close = bundle.closes[i];

    if let Some(width) = bands.width_ratio(i) {
        if width < SQUEEZE_WIDTH {
            score.breakdown.squeeze = true;
            score.note(Rule::BollingerSqueeze, width);
        }
    }

    let (Some(upper), Some(lower)) = (value_at(&bands.upper, i), value_at(&bands.lower, i)) else {
        return;
    };
    let prev = i.checked_sub(1).map(|p| {
        let pc = bundle.closes[p];
        let below = value_at(&bands.lower, p).is_some_and(|l| pc < l);
        let above = value_at(&bands.upper, p).is_some_and(|u| pc > u);
        (pc, below, above)
    });
    let Some((prev_close, was_below, was_above)) = prev else {
        return;
    };

    if close < lower && !was_below {
        score.fire(Rule::BollingerExit, close, 3, true);
    } else if close > upper && !was_above {
        score.fire(Rule::BollingerExit, close, -3, true);
    } else if let Some(pos) = bands.position(i, close) {
        if pos <= 0.2 && close > prev_close {
            score.fire(Rule::BollingerZone, pos, 2, false);
        } else if pos >= 0.8 && close < prev_close {
            score.fire(Rule::BollingerZone, pos, -2, false);
        }
    }
}

// ============================================================
// VOLUME
// ============================================================

fn volume_rules<T: OHLCV>(score: &mut BarScore, bars: &[T], bundle: &IndicatorBundle, i: usize) {
    if i < BREAKOUT_WINDOW {
        return;
    }
    let bar = &bars[i];
    let prior = &bars[i - BREAKOUT_WINDOW..i];

    if let Some(avg) = average_volume(bars, i, BREAKOUT_WINDOW).filter(|&v| v > 0.0) {
        let ratio = bar.volume() / avg;
        let prior_high = prior.iter().map(|b| b.high()).fold(f64::NEG_INFINITY, f64::max);
        let prior_low = prior.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
        let side = if bar.close() > prior_high {
            1
        } else if bar.close() < prior_low {
            -1
        } else {
            0
        };
        let points = if ratio >= 3.0 {
            4
        } else if ratio >= 2.0 {
            2
        } else {
            0
        };
        if side != 0 && points != 0 {
            score.fire(Rule::VolumeBreakout, ratio, side * points, true);
        }
    }

    let obv = &bundle.obv;
    let window = &obv[i + 1 - BREAKOUT_WINDOW..=i];
    let obv_change = obv[i] - obv[i - OBV_TREND_BARS];
    let price_change = bundle.closes[i] - bundle.closes[i - OBV_TREND_BARS];
    let at_high = window.iter().all(|&v| obv[i] >= v);
    let at_low = window.iter().all(|&v| obv[i] <= v);

    if at_high && obv_change > 0.0 {
        score.fire(Rule::ObvConfirmation, obv[i], 2, true);
    } else if at_low && obv_change < 0.0 {
        score.fire(Rule::ObvConfirmation, obv[i], -2, true);
    } else if obv_change > 0.0 && price_change > 0.0 {
        score.fire(Rule::ObvTrend, obv_change, 1, false);
    } else if obv_change < 0.0 && price_change < 0.0 {
        score.fire(Rule::ObvTrend, obv_change, -1, false);
    }
}

// ============================================================
// CANDLES
// ============================================================

fn candle_rules<T: OHLCV>(score: &mut BarScore, bars: &[T], bundle: &IndicatorBundle, i: usize) {
    let pattern = analyze_candle_pattern(bars, i);
    let close = bars[i].close();

    if let Some(dir) = pattern.engulfing() {
        score.fire(Rule::Engulfing, close, if dir.is_bullish() { 4 } else { -4 }, true);
    }

    let rsi = value_at(&bundle.rsi, i);
    if pattern.hammer && rsi.is_some_and(|r| r < 40.0) {
        score.fire(Rule::HammerStar, close, 3, true);
    } else if pattern.shooting_star && rsi.is_some_and(|r| r > 60.0) {
        score.fire(Rule::HammerStar, close, -3, true);
    }

    if let Some(dir) = pattern.harami() {
        score.fire(Rule::Harami, close, if dir.is_bullish() { 2 } else { -2 }, false);
    }
}

// ============================================================
// PRICE ACTION / PRESSURE
// ============================================================

fn price_structure_rule<T: OHLCV>(score: &mut BarScore, bars: &[T], i: usize) {
    if i + 1 < 2 * STRUCTURE_HALF {
        return;
    }
    let extremes = |window: &[T]| {
        window.iter().fold((f64::NEG_INFINITY, f64::INFINITY), |(h, l), b| {
            (h.max(b.high()), l.min(b.low()))
        })
    };
    let (first_high, first_low) = extremes(&bars[i + 1 - 2 * STRUCTURE_HALF..=i - STRUCTURE_HALF]);
    let (second_high, second_low) = extremes(&bars[i + 1 - STRUCTURE_HALF..=i]);

    if second_high > first_high && second_low > first_low {
        score.fire(Rule::PriceStructure, second_low, 3, true);
    } else if second_high < first_high && second_low < first_low {
        score.fire(Rule::PriceStructure, second_high, -3, true);
    }
}

fn pressure_rule<T: OHLCV>(
    score: &mut BarScore,
    bars: &[T],
    bundle: &IndicatorBundle,
    i: usize,
    thresholds: &ScoringThresholds,
) {
    let trending = value_at(&bundle.adx.adx, i).is_some_and(|a| a > thresholds.adx_trending);
    if !trending || i + 1 < PRESSURE_BARS {
        return;
    }
    let avg = bundle.pressure[i + 1 - PRESSURE_BARS..=i].iter().sum::<f64>() / PRESSURE_BARS as f64;
    let volume = bars[i].volume();
    if volume > 0.0 && avg.abs() > 0.3 * volume {
        score.fire(Rule::Pressure, avg, 2 * signum(avg), true);
    }
}

// ============================================================
// ADJUSTMENTS / GATES
// ============================================================

/// Volatility damping, then the strong-trend bonus
fn apply_adjustments(
    score: &mut BarScore,
    bundle: &IndicatorBundle,
    i: usize,
    thresholds: &ScoringThresholds,
) {
    let close = bundle.closes[i];
    if let Some(atr) = value_at(&bundle.atr, i) {
        let ratio = atr / close;
        if ratio > thresholds.volatility_ratio.get() && score.breakdown.total > 0.0 {
            let damped = score.breakdown.total * thresholds.volatility_damping.get();
            score.breakdown.volatility_penalty = true;
            score.adjust(Rule::VolatilityPenalty, ratio, damped);
        }
    }

    if let Some(adx) = value_at(&bundle.adx.adx, i) {
        let sign = signum(score.breakdown.total);
        if adx > thresholds.adx_trending && sign != 0 {
            let bonus = 2.0 * sign as f64;
            score.breakdown.adx_bonus = bonus;
            score.adjust(Rule::AdxBonus, adx, score.breakdown.total + bonus);
        }
    }
}

/// Pre-filter that forces HOLD at bar `i`
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    InsufficientHistory,
    /// Indicator bundle computed over a different number of bars
    MisalignedIndicators,
    Illiquid,
    Ranging,
}

impl Gate {
    pub fn rule(self) -> Rule {
        match self {
            Gate::InsufficientHistory => Rule::InsufficientHistory,
            Gate::MisalignedIndicators => Rule::MisalignedIndicators,
            Gate::Illiquid => Rule::Illiquid,
            Gate::Ranging => Rule::Ranging,
        }
    }
}

/// Liquidity and ranging-market gates at bar `i`, with the reading that
/// tripped them. An undefined ADX never trips the ranging gate.
pub fn market_gate<T: OHLCV>(
    bars: &[T],
    bundle: &IndicatorBundle,
    i: usize,
    thresholds: &ScoringThresholds,
) -> Option<(Gate, f64)> {
    let window = thresholds.turnover_window.get().min(i + 1);
    let turnover = bars[i + 1 - window..=i].iter().map(|b| b.turnover()).sum::<f64>() / window as f64;
    if turnover < thresholds.min_avg_turnover {
        return Some((Gate::Illiquid, turnover));
    }

    match value_at(&bundle.adx.adx, i) {
        Some(adx) if adx < thresholds.adx_ranging => Some((Gate::Ranging, adx)),
        _ => None,
    }
}
