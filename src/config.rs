//! Analyzer configuration
//!
//! All knobs are plain data with serde support so a host application can keep
//! them in whatever config format it already uses. Every struct is
//! `#[serde(default)]`, so partial documents only override what they name.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Period, Ratio, Result};

// ============================================================
// INDICATOR PERIODS
// ============================================================

/// Lookbacks for every indicator the pipeline computes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorPeriods {
    pub sma_fast: Period,
    pub sma_slow: Period,
    pub ema_fast: Period,
    pub ema_mid: Period,
    pub ema_slow: Period,
    pub rsi: Period,
    pub macd_fast: Period,
    pub macd_slow: Period,
    pub macd_signal: Period,
    pub bollinger: Period,
    /// Band half-width in standard deviations
    pub bollinger_k: f64,
    pub atr: Period,
    pub adx: Period,
    /// Bars scanned for support/resistance pivots
    pub sr_lookback: Period,
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        Self {
            sma_fast: Period::new_const(20),
            sma_slow: Period::new_const(50),
            ema_fast: Period::new_const(20),
            ema_mid: Period::new_const(50),
            ema_slow: Period::new_const(200),
            rsi: Period::new_const(14),
            macd_fast: Period::new_const(12),
            macd_slow: Period::new_const(26),
            macd_signal: Period::new_const(9),
            bollinger: Period::new_const(20),
            bollinger_k: 2.0,
            atr: Period::new_const(14),
            adx: Period::new_const(14),
            sr_lookback: Period::new_const(120),
        }
    }
}

// ============================================================
// SCORING THRESHOLDS
// ============================================================

/// Gates and adjustment thresholds shared by the live engine and the replay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringThresholds {
    /// Bars required before the live engine scores at all
    pub min_history: usize,
    /// Floor for the average of volume × close
    pub min_avg_turnover: f64,
    pub turnover_window: Period,
    /// ADX below this is a ranging market
    pub adx_ranging: f64,
    /// ADX above this is a strong trend
    pub adx_trending: f64,
    /// ATR / price above this dampens bullish totals
    pub volatility_ratio: Ratio,
    pub volatility_damping: Ratio,
    /// Distance (fraction of level price) that counts as "at" a level
    pub sr_proximity: Ratio,
    pub sr_min_strength: Ratio,
    pub sr_damping: Ratio,
    /// First index the historical replay scores
    pub replay_start: usize,
    /// Minimum bars between two replayed markers
    pub replay_spacing: usize,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            min_history: 200,
            min_avg_turnover: 1_000_000.0,
            turnover_window: Period::new_const(20),
            adx_ranging: 20.0,
            adx_trending: 25.0,
            volatility_ratio: Ratio::new_const(0.08),
            volatility_damping: Ratio::new_const(0.8),
            sr_proximity: Ratio::new_const(0.03),
            sr_min_strength: Ratio::new_const(0.6),
            sr_damping: Ratio::new_const(0.7),
            replay_start: 60,
            replay_spacing: 5,
        }
    }
}

// ============================================================
// ADVISORY POLICY
// ============================================================

/// Whether validator multipliers feed back into the live confidence.
///
/// Both validators are advisory by default: their multipliers are reported
/// but leave the classification untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryPolicy {
    pub enforce_quality: bool,
    pub enforce_backtest: bool,
}

// ============================================================
// ANALYZER CONFIG
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub periods: IndicatorPeriods,
    pub thresholds: ScoringThresholds,
    pub advisory: AdvisoryPolicy,
    /// Offset applied when bucketing timestamps into calendar days
    pub utc_offset_secs: i32,
    /// Re-check every bar before analysis
    pub validate_data: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            periods: IndicatorPeriods::default(),
            thresholds: ScoringThresholds::default(),
            advisory: AdvisoryPolicy::default(),
            utc_offset_secs: 0,
            validate_data: false,
        }
    }
}

impl AnalyzerConfig {
    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        let p = &self.periods;
        if p.macd_fast >= p.macd_slow {
            return Err(AnalysisError::InvalidConfig(format!(
                "macd_fast ({}) must be shorter than macd_slow ({})",
                p.macd_fast.get(),
                p.macd_slow.get()
            )));
        }
        if !(p.bollinger_k.is_finite() && p.bollinger_k > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "bollinger_k must be positive, got {}",
                p.bollinger_k
            )));
        }

        let t = &self.thresholds;
        if !(t.min_avg_turnover.is_finite() && t.min_avg_turnover >= 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_avg_turnover must be >= 0, got {}",
                t.min_avg_turnover
            )));
        }
        for (field, value) in [("adx_ranging", t.adx_ranging), ("adx_trending", t.adx_trending)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(AnalysisError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: 100.0,
                });
            }
        }
        if t.adx_ranging > t.adx_trending {
            return Err(AnalysisError::InvalidConfig(format!(
                "adx_ranging ({}) above adx_trending ({})",
                t.adx_ranging, t.adx_trending
            )));
        }
        if t.replay_spacing == 0 {
            return Err(AnalysisError::InvalidValue("replay_spacing must be > 0"));
        }

        self.utc_offset()?;
        Ok(())
    }

    /// Calendar-day offset as a chrono [`FixedOffset`]
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_secs).ok_or(AnalysisError::OutOfRange {
            field: "utc_offset_secs",
            value: self.utc_offset_secs as f64,
            min: -86_399.0,
            max: 86_399.0,
        })
    }
}

// ============================================================
// TESTS
// ============================================================
