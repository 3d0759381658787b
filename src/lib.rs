//! # tascore - technical-analysis signal scoring
//!
//! Classifies a price/volume series into a discrete trading signal
//! (`STRONG_BUY` … `STRONG_SELL`) with a confidence score and a structured
//! rationale, then sanity-checks that signal against known false-signal
//! patterns and backtests it against analogous past market states.
//!
//! ## Quick Start
//!
//! ```rust
//! use tascore::prelude::*;
//!
//! // 260 daily bars of a steady advance
//! let bars: Vec<PricePoint> = (0..260)
//!     .map(|i| {
//!         let close = 100.0 * 1.004f64.powi(i);
//!         let open = close / 1.004;
//!         PricePoint::new(i as i64 * 86_400_000, open, close * 1.002, open * 0.998, close, 2_000_000)
//!     })
//!     .collect();
//!
//! let series = Series::new("THYAO", bars);
//! let result = analyze(&series).unwrap();
//!
//! println!("{} ({:.0}%)", result.evaluation.classification, result.evaluation.confidence);
//! for entry in &result.evaluation.trace {
//!     println!("  {entry}");
//! }
//! ```
//!
//! The pipeline is pure: identical input produces identical output, and no
//! state is shared between symbols. [`analyze_batch`] fans a batch of symbols
//! out over the rayon thread pool.

pub mod config;
pub mod history;
pub mod indicators;
pub mod params;
pub mod report;
pub mod scoring;
pub mod series;
pub mod validation;

pub mod prelude {
    pub use crate::{
        // Pipeline
        analyze,
        analyze_batch,
        // Configuration
        config::{AdvisoryPolicy, AnalyzerConfig, IndicatorPeriods, ScoringThresholds},
        // Replay
        history::{HistoricalSignalScanner, TradePoint},
        // Indicators
        indicators::{
            analyze_candle_pattern, find_support_resistance, CandlePattern, IndicatorBundle,
            SupportResistanceLevel,
        },
        params::{ParamMeta, ParamType},
        // Scoring
        scoring::{Evaluation, Gate, Rule, ScoreBreakdown, ScoringEngine, TraceEntry},
        series::Series,
        // Validation
        validation::{BacktestResult, BacktestValidator, SignalQuality, SignalValidator, Verdict},
        AnalysisError,
        AnalysisFailure,
        AnalysisResult,
        Analyzer,
        BatchReport,
        Direction,
        OHLCVExt,
        Period,
        PricePoint,
        Ratio,
        Result,
        Side,
        SignalClassification,
        OHLCV,
    };
}

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::AnalyzerConfig,
    history::{HistoricalSignalScanner, TradePoint},
    indicators::IndicatorBundle,
    scoring::{Evaluation, Rule, ScoringEngine},
    series::Series,
    validation::{BacktestResult, BacktestValidator, IndicatorSnapshot, SignalQuality, SignalValidator},
};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while configuring or running the pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Empty price series")]
    EmptySeries,

    #[error("Invalid price point at index {index}: {reason}")]
    InvalidPricePoint { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(AnalysisError::InvalidValue("Ratio must be finite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Indicator lookback in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Bar open time in epoch milliseconds, if known
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Close as a fraction of the bar's range. Returns None if range ≈ 0
    #[inline]
    fn close_position(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| (self.close() - self.low()) / range)
    }

    /// Traded value of the bar (volume × close)
    #[inline]
    fn turnover(&self) -> f64 {
        self.volume() * self.close()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| !p.is_finite()) || !self.volume().is_finite() {
            return Err(AnalysisError::InvalidPricePoint {
                index: 0,
                reason: "non-finite value",
            });
        }
        if prices.iter().any(|&p| p <= 0.0) {
            return Err(AnalysisError::InvalidPricePoint {
                index: 0,
                reason: "non-positive price",
            });
        }
        if self.volume() < 0.0 {
            return Err(AnalysisError::InvalidPricePoint {
                index: 0,
                reason: "negative volume",
            });
        }
        if self.high() < self.low() {
            return Err(AnalysisError::InvalidPricePoint {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// One OHLCV bar as delivered by the market-data collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Epoch milliseconds, strictly increasing within a series
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for PricePoint {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume as f64
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// SIGNAL TYPES
// ============================================================

/// Direction a rule or pattern points in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// Direction of a signed quantity; zero and NaN are neutral
    #[inline]
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            Direction::Bullish
        } else if value < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Trade side of a non-HOLD signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[inline]
    pub fn direction(self) -> Direction {
        match self {
            Side::Buy => Direction::Bullish,
            Side::Sell => Direction::Bearish,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete trading signal for the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalClassification {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl SignalClassification {
    /// Trade side, or None for HOLD
    #[inline]
    pub fn side(self) -> Option<Side> {
        match self {
            Self::StrongBuy | Self::Buy => Some(Side::Buy),
            Self::StrongSell | Self::Sell => Some(Side::Sell),
            Self::Hold => None,
        }
    }

    #[inline]
    pub fn is_strong(self) -> bool {
        matches!(self, Self::StrongBuy | Self::StrongSell)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        }
    }
}

impl std::fmt::Display for SignalClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// ANALYZER
// ============================================================

/// Everything the pipeline produces for one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub symbol: String,
    /// Timestamp of the evaluated (latest) bar
    pub timestamp: Option<i64>,
    /// Close of the evaluated bar
    pub price: f64,
    pub evaluation: Evaluation,
    /// False-signal diagnostics, present for BUY/SELL classifications
    pub quality: Option<SignalQuality>,
    /// Historical analog check, present for BUY/SELL classifications
    pub backtest: Option<BacktestResult>,
    /// Replayed BUY/SELL markers for charting
    pub trade_points: Vec<TradePoint>,
}

/// Full per-symbol pipeline: indicators → score → validate → backtest → replay
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Create an analyzer, rejecting inconsistent configurations
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a [`Series`]
    pub fn analyze_series(&self, series: &Series) -> Result<AnalysisResult> {
        self.analyze(series.symbol(), series.bars())
    }

    /// Analyze the latest bar of `bars`.
    ///
    /// Short histories are not an error: the evaluation comes back as HOLD with
    /// a trace entry explaining which gate fired.
    pub fn analyze<T: OHLCV>(&self, symbol: &str, bars: &[T]) -> Result<AnalysisResult> {
        let last = bars.last().ok_or(AnalysisError::EmptySeries)?;
        if self.config.validate_data {
            series::validate_bars(bars)?;
        }

        let bundle = IndicatorBundle::compute(bars, &self.config.periods);
        let mut evaluation = ScoringEngine::new(&self.config).evaluate(bars, &bundle);

        let index = bars.len() - 1;
        let (quality, backtest) = match evaluation.classification.side() {
            Some(side) => {
                let snapshot = IndicatorSnapshot::at(bars, &bundle, index);
                let quality =
                    SignalValidator::validate(side, bars, &snapshot, &evaluation.levels);
                let backtest = BacktestValidator::validate(side, bars, index, &bundle);
                (Some(quality), Some(backtest))
            }
            None => (None, None),
        };

        let advisory = self.config.advisory;
        if advisory.enforce_quality {
            if let Some(q) = &quality {
                evaluation.enforce(Rule::QualityEnforced, q.confidence_multiplier);
            }
        }
        if advisory.enforce_backtest {
            if let Some(b) = &backtest {
                evaluation.enforce(Rule::BacktestEnforced, b.confidence_multiplier());
            }
        }

        let scanner = HistoricalSignalScanner::new(&self.config);
        let mut trade_points = scanner.scan(bars, &bundle);
        scanner.merge_live_signal(&mut trade_points, bars, &evaluation);

        debug!(
            symbol,
            classification = %evaluation.classification,
            confidence = evaluation.confidence,
            markers = trade_points.len(),
            "analysis complete"
        );

        Ok(AnalysisResult {
            symbol: symbol.to_string(),
            timestamp: last.timestamp(),
            price: last.close(),
            evaluation,
            quality,
            backtest,
            trade_points,
        })
    }
}

/// Analyze a series with the default configuration
pub fn analyze(series: &Series) -> Result<AnalysisResult> {
    Analyzer::default().analyze_series(series)
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Symbol whose pipeline failed, with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFailure {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Outcome of a batch run; failures never affect other symbols
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<AnalysisResult>,
    pub failures: Vec<AnalysisFailure>,
}

/// Parallel analysis of multiple instruments
pub fn analyze_batch<'a, T, I>(analyzer: &Analyzer, instruments: I) -> BatchReport
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let outcomes: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            analyzer.analyze(symbol, bars).map_err(|error| AnalysisFailure {
                symbol: symbol.to_string(),
                error,
            })
        })
        .collect();

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(result) => report.results.push(result),
            Err(failure) => {
                warn!(symbol = %failure.symbol, error = %failure.error, "analysis failed");
                report.failures.push(failure);
            }
        }
    }

    report
}

// ============================================================
// TESTS
// ============================================================
