//! Parameter metadata for the analyzer's tunable thresholds
//!
//! This module provides metadata about configuration parameters, enabling:
//! - Grid search over scoring thresholds
//! - Parameter documentation
//! - Building an [`AnalyzerConfig`] from a flat name → value map
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use tascore::prelude::*;
//!
//! for param in AnalyzerConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut params = HashMap::new();
//! params.insert("rsi_period", 21.0);
//! let config = AnalyzerConfig::with_params(&params).unwrap();
//! assert_eq!(config.periods.rsi.get(), 21);
//! ```

use std::collections::HashMap;

use crate::{config::AnalyzerConfig, AnalysisError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Fraction in 0.0..=1.0
  Ratio,
  /// Positive integer bar count
  Period,
  /// Unbounded level such as an ADX reading or a turnover floor
  Level,
}

/// Metadata for a single configuration parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "adx_ranging")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn level(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Level, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut k = 0usize;
    loop {
      let v = min + step * k as f64;
      if v > max + f64::EPSILON * max.abs().max(1.0) {
        break;
      }
      values.push(v);
      k += 1;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if !value.is_finite() || value < min || value > max {
      return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Level => Ok(()),
    }
  }
}

// ============================================================
// TUNABLE PARAMETERS
// ============================================================

static PARAMS: [ParamMeta; 14] = [
  ParamMeta::period("rsi_period", 14.0, (7.0, 28.0, 1.0), "RSI lookback"),
  ParamMeta::period("adx_period", 14.0, (7.0, 28.0, 1.0), "ADX / DI lookback"),
  ParamMeta::period("atr_period", 14.0, (7.0, 28.0, 1.0), "ATR lookback"),
  ParamMeta::period("bollinger_period", 20.0, (10.0, 40.0, 5.0), "Bollinger middle band SMA"),
  ParamMeta::period("sr_lookback", 120.0, (40.0, 400.0, 20.0), "Bars scanned for pivots"),
  ParamMeta::period("min_history", 200.0, (200.0, 1000.0, 50.0), "Bars needed before scoring"),
  ParamMeta::level("min_avg_turnover", 1_000_000.0, (0.0, 1e10, 500_000.0), "Liquidity floor"),
  ParamMeta::level("adx_ranging", 20.0, (10.0, 30.0, 1.0), "ADX below this holds"),
  ParamMeta::level("adx_trending", 25.0, (15.0, 40.0, 1.0), "ADX above this is a strong trend"),
  ParamMeta::ratio("volatility_ratio", 0.08, (0.02, 0.2, 0.01), "ATR/price penalty trigger"),
  ParamMeta::ratio("sr_proximity", 0.03, (0.01, 0.1, 0.005), "Distance that counts as at a level"),
  ParamMeta::ratio("sr_min_strength", 0.6, (0.2, 1.0, 0.1), "Level strength that dampens"),
  ParamMeta::period("replay_start", 60.0, (30.0, 250.0, 10.0), "First replayed index"),
  ParamMeta::period("replay_spacing", 5.0, (1.0, 20.0, 1.0), "Bars between replay markers"),
];

impl AnalyzerConfig {
  /// Returns metadata for all tunable parameters
  pub fn param_meta() -> &'static [ParamMeta] {
    &PARAMS
  }

  /// Builds a config from a name → value map on top of the defaults.
  ///
  /// Unknown names are rejected so typos never silently fall back.
  pub fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let mut config = Self::default();
    let mut names: Vec<&&str> = params.keys().collect();
    names.sort();

    for name in names {
      let value = params[*name];
      let meta = PARAMS
        .iter()
        .find(|m| m.name == *name)
        .ok_or_else(|| AnalysisError::InvalidConfig(format!("unknown parameter '{name}'")))?;
      meta.validate(value)?;

      let p = &mut config.periods;
      let t = &mut config.thresholds;
      match meta.name {
        "rsi_period" => p.rsi = Period::new(value as usize)?,
        "adx_period" => p.adx = Period::new(value as usize)?,
        "atr_period" => p.atr = Period::new(value as usize)?,
        "bollinger_period" => p.bollinger = Period::new(value as usize)?,
        "sr_lookback" => p.sr_lookback = Period::new(value as usize)?,
        "min_history" => t.min_history = value as usize,
        "min_avg_turnover" => t.min_avg_turnover = value,
        "adx_ranging" => t.adx_ranging = value,
        "adx_trending" => t.adx_trending = value,
        "volatility_ratio" => t.volatility_ratio = Ratio::new(value)?,
        "sr_proximity" => t.sr_proximity = Ratio::new(value)?,
        "sr_min_strength" => t.sr_min_strength = Ratio::new(value)?,
        "replay_start" => t.replay_start = value as usize,
        "replay_spacing" => t.replay_spacing = value as usize,
        other => {
          return Err(AnalysisError::InvalidConfig(format!("parameter '{other}' is not settable")))
        },
      }
    }

    config.validate()?;
    Ok(config)
  }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_meta_defaults_match_config() {
    let config = AnalyzerConfig::default();
    let meta = AnalyzerConfig::param_meta();
    let lookup = |name: &str| meta.iter().find(|m| m.name == name).unwrap().default;

    assert_eq!(lookup("rsi_period") as usize, config.periods.rsi.get());
    assert_eq!(lookup("adx_ranging"), config.thresholds.adx_ranging);
    assert_eq!(lookup("sr_min_strength"), config.thresholds.sr_min_strength.get());
    assert_eq!(lookup("replay_spacing") as usize, config.thresholds.replay_spacing);
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::ratio("test", 0.5, (0.3, 0.7, 0.2), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid.len(), 3);
    assert!((grid[0] - 0.3).abs() < 1e-12);
    assert!((grid[1] - 0.5).abs() < 1e-12);
    assert!((grid[2] - 0.7).abs() < 1e-12);
  }

  #[test]
  fn test_validate_period() {
    let meta = ParamMeta::period("test", 14.0, (10.0, 20.0, 2.0), "Test");

    assert!(meta.validate(14.0).is_ok());
    assert!(meta.validate(10.0).is_ok());
    assert!(meta.validate(20.0).is_ok());
    assert!(meta.validate(12.5).is_err());
    assert!(meta.validate(8.0).is_err());
    assert!(meta.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_with_params_applies_values() {
    let mut params = HashMap::new();
    params.insert("adx_period", 10.0);
    params.insert("adx_trending", 30.0);
    params.insert("sr_proximity", 0.05);

    let config = AnalyzerConfig::with_params(&params).unwrap();
    assert_eq!(config.periods.adx.get(), 10);
    assert_eq!(config.thresholds.adx_trending, 30.0);
    assert!((config.thresholds.sr_proximity.get() - 0.05).abs() < 1e-12);
  }

  #[test]
  fn test_with_params_rejects_unknown_and_out_of_range() {
    let mut params = HashMap::new();
    params.insert("rsi_perod", 14.0);
    assert!(matches!(
      AnalyzerConfig::with_params(&params),
      Err(AnalysisError::InvalidConfig(_))
    ));

    let mut params = HashMap::new();
    params.insert("adx_ranging", 45.0);
    assert!(matches!(AnalyzerConfig::with_params(&params), Err(AnalysisError::OutOfRange { .. })));
  }

  #[test]
  fn test_with_params_checks_consistency() {
    let mut params = HashMap::new();
    params.insert("adx_ranging", 28.0);
    params.insert("adx_trending", 20.0);
    assert!(AnalyzerConfig::with_params(&params).is_err());
  }

  #[test]
  fn test_every_param_is_settable() {
    for meta in AnalyzerConfig::param_meta() {
      let params = HashMap::from([(meta.name, meta.default)]);
      let config = AnalyzerConfig::with_params(&params).unwrap();
      assert_eq!(config, AnalyzerConfig::default(), "{}", meta.name);
    }
  }

  #[test]
  fn test_with_params_uses_the_given_value() {
    let params = HashMap::from([
      ("rsi_period", 21.0),
      ("bollinger_period", 25.0),
      ("sr_lookback", 200.0),
      ("volatility_ratio", 0.12),
      ("sr_min_strength", 0.4),
    ]);
    let config = AnalyzerConfig::with_params(&params).unwrap();
    assert_eq!(config.periods.rsi.get(), 21);
    assert_eq!(config.periods.bollinger.get(), 25);
    assert_eq!(config.periods.sr_lookback.get(), 200);
    assert!((config.thresholds.volatility_ratio.get() - 0.12).abs() < 1e-12);
    assert!((config.thresholds.sr_min_strength.get() - 0.4).abs() < 1e-12);
  }
}
