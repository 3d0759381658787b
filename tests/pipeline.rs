//! Integration tests for the analysis pipeline.
//!
//! These drive the public API end to end: indicators, scoring, both
//! validators, the historical replay and batch analysis.

use tascore::prelude::*;
use tascore::{indicators::rsi, report::render};

use chrono::{Offset, Utc};

const DAY: i64 = 86_400_000;

/// Bars with every price equal to `price`
fn make_flat(n: usize, price: f64, volume: u64) -> Vec<PricePoint> {
    (0..n)
        .map(|i| PricePoint::new(i as i64 * DAY, price, price, price, price, volume))
        .collect()
}

/// Steady 0.4% daily advance; every bar opens at the prior close
fn make_uptrend(n: usize) -> Vec<PricePoint> {
    (0..n)
        .map(|i| {
            let close = 100.0 * 1.004f64.powi(i as i32);
            let open = close / 1.004;
            PricePoint::new(i as i64 * DAY, open, close * 1.002, open * 0.998, close, 2_000_000)
        })
        .collect()
}

/// Steady 0.4% daily decline, the bar-for-bar mirror of `make_uptrend`
fn make_downtrend(n: usize) -> Vec<PricePoint> {
    (0..n)
        .map(|i| {
            let close = 100.0 / 1.004f64.powi(i as i32);
            let open = close * 1.004;
            PricePoint::new(i as i64 * DAY, open, open / 0.998, close / 1.002, close, 2_000_000)
        })
        .collect()
}

/// Sideways chop: bars alternate up and down with staggered ranges
fn make_chop(n: usize) -> Vec<PricePoint> {
    (0..n)
        .map(|i| {
            let ts = i as i64 * DAY;
            if i % 2 == 0 {
                PricePoint::new(ts, 100.0, 102.0, 99.0, 101.0, 20_000)
            } else {
                PricePoint::new(ts, 101.0, 101.5, 98.5, 100.0, 20_000)
            }
        })
        .collect()
}

/// Alternating 40-bar advances and declines
fn make_waves(n: usize) -> Vec<PricePoint> {
    let mut close: f64 = 100.0;
    (0..n)
        .map(|i| {
            let prev = close;
            close *= if (i / 40) % 2 == 0 { 1.006 } else { 0.994 };
            PricePoint::new(
                i as i64 * DAY,
                prev,
                prev.max(close) * 1.001,
                prev.min(close) * 0.999,
                close,
                3_000_000,
            )
        })
        .collect()
}

// ============================================================
// SCORING SCENARIOS
// ============================================================

#[test]
fn test_flat_series_holds_at_fifty() {
    // 20,000 × 100 clears the 1,000,000 turnover floor
    let bars = make_flat(200, 100.0, 20_000);
    let result = Analyzer::default().analyze("FLAT", &bars).unwrap();

    let eval = &result.evaluation;
    assert_eq!(eval.classification, SignalClassification::Hold);
    assert_eq!(eval.confidence, 50.0);
    assert_eq!(eval.gate, None);
    assert_eq!(eval.breakdown.total, 0.0);
    assert_eq!(eval.confirmation_count(), 0);
    assert!(result.quality.is_none());
    assert!(result.backtest.is_none());
}

#[test]
fn test_volume_surge_on_uptrend_buys() {
    let mut bars = make_uptrend(260);
    bars[259].volume *= 2;
    let result = Analyzer::default().analyze("SURGE", &bars).unwrap();

    let eval = &result.evaluation;
    assert_eq!(eval.classification.side(), Some(Side::Buy));
    assert!(eval.confirmation_count() >= 2);
    assert!(eval.trace.iter().any(|e| e.rule == Rule::VolumeBreakout && e.delta > 0.0));
    assert!(eval.confidence > 50.0 && eval.confidence <= 100.0);
}

#[test]
fn test_steady_decline_is_strong_sell() {
    let result = Analyzer::default().analyze("DOWN", &make_downtrend(260)).unwrap();

    let eval = &result.evaluation;
    assert_eq!(eval.gate, None);
    assert_eq!(eval.classification, SignalClassification::StrongSell);
    assert_eq!(eval.classification.side(), Some(Side::Sell));
    assert!(eval.breakdown.total <= -6.0);
    assert!(eval.breakdown.bear_confirmations >= 3);
    assert!(eval.confidence >= 82.0 && eval.confidence <= 95.0);
    assert!(!eval.breakdown.volatility_penalty);
    assert!(eval.trace.iter().any(|e| e.rule == Rule::EmaStack && e.delta < 0.0));
    assert!(eval.trace.iter().any(|e| e.rule == Rule::AdxBonus && e.delta == -2.0));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["evaluation"]["classification"], "STRONG_SELL");
}

#[test]
fn test_sideways_chop_holds_as_ranging() {
    let result = Analyzer::default().analyze("CHOP", &make_chop(220)).unwrap();

    let eval = &result.evaluation;
    assert_eq!(eval.gate, Some(Gate::Ranging));
    assert_eq!(eval.classification, SignalClassification::Hold);
    assert_eq!(eval.confidence, 25.0);
    assert_eq!(eval.trace.len(), 1);
    assert!(eval.trace[0].value < 20.0);
    assert!(result.quality.is_none());
}

#[test]
fn test_uninterrupted_rise_pins_rsi() {
    let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
    let out = rsi(&closes, 14);
    assert!(out[..15].iter().all(|v| v.is_nan()));
    assert!(out[15..].iter().all(|&v| v == 100.0));
}

#[test]
fn test_thin_history_holds_with_gate() {
    let bars = make_uptrend(120);
    let result = Analyzer::default().analyze("YOUNG", &bars).unwrap();
    assert_eq!(result.evaluation.classification, SignalClassification::Hold);
    assert_eq!(result.evaluation.gate, Some(Gate::InsufficientHistory));
    assert_eq!(result.evaluation.trace.len(), 1);
}

#[test]
fn test_illiquid_symbol_holds() {
    let bars = make_flat(220, 10.0, 100);
    let result = Analyzer::default().analyze("THIN", &bars).unwrap();
    assert_eq!(result.evaluation.gate, Some(Gate::Illiquid));
    assert_eq!(result.evaluation.classification, SignalClassification::Hold);
}

// ============================================================
// VALIDATORS
// ============================================================

#[test]
fn test_backtest_needs_sixty_bars() {
    let bars = make_uptrend(100);
    let bundle = IndicatorBundle::compute(&bars, &IndicatorPeriods::default());
    let result = BacktestValidator::validate(Side::Buy, &bars, 40, &bundle);

    assert_eq!(result.total_signals, 0);
    assert_eq!(result.success_rate, 0.5);
    assert!(result.examples.is_empty());
    assert_eq!(result.summary(), "no similar BUY setups in recent history");
}

#[test]
fn test_advisory_results_do_not_change_signal_by_default() {
    let bars = make_uptrend(260);
    let result = Analyzer::default().analyze("UP", &bars).unwrap();
    let eval = &result.evaluation;

    let quality = result.quality.as_ref().unwrap();
    assert!(quality.false_score <= 100);
    assert_eq!(quality.verdict, Verdict::from_score(quality.false_score));
    let backtest = result.backtest.as_ref().unwrap();
    assert!((0.0..=1.0).contains(&backtest.success_rate));

    assert_eq!(eval.classification, SignalClassification::StrongBuy);
    assert_eq!(eval.confidence, 86.0);
    assert!(eval.trace.iter().all(|e| e.rule != Rule::QualityEnforced));
}

#[test]
fn test_enforced_quality_scales_confidence() {
    let bars = make_uptrend(260);
    let config = AnalyzerConfig {
        advisory: AdvisoryPolicy {
            enforce_quality: true,
            enforce_backtest: false,
        },
        ..AnalyzerConfig::default()
    };
    let analyzer = Analyzer::new(config).unwrap();
    let result = analyzer.analyze("UP", &bars).unwrap();

    let multiplier = result.quality.as_ref().unwrap().confidence_multiplier;
    let eval = &result.evaluation;
    assert!((eval.confidence - 86.0 * multiplier).abs() < 1e-9);
    assert_eq!(eval.trace.last().map(|e| e.rule), Some(Rule::QualityEnforced));
    if multiplier == 0.0 {
        assert_eq!(eval.classification, SignalClassification::Hold);
    } else {
        assert_eq!(eval.classification, SignalClassification::StrongBuy);
    }
}

// ============================================================
// REPLAY
// ============================================================

#[test]
fn test_replay_is_reproducible() {
    let bars = make_waves(400);
    let config = AnalyzerConfig::default();
    let bundle = IndicatorBundle::compute(&bars, &config.periods);
    let scanner = HistoricalSignalScanner::new(&config);

    let first = scanner.scan(&bars, &bundle);
    let second = scanner.scan(&bars, &bundle);
    assert_eq!(first, second);
    assert!(!first.is_empty());
    assert!(first.iter().all(|p| p.index >= 60 && p.index < 399));
}

#[test]
fn test_live_signal_closes_the_marker_list() {
    let bars = make_uptrend(260);
    let result = Analyzer::default().analyze("UP", &bars).unwrap();
    let last = result.trade_points.last().unwrap();
    assert_eq!(last.index, 259);
    assert_eq!(last.classification, result.evaluation.classification);
}

// ============================================================
// DETERMINISM / BATCH
// ============================================================

#[test]
fn test_analysis_is_deterministic() {
    let bars = make_waves(300);
    let analyzer = Analyzer::default();
    assert_eq!(analyzer.analyze("W", &bars).unwrap(), analyzer.analyze("W", &bars).unwrap());
}

#[test]
fn test_batch_matches_sequential() {
    let up = make_uptrend(260);
    let waves = make_waves(300);
    let flat = make_flat(210, 50.0, 100_000);
    let instruments: Vec<(&str, &[PricePoint])> =
        vec![("UP", &up), ("WAVES", &waves), ("FLAT", &flat)];

    let analyzer = Analyzer::default();
    let report = analyze_batch(&analyzer, instruments.clone());
    assert!(report.failures.is_empty());
    assert_eq!(report.results.len(), 3);
    for (result, (symbol, bars)) in report.results.iter().zip(instruments) {
        assert_eq!(result, &analyzer.analyze(symbol, bars).unwrap());
    }
}

#[test]
fn test_series_entry_point() {
    let series = Series::new("UP", make_uptrend(260));
    let result = analyze(&series).unwrap();
    assert_eq!(result.symbol, "UP");
    assert!(render(&result, Utc.fix()).starts_with("UP STRONG_BUY"));
}

// ============================================================
// CONFIGURATION
// ============================================================

#[test]
fn test_config_json_round_trip() {
    let config = AnalyzerConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let back: AnalyzerConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, back);
}

#[test]
fn test_partial_config_fills_defaults() {
    let config: AnalyzerConfig =
        serde_json::from_str(r#"{ "advisory": { "enforce_backtest": true } }"#).unwrap();
    assert!(config.advisory.enforce_backtest);
    assert!(!config.advisory.enforce_quality);
    assert_eq!(config.thresholds, ScoringThresholds::default());
}

#[test]
fn test_config_rejects_out_of_range_ratio() {
    let json = r#"{ "thresholds": { "volatility_ratio": 1.5 } }"#;
    assert!(serde_json::from_str::<AnalyzerConfig>(json).is_err());
}

#[test]
fn test_result_serializes() {
    let result = Analyzer::default().analyze("UP", &make_uptrend(260)).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["symbol"], "UP");
    assert_eq!(json["evaluation"]["classification"], "STRONG_BUY");
}
