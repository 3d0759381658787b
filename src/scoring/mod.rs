//! Multi-factor scoring engine
//!
//! Fuses the indicator families into one signed score for the latest bar,
//! then maps (score, confirmations) onto a [`SignalClassification`]. The
//! per-bar pass lives in [`rules::score_at`] so the historical replay scores
//! bars exactly the way the live engine does.

pub mod rules;
pub mod trace;

pub use rules::{market_gate, score_at, Gate, ScoreScope};
pub use trace::{BarScore, Family, Rule, ScoreBreakdown, TraceEntry};

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    config::{AnalyzerConfig, ScoringThresholds},
    indicators::{find_support_resistance, IndicatorBundle, SupportResistanceLevel},
    Direction, SignalClassification, OHLCV,
};

// ============================================================
// CLASSIFICATION
// ============================================================

/// Map a total and its confirmation count onto a signal class
pub fn classify(total: f64, confirmations: u32) -> SignalClassification {
    if total >= 6.0 && confirmations >= 3 {
        SignalClassification::StrongBuy
    } else if total >= 4.0 && confirmations >= 2 {
        SignalClassification::Buy
    } else if total <= -6.0 && confirmations >= 3 {
        SignalClassification::StrongSell
    } else if total <= -4.0 && confirmations >= 2 {
        SignalClassification::Sell
    } else {
        SignalClassification::Hold
    }
}

/// Confidence (0-100) of an ungated classification
pub fn confidence(classification: SignalClassification, confirmations: u32) -> f64 {
    let c = confirmations as f64;
    let raw = match classification {
        SignalClassification::StrongBuy | SignalClassification::StrongSell => (70.0 + 4.0 * c).min(95.0),
        SignalClassification::Buy | SignalClassification::Sell => 55.0 + 6.0 * c,
        SignalClassification::Hold => 50.0,
    };
    raw.clamp(0.0, 100.0)
}

/// Confidence reported when a pre-filter forces HOLD
fn gated_confidence(gate: Gate) -> f64 {
    match gate {
        Gate::InsufficientHistory | Gate::MisalignedIndicators => 0.0,
        Gate::Illiquid | Gate::Ranging => 25.0,
    }
}

// ============================================================
// EVALUATION
// ============================================================

/// Classification of the latest bar with everything that led to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub classification: SignalClassification,
    /// 0-100
    pub confidence: f64,
    pub breakdown: ScoreBreakdown,
    pub trace: Vec<TraceEntry>,
    /// Support/resistance levels the S/R adjustment looked at
    pub levels: Vec<SupportResistanceLevel>,
    /// Pre-filter that short-circuited scoring, if any
    pub gate: Option<Gate>,
}

impl Evaluation {
    fn gated(gate: Gate, value: f64) -> Self {
        let mut score = BarScore::default();
        score.note(gate.rule(), value);
        Self {
            classification: SignalClassification::Hold,
            confidence: gated_confidence(gate),
            breakdown: score.breakdown,
            trace: score.trace,
            levels: Vec::new(),
            gate: Some(gate),
        }
    }

    pub fn confirmation_count(&self) -> u32 {
        self.breakdown.confirmation_count()
    }

    /// Apply a validator multiplier to the confidence.
    ///
    /// A multiplier of 0 downgrades the signal to HOLD. HOLD evaluations are
    /// left alone.
    pub fn enforce(&mut self, rule: Rule, multiplier: f64) {
        if self.classification.side().is_none() {
            return;
        }
        let before = self.confidence;
        self.confidence = (before * multiplier).clamp(0.0, 100.0);
        if multiplier <= 0.0 {
            self.classification = SignalClassification::Hold;
        }
        self.trace.push(TraceEntry {
            rule,
            value: multiplier,
            delta: self.confidence - before,
            direction: Direction::of(self.confidence - before),
            strong: false,
        });
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Scores the latest bar of a series
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine<'a> {
    config: &'a AnalyzerConfig,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }

    fn thresholds(&self) -> &ScoringThresholds {
        &self.config.thresholds
    }

    /// Evaluate the last bar of `bars`; `bundle` must be computed over the
    /// same bars. Never fails: short or thin series, and a bundle of the
    /// wrong length, come back as HOLD.
    pub fn evaluate<T: OHLCV>(&self, bars: &[T], bundle: &IndicatorBundle) -> Evaluation {
        let t = self.thresholds();
        let n = bars.len();
        if bundle.len() != n {
            warn!(bars = n, indicators = bundle.len(), "indicator bundle does not match the series, holding");
            return Evaluation::gated(Gate::MisalignedIndicators, bundle.len() as f64);
        }
        if n < t.min_history.max(1) {
            debug!(bars = n, required = t.min_history, "not enough history, holding");
            return Evaluation::gated(Gate::InsufficientHistory, n as f64);
        }

        let i = n - 1;
        if let Some((gate, value)) = market_gate(bars, bundle, i, t) {
            debug!(?gate, value, "pre-filter tripped, holding");
            return Evaluation::gated(gate, value);
        }

        let mut score = score_at(bars, bundle, i, ScoreScope::Live, t);
        let levels = find_support_resistance(bars, self.config.periods.sr_lookback.get());
        self.apply_level_penalty(&mut score, &levels, bars[i].close());

        let confirmations = score.breakdown.confirmation_count();
        let classification = classify(score.breakdown.total, confirmations);

        Evaluation {
            classification,
            confidence: confidence(classification, confirmations),
            breakdown: score.breakdown,
            trace: score.trace,
            levels,
            gate: None,
        }
    }

    /// Dampen a signal sitting just under resistance (buys) or just above
    /// support (sells)
    fn apply_level_penalty(&self, score: &mut BarScore, levels: &[SupportResistanceLevel], close: f64) {
        let t = self.thresholds();
        let total = score.breakdown.total;
        let opposing = |level: &&SupportResistanceLevel| {
            let ahead = if total > 0.0 {
                level.is_resistance && level.price > close
            } else {
                level.is_support && level.price < close
            };
            ahead && level.strength > t.sr_min_strength.get()
                && level.distance(close) <= t.sr_proximity.get()
        };

        if total == 0.0 {
            return;
        }
        if let Some(level) = levels.iter().find(opposing) {
            score.breakdown.sr_penalty = true;
            score.adjust(Rule::SupportResistance, level.price, total * t.sr_damping.get());
        }
    }
}
