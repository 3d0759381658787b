//! Structured scoring trace
//!
//! Every rule that fires leaves a [`TraceEntry`]; presentation (plain text,
//! HTML, JSON) is left to the caller. See [`crate::report`] for a text view.

use std::fmt;

use serde::Serialize;

use crate::Direction;

// ============================================================
// RULES
// ============================================================

/// Indicator family a rule contributes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Trend,
    Momentum,
    Bollinger,
    Volume,
    PriceAction,
    Candle,
    Pressure,
    Adjustment,
    Gate,
    Advisory,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Trend => "trend",
            Family::Momentum => "momentum",
            Family::Bollinger => "bollinger",
            Family::Volume => "volume",
            Family::PriceAction => "price_action",
            Family::Candle => "candle",
            Family::Pressure => "pressure",
            Family::Adjustment => "adjustment",
            Family::Gate => "gate",
            Family::Advisory => "advisory",
        }
    }
}

/// Every rule the engine can record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    // Trend
    EmaStack,
    EmaSlope,
    PriceVsEma,
    // Momentum
    RsiLevel,
    RsiMomentum,
    RsiReversal,
    MacdCross,
    MacdHistogram,
    // Bollinger
    BollingerExit,
    BollingerZone,
    BollingerSqueeze,
    // Volume
    VolumeBreakout,
    ObvConfirmation,
    ObvTrend,
    // Candle
    Engulfing,
    HammerStar,
    Harami,
    PriceStructure,
    Pressure,
    // Adjustments
    VolatilityPenalty,
    AdxBonus,
    SupportResistance,
    // Gates
    InsufficientHistory,
    MisalignedIndicators,
    Illiquid,
    Ranging,
    // Validator feedback
    QualityEnforced,
    BacktestEnforced,
}

impl Rule {
    pub fn family(self) -> Family {
        use Rule::*;
        match self {
            EmaStack | EmaSlope | PriceVsEma => Family::Trend,
            RsiLevel | RsiMomentum | RsiReversal | MacdCross | MacdHistogram => Family::Momentum,
            BollingerExit | BollingerZone | BollingerSqueeze => Family::Bollinger,
            VolumeBreakout | ObvConfirmation | ObvTrend => Family::Volume,
            Engulfing | HammerStar | Harami => Family::Candle,
            PriceStructure => Family::PriceAction,
            Pressure => Family::Pressure,
            VolatilityPenalty | AdxBonus | SupportResistance => Family::Adjustment,
            InsufficientHistory | MisalignedIndicators | Illiquid | Ranging => Family::Gate,
            QualityEnforced | BacktestEnforced => Family::Advisory,
        }
    }

    pub fn name(self) -> &'static str {
        use Rule::*;
        match self {
            EmaStack => "EMA stack",
            EmaSlope => "EMA slope",
            PriceVsEma => "price vs EMA",
            RsiLevel => "RSI level",
            RsiMomentum => "RSI momentum",
            RsiReversal => "RSI reversal",
            MacdCross => "MACD crossover",
            MacdHistogram => "MACD histogram",
            BollingerExit => "Bollinger exit",
            BollingerZone => "Bollinger zone",
            BollingerSqueeze => "Bollinger squeeze",
            VolumeBreakout => "volume breakout",
            ObvConfirmation => "OBV extreme",
            ObvTrend => "OBV trend",
            Engulfing => "engulfing",
            HammerStar => "hammer/shooting star",
            Harami => "harami",
            PriceStructure => "price structure",
            Pressure => "volume pressure",
            VolatilityPenalty => "volatility penalty",
            AdxBonus => "ADX trend bonus",
            SupportResistance => "S/R proximity",
            InsufficientHistory => "insufficient history",
            MisalignedIndicators => "indicators misaligned",
            Illiquid => "illiquid",
            Ranging => "ranging market",
            QualityEnforced => "signal quality",
            BacktestEnforced => "backtest",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================
// TRACE ENTRY
// ============================================================

/// One fired rule: what it looked at and what it did to the total
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraceEntry {
    pub rule: Rule,
    /// Indicator reading the rule fired on
    pub value: f64,
    /// Change applied to the score (0 for notes and gates)
    pub delta: f64,
    pub direction: Direction,
    /// Counts toward the confirmation count
    pub strong: bool,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ {:.2}: {:+.1}",
            self.rule.family().as_str(),
            self.rule,
            self.value,
            self.delta
        )?;
        if self.strong {
            f.write_str(" (strong)")?;
        }
        Ok(())
    }
}

// ============================================================
// SCORE BREAKDOWN
// ============================================================

/// Signed sub-scores per family, the adjustments applied, and the total
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub trend: i32,
    pub momentum: i32,
    pub bollinger: i32,
    pub volume: i32,
    pub price_action: i32,
    pub candle: i32,
    pub pressure: i32,
    /// Strong rules that fired bullish
    pub bull_confirmations: u32,
    /// Strong rules that fired bearish
    pub bear_confirmations: u32,
    pub squeeze: bool,
    pub volatility_penalty: bool,
    /// Signed points added for a strong trend
    pub adx_bonus: f64,
    pub sr_penalty: bool,
    /// Score after every adjustment
    pub total: f64,
}

impl ScoreBreakdown {
    /// Sum of the family sub-scores before adjustments
    pub fn raw_total(&self) -> i32 {
        self.trend
            + self.momentum
            + self.bollinger
            + self.volume
            + self.price_action
            + self.candle
            + self.pressure
    }

    /// Strong rules agreeing with the sign of the final total
    pub fn confirmation_count(&self) -> u32 {
        if self.total > 0.0 {
            self.bull_confirmations
        } else if self.total < 0.0 {
            self.bear_confirmations
        } else {
            0
        }
    }

    fn family_score(&mut self, family: Family) -> Option<&mut i32> {
        match family {
            Family::Trend => Some(&mut self.trend),
            Family::Momentum => Some(&mut self.momentum),
            Family::Bollinger => Some(&mut self.bollinger),
            Family::Volume => Some(&mut self.volume),
            Family::PriceAction => Some(&mut self.price_action),
            Family::Candle => Some(&mut self.candle),
            Family::Pressure => Some(&mut self.pressure),
            Family::Adjustment | Family::Gate | Family::Advisory => None,
        }
    }
}

/// Breakdown plus trace for one bar, built up rule by rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarScore {
    pub breakdown: ScoreBreakdown,
    pub trace: Vec<TraceEntry>,
}

impl BarScore {
    /// Record a scoring rule
    pub(crate) fn fire(&mut self, rule: Rule, value: f64, delta: i32, strong: bool) {
        let direction = Direction::of(delta as f64);
        if let Some(score) = self.breakdown.family_score(rule.family()) {
            *score += delta;
        }
        if strong {
            match direction {
                Direction::Bullish => self.breakdown.bull_confirmations += 1,
                Direction::Bearish => self.breakdown.bear_confirmations += 1,
                Direction::Neutral => {}
            }
        }
        self.trace.push(TraceEntry {
            rule,
            value,
            delta: delta as f64,
            direction,
            strong,
        });
    }

    /// Record an informational entry that leaves the score alone
    pub(crate) fn note(&mut self, rule: Rule, value: f64) {
        self.trace.push(TraceEntry {
            rule,
            value,
            delta: 0.0,
            direction: Direction::Neutral,
            strong: false,
        });
    }

    /// Replace the total, tracing the change
    pub(crate) fn adjust(&mut self, rule: Rule, value: f64, new_total: f64) {
        let delta = new_total - self.breakdown.total;
        self.breakdown.total = new_total;
        self.trace.push(TraceEntry {
            rule,
            value,
            delta,
            direction: Direction::of(delta),
            strong: false,
        });
    }
}
