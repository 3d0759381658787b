//! Plain-text rendering of analysis results
//!
//! [`Report`] implements `Display`, so a result can be written straight into
//! a log line, a file or a `String`. The HTML/chart layer consumes the
//! structured types instead.

use std::fmt;

use chrono::FixedOffset;

use crate::{
    history::TradePoint,
    scoring::{ScoreBreakdown, TraceEntry},
    series::calendar_date,
    validation::{BacktestResult, SignalQuality},
    AnalysisResult,
};

/// Most recent replay markers listed in a report
const MAX_LISTED_MARKERS: usize = 10;

/// Text view of one [`AnalysisResult`]
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    result: &'a AnalysisResult,
    offset: FixedOffset,
}

impl<'a> Report<'a> {
    /// `offset` decides which calendar date timestamps are printed as
    pub fn new(result: &'a AnalysisResult, offset: FixedOffset) -> Self {
        Self { result, offset }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.result;
        let e = &r.evaluation;

        write!(
            f,
            "{} {} @ {:.2} ({:.0}% confidence)",
            r.symbol, e.classification, r.price, e.confidence
        )?;
        match r.timestamp.and_then(|ts| calendar_date(ts, self.offset)) {
            Some(day) => writeln!(f, " on {day}")?,
            None => writeln!(f)?,
        }

        if let Some(gate) = e.gate {
            writeln!(f, "held by pre-filter: {}", gate.rule())?;
        } else {
            write_breakdown(f, &e.breakdown)?;
        }
        write_trace(f, &e.trace)?;

        if let Some(quality) = &r.quality {
            write_quality(f, quality)?;
        }
        if let Some(backtest) = &r.backtest {
            write_backtest(f, backtest)?;
        }
        write_trade_points(f, &r.trade_points, self.offset)
    }
}

/// Render with the given calendar offset
pub fn render(result: &AnalysisResult, offset: FixedOffset) -> String {
    Report::new(result, offset).to_string()
}

fn write_breakdown(f: &mut impl fmt::Write, b: &ScoreBreakdown) -> fmt::Result {
    writeln!(
        f,
        "score {:+.1} (raw {:+}): trend {:+}, momentum {:+}, bollinger {:+}, volume {:+}, \
         price action {:+}, candle {:+}, pressure {:+}",
        b.total,
        b.raw_total(),
        b.trend,
        b.momentum,
        b.bollinger,
        b.volume,
        b.price_action,
        b.candle,
        b.pressure
    )?;

    let mut adjustments = Vec::new();
    if b.squeeze {
        adjustments.push("squeeze".to_string());
    }
    if b.volatility_penalty {
        adjustments.push("volatility damping".to_string());
    }
    if b.adx_bonus != 0.0 {
        adjustments.push(format!("ADX bonus {:+.1}", b.adx_bonus));
    }
    if b.sr_penalty {
        adjustments.push("near opposing level".to_string());
    }
    write!(
        f,
        "confirmations: {} bull / {} bear",
        b.bull_confirmations, b.bear_confirmations
    )?;
    if !adjustments.is_empty() {
        write!(f, "; {}", adjustments.join(", "))?;
    }
    writeln!(f)
}

/// One trace entry per line, in firing order
pub fn write_trace(f: &mut impl fmt::Write, trace: &[TraceEntry]) -> fmt::Result {
    for entry in trace {
        writeln!(f, "  {entry}")?;
    }
    Ok(())
}

pub fn write_quality(f: &mut impl fmt::Write, quality: &SignalQuality) -> fmt::Result {
    writeln!(
        f,
        "quality: false score {} -> {} (x{:.1})",
        quality.false_score, quality.verdict, quality.confidence_multiplier
    )?;
    for flag in &quality.red_flags {
        writeln!(f, "  ! {flag}")?;
    }
    Ok(())
}

pub fn write_backtest(f: &mut impl fmt::Write, backtest: &BacktestResult) -> fmt::Result {
    writeln!(
        f,
        "backtest: {} (x{:.1})",
        backtest,
        backtest.confidence_multiplier()
    )?;
    for example in &backtest.examples {
        let outcome = match example.horizon {
            Some(h) => format!("hit in {h} bars"),
            None => "missed".to_string(),
        };
        writeln!(
            f,
            "  bar {} @ {:.2}: best {:.1}%, {}",
            example.index,
            example.entry_price,
            example.max_move * 100.0,
            outcome
        )?;
    }
    Ok(())
}

fn write_trade_points(
    f: &mut impl fmt::Write,
    points: &[TradePoint],
    offset: FixedOffset,
) -> fmt::Result {
    if points.is_empty() {
        return Ok(());
    }
    writeln!(f, "markers: {}", points.len())?;
    let skip = points.len().saturating_sub(MAX_LISTED_MARKERS);
    for p in &points[skip..] {
        match p.timestamp.and_then(|ts| calendar_date(ts, offset)) {
            Some(day) => write!(f, "  {day}")?,
            None => write!(f, "  #{}", p.index)?,
        }
        writeln!(
            f,
            " {} @ {:.2} (score {:+.1}, {} conf.)",
            p.classification, p.price, p.score, p.confirmations
        )?;
    }
    Ok(())
}
