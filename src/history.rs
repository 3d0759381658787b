//! Historical signal replay for charting
//!
//! Replays the reduced scoring pass ([`ScoreScope::Replay`]) over the whole
//! series with the live gates and thresholds, producing BUY/SELL markers.

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;
use tracing::{trace, warn};

use crate::{
    config::AnalyzerConfig,
    indicators::IndicatorBundle,
    scoring::{classify, market_gate, score_at, Evaluation, ScoreScope},
    series::calendar_date,
    Side, SignalClassification, OHLCV,
};

/// One replayed signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradePoint {
    pub index: usize,
    pub timestamp: Option<i64>,
    pub side: Side,
    pub classification: SignalClassification,
    pub price: f64,
    /// Adjusted total score
    pub score: f64,
    pub confirmations: u32,
}

/// Replays past bars into [`TradePoint`]s
#[derive(Debug, Clone, Copy)]
pub struct HistoricalSignalScanner<'a> {
    config: &'a AnalyzerConfig,
    /// Calendar used for same-day collapsing
    offset: FixedOffset,
}

impl<'a> HistoricalSignalScanner<'a> {
    /// An out-of-range `utc_offset_secs` falls back to UTC with a warning.
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        let offset = config.utc_offset().unwrap_or_else(|err| {
            warn!(%err, "invalid calendar offset, collapsing markers on UTC dates");
            Utc.fix()
        });
        Self { config, offset }
    }

    fn date_of(&self, timestamp: Option<i64>) -> Option<NaiveDate> {
        timestamp.and_then(|ts| calendar_date(ts, self.offset))
    }

    /// Markers for indices `replay_start..=n-2` in chronological order.
    ///
    /// Emitted markers are at least `replay_spacing` bars apart, and at most
    /// one marker survives per calendar date (the one with the larger |score|).
    pub fn scan<T: OHLCV>(&self, bars: &[T], bundle: &IndicatorBundle) -> Vec<TradePoint> {
        let t = &self.config.thresholds;
        let n = bars.len();
        let mut points: Vec<TradePoint> = Vec::new();
        if n < 2 || bundle.len() != n {
            return points;
        }

        let mut last_emitted: Option<usize> = None;
        for i in t.replay_start..n - 1 {
            if last_emitted.is_some_and(|last| i - last < t.replay_spacing) {
                continue;
            }
            if market_gate(bars, bundle, i, t).is_some() {
                continue;
            }

            let score = score_at(bars, bundle, i, ScoreScope::Replay, t);
            let total = score.breakdown.total;
            let confirmations = score.breakdown.confirmation_count();
            let classification = classify(total, confirmations);
            let Some(side) = classification.side() else {
                continue;
            };

            let point = TradePoint {
                index: i,
                timestamp: bars[i].timestamp(),
                side,
                classification,
                price: bars[i].close(),
                score: total,
                confirmations,
            };
            if self.push_deduped(&mut points, point) {
                last_emitted = Some(i);
            }
        }

        trace!(bars = n, markers = points.len(), "historical replay");
        points
    }

    /// Append, keeping only the stronger of two markers on the same date.
    /// Returns whether `point` was kept.
    fn push_deduped(&self, points: &mut Vec<TradePoint>, point: TradePoint) -> bool {
        let date = self.date_of(point.timestamp);
        match points.last_mut() {
            Some(last) if date.is_some() && self.date_of(last.timestamp) == date => {
                let stronger = point.score.abs() > last.score.abs();
                if stronger {
                    *last = point;
                }
                stronger
            }
            _ => {
                points.push(point);
                true
            }
        }
    }

    /// Append the live classification as the final marker when it falls on
    /// a different calendar date than the last replayed one.
    pub fn merge_live_signal<T: OHLCV>(
        &self,
        points: &mut Vec<TradePoint>,
        bars: &[T],
        evaluation: &Evaluation,
    ) {
        let (Some(side), Some(bar)) = (evaluation.classification.side(), bars.last()) else {
            return;
        };
        let index = bars.len() - 1;
        let live_date = self.date_of(bar.timestamp());

        let duplicate = points.last().is_some_and(|last| {
            last.index == index || (live_date.is_some() && self.date_of(last.timestamp) == live_date)
        });
        if duplicate {
            return;
        }

        points.push(TradePoint {
            index,
            timestamp: bar.timestamp(),
            side,
            classification: evaluation.classification,
            price: bar.close(),
            score: evaluation.breakdown.total,
            confirmations: evaluation.confirmation_count(),
        });
    }
}
