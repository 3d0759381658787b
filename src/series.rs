//! Price series container and calendar helpers

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, OHLCVExt, PricePoint, Result, OHLCV};

/// Chronological bars for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    symbol: String,
    bars: Vec<PricePoint>,
}

impl Series {
    /// Wrap bars that the data collaborator already sanitized
    pub fn new(symbol: impl Into<String>, bars: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// Like [`Series::new`], but rejects malformed bars
    pub fn validated(symbol: impl Into<String>, bars: Vec<PricePoint>) -> Result<Self> {
        validate_bars(&bars)?;
        Ok(Self::new(symbol, bars))
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PricePoint] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.bars.last()
    }
}

/// Check every bar and the timestamp ordering.
///
/// Errors carry the index of the first offending bar.
pub fn validate_bars<T: OHLCV>(bars: &[T]) -> Result<()> {
    let mut prev_ts: Option<i64> = None;
    for (index, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            AnalysisError::InvalidPricePoint { reason, .. } => {
                AnalysisError::InvalidPricePoint { index, reason }
            }
            other => other,
        })?;

        if let Some(ts) = bar.timestamp() {
            if prev_ts.is_some_and(|prev| ts <= prev) {
                return Err(AnalysisError::InvalidPricePoint {
                    index,
                    reason: "timestamp not increasing",
                });
            }
            prev_ts = Some(ts);
        }
    }
    Ok(())
}

// ============================================================
// CALENDAR
// ============================================================

/// Calendar date of an epoch-millisecond timestamp at a fixed offset
pub fn calendar_date(timestamp_ms: i64, offset: FixedOffset) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|dt| dt.with_timezone(&offset).date_naive())
}

/// Closing bar of one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    /// Timestamp of the last bar of that day
    pub timestamp: i64,
    pub close: f64,
}

/// End-of-day aggregation: the last bar of each calendar day, newest `max_days`.
///
/// Bars without a timestamp are skipped. Intraday series collapse to one
/// point per day; daily series pass through unchanged.
pub fn daily_closes<T: OHLCV>(bars: &[T], offset: FixedOffset, max_days: usize) -> Vec<DailyClose> {
    let mut days: Vec<DailyClose> = Vec::new();
    for bar in bars {
        let Some(timestamp) = bar.timestamp() else {
            continue;
        };
        let Some(date) = calendar_date(timestamp, offset) else {
            continue;
        };
        let close = DailyClose {
            date,
            timestamp,
            close: bar.close(),
        };
        match days.last_mut() {
            Some(last) if last.date == date => *last = close,
            _ => days.push(close),
        }
    }

    let skip = days.len().saturating_sub(max_days);
    days.split_off(skip)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3_600_000;
    const DAY: i64 = 24 * HOUR;

    fn bar(ts: i64, close: f64) -> PricePoint {
        PricePoint::new(ts, close, close + 1.0, close - 1.0, close, 100)
    }

    #[test]
    fn test_validate_bars_reports_index() {
        let mut bars: Vec<_> = (0..5).map(|i| bar(i * DAY, 10.0)).collect();
        assert!(validate_bars(&bars).is_ok());

        bars[3].close = -1.0;
        assert_eq!(
            validate_bars(&bars),
            Err(AnalysisError::InvalidPricePoint {
                index: 3,
                reason: "non-positive price"
            })
        );
    }

    #[test]
    fn test_validate_bars_rejects_duplicate_timestamp() {
        let bars = vec![bar(0, 10.0), bar(DAY, 10.0), bar(DAY, 11.0)];
        assert_eq!(
            validate_bars(&bars),
            Err(AnalysisError::InvalidPricePoint {
                index: 2,
                reason: "timestamp not increasing"
            })
        );
        assert!(Series::validated("DUP", bars).is_err());
    }

    #[test]
    fn test_calendar_date_respects_offset() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let istanbul = FixedOffset::east_opt(3 * 3600).unwrap();

        // 1970-01-01 22:00 UTC is already Jan 2nd at +03:00
        let ts = 22 * HOUR;
        assert_eq!(calendar_date(ts, utc), NaiveDate::from_ymd_opt(1970, 1, 1));
        assert_eq!(calendar_date(ts, istanbul), NaiveDate::from_ymd_opt(1970, 1, 2));
    }

    #[test]
    fn test_daily_closes_keeps_last_bar_per_day() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let bars = vec![
            bar(10 * HOUR, 1.0),
            bar(14 * HOUR, 2.0),
            bar(DAY + 10 * HOUR, 3.0),
            bar(2 * DAY + 10 * HOUR, 4.0),
            bar(2 * DAY + 15 * HOUR, 5.0),
        ];

        let days = daily_closes(&bars, utc, 10);
        let closes: Vec<f64> = days.iter().map(|d| d.close).collect();
        assert_eq!(closes, vec![2.0, 3.0, 5.0]);
        assert_eq!(days[2].timestamp, 2 * DAY + 15 * HOUR);

        let newest = daily_closes(&bars, utc, 2);
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0].close, 3.0);
    }

    #[test]
    fn test_series_accessors() {
        let series = Series::new("ASELS", vec![bar(0, 5.0), bar(DAY, 6.0)]);
        assert_eq!(series.symbol(), "ASELS");
        assert_eq!(series.len(), 2);
        assert!(!series.is_empty());
        assert_eq!(series.last().map(|b| b.close), Some(6.0));
    }
}
