//! False-signal heuristics
//!
//! Each red flag adds a fixed penalty to a 0-100 "false score". The score maps
//! onto a confidence multiplier and a verdict; whether the multiplier is
//! applied to the live signal is the caller's decision
//! ([`crate::config::AdvisoryPolicy`]).

use std::fmt;

use serde::Serialize;

use super::IndicatorSnapshot;
use crate::{indicators::SupportResistanceLevel, OHLCVExt, Side, OHLCV};

/// Bars the volume average covers (current bar included)
const VOLUME_WINDOW: usize = 20;
/// Below this many bars every signal is rejected outright
const MIN_BARS: usize = 5;
const LEVEL_PROXIMITY_PCT: f64 = 3.0;
const SMA_DISTANCE_PCT: f64 = 5.0;
const GAP_PCT: f64 = 1.5;

// ============================================================
// RED FLAGS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedFlagKind {
    WeakTrend,
    UnsupportedVolume,
    LevelTrap,
    Overextended,
    LongWick,
    FakeBreakout,
    OpposingMomentum,
    MaMisalignment,
    VolumeTrap,
    GapAgainstClose,
    /// Informational: price poked through a level and closed back inside
    FalseBreakout,
    /// Informational: wick swept below support, close held above
    StopHunt,
}

impl RedFlagKind {
    /// Points this flag adds to the false score
    pub fn penalty(self) -> u32 {
        match self {
            RedFlagKind::WeakTrend => 35,
            RedFlagKind::UnsupportedVolume => 28,
            RedFlagKind::LevelTrap => 25,
            RedFlagKind::Overextended => 15,
            RedFlagKind::LongWick => 18,
            RedFlagKind::FakeBreakout => 30,
            RedFlagKind::OpposingMomentum => 20,
            RedFlagKind::MaMisalignment => 22,
            RedFlagKind::VolumeTrap => 15,
            RedFlagKind::GapAgainstClose => 15,
            RedFlagKind::FalseBreakout | RedFlagKind::StopHunt => 0,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RedFlagKind::WeakTrend => "weak trend (ADX)",
            RedFlagKind::UnsupportedVolume => "breakout without volume",
            RedFlagKind::LevelTrap => "running into a level",
            RedFlagKind::Overextended => "stretched from SMA50 (%)",
            RedFlagKind::LongWick => "long wick (wick/body)",
            RedFlagKind::FakeBreakout => "3-bar reversal after breakout",
            RedFlagKind::OpposingMomentum => "RSI against the signal",
            RedFlagKind::MaMisalignment => "moving averages misaligned",
            RedFlagKind::VolumeTrap => "volume spike then collapse",
            RedFlagKind::GapAgainstClose => "gap closed against (%)",
            RedFlagKind::FalseBreakout => "false breakout",
            RedFlagKind::StopHunt => "stop hunt below support",
        }
    }
}

/// One triggered heuristic with the reading behind it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RedFlag {
    pub kind: RedFlagKind,
    pub penalty: u32,
    pub value: f64,
}

impl RedFlag {
    fn new(kind: RedFlagKind, value: f64) -> Self {
        Self {
            kind,
            penalty: kind.penalty(),
            value,
        }
    }
}

impl fmt::Display for RedFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:.2} (+{})", self.kind.description(), self.value, self.penalty)
    }
}

// ============================================================
// QUALITY
// ============================================================

/// Verdict bucket of a false score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Reject,
    Caution,
    MinorCaution,
    Accept,
}

impl Verdict {
    pub fn from_score(false_score: u32) -> Self {
        match false_score {
            90.. => Verdict::Reject,
            75..=89 => Verdict::Caution,
            60..=74 => Verdict::MinorCaution,
            _ => Verdict::Accept,
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            Verdict::Reject => 0.0,
            Verdict::Caution => 0.7,
            Verdict::MinorCaution => 0.9,
            Verdict::Accept => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Reject => "REJECT",
            Verdict::Caution => "CAUTION",
            Verdict::MinorCaution => "MINOR_CAUTION",
            Verdict::Accept => "ACCEPT",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalQuality {
    /// 0-100, higher means more likely false
    pub false_score: u32,
    pub confidence_multiplier: f64,
    pub verdict: Verdict,
    pub red_flags: Vec<RedFlag>,
}

impl SignalQuality {
    fn from_flags(red_flags: Vec<RedFlag>) -> Self {
        let false_score = red_flags.iter().map(|f| f.penalty).sum::<u32>().min(100);
        let verdict = Verdict::from_score(false_score);
        Self {
            false_score,
            confidence_multiplier: verdict.multiplier(),
            verdict,
            red_flags,
        }
    }
}

// ============================================================
// VALIDATOR
// ============================================================

/// Sanity checks for a preliminary BUY/SELL on the last bar
pub struct SignalValidator;

impl SignalValidator {
    /// Score the last bar of `bars` for signs of a false `side` signal.
    ///
    /// Heuristics whose inputs are undefined abstain. Fewer than five bars is
    /// an automatic reject.
    pub fn validate<T: OHLCV>(
        side: Side,
        bars: &[T],
        snapshot: &IndicatorSnapshot,
        levels: &[SupportResistanceLevel],
    ) -> SignalQuality {
        if bars.len() < MIN_BARS {
            return SignalQuality {
                false_score: 100,
                confidence_multiplier: 0.0,
                verdict: Verdict::Reject,
                red_flags: Vec::new(),
            };
        }

        let last = bars.len() - 1;
        let bar = &bars[last];
        let prev = &bars[last - 1];
        let price = snapshot.close;
        let buy = side == Side::Buy;
        let mut flags = Vec::new();

        if let Some(adx) = snapshot.adx.filter(|&a| a < 20.0) {
            flags.push(RedFlag::new(RedFlagKind::WeakTrend, adx));
        }

        let window = VOLUME_WINDOW.min(bars.len());
        let avg_volume =
            bars[bars.len() - window..].iter().map(|b| b.volume()).sum::<f64>() / window as f64;
        if avg_volume > 0.0 {
            let ratio = bar.volume() / avg_volume;
            let breaking = snapshot
                .sma_fast
                .is_some_and(|s| if buy { price > s } else { price < s });
            if breaking && ratio < 0.8 {
                flags.push(RedFlag::new(RedFlagKind::UnsupportedVolume, ratio));
            }

            let prev_ratio = prev.volume() / avg_volume;
            if prev_ratio > 1.5 && ratio < 0.8 {
                flags.push(RedFlag::new(RedFlagKind::VolumeTrap, prev_ratio));
            }
        }

        let trap = levels
            .iter()
            .filter(|l| {
                let ahead = if buy {
                    l.is_resistance && price < l.price
                } else {
                    l.is_support && price > l.price
                };
                ahead && l.distance(price) * 100.0 < LEVEL_PROXIMITY_PCT
            })
            .map(|l| l.distance(price) * 100.0)
            .min_by(f64::total_cmp);
        if let Some(distance) = trap {
            flags.push(RedFlag::new(RedFlagKind::LevelTrap, distance));
        }

        if let Some(sma) = snapshot.sma_slow {
            let stretch = (price - sma).abs() / sma * 100.0;
            if stretch > SMA_DISTANCE_PCT {
                flags.push(RedFlag::new(RedFlagKind::Overextended, stretch));
            }
        }

        let body = bar.body();
        let wick = bar.upper_shadow().max(bar.lower_shadow());
        if body > 0.0 && wick > 2.0 * body {
            flags.push(RedFlag::new(RedFlagKind::LongWick, wick / body));
        }

        if let Some(sma) = snapshot.sma_slow {
            let closes = [bars[last - 2].close(), prev.close(), bar.close()];
            let reversed = if buy {
                closes[0] > sma && closes[1] < closes[0] && closes[2] < closes[1]
            } else {
                closes[0] < sma && closes[1] > closes[0] && closes[2] > closes[1]
            };
            if reversed {
                flags.push(RedFlag::new(RedFlagKind::FakeBreakout, closes[2]));
            }
        }

        if let Some(rsi) = snapshot.rsi {
            if (buy && rsi < 40.0) || (!buy && rsi > 60.0) {
                flags.push(RedFlag::new(RedFlagKind::OpposingMomentum, rsi));
            }
        }

        if let (Some(fast), Some(slow), Some(long)) =
            (snapshot.sma_fast, snapshot.sma_slow, snapshot.ema_slow)
        {
            let aligned = if buy {
                fast > slow && slow > long
            } else {
                fast < slow && slow < long
            };
            if !aligned {
                flags.push(RedFlag::new(RedFlagKind::MaMisalignment, fast));
            }
        }

        let gap = (bar.open() - prev.close()).abs() / prev.close() * 100.0;
        let closed_against = if buy { bar.is_bearish() } else { bar.is_bullish() };
        if closed_against && gap > GAP_PCT {
            flags.push(RedFlag::new(RedFlagKind::GapAgainstClose, gap));
        }

        let support = nearest_level(levels, price, |l| l.is_support);
        let resistance = nearest_level(levels, price, |l| l.is_resistance);
        if is_false_breakout(bars, support, resistance, 3) {
            flags.push(RedFlag::new(RedFlagKind::FalseBreakout, price));
        }
        if let (Some(level), Some(atr)) = (support, snapshot.atr) {
            if is_stop_hunt(bar, level, atr) {
                flags.push(RedFlag::new(RedFlagKind::StopHunt, level));
            }
        }

        SignalQuality::from_flags(flags)
    }
}

/// Strongest level of a kind within the proximity band around `price`
fn nearest_level(
    levels: &[SupportResistanceLevel],
    price: f64,
    kind: impl Fn(&SupportResistanceLevel) -> bool,
) -> Option<f64> {
    levels
        .iter()
        .find(|l| kind(*l) && l.distance(price) * 100.0 < LEVEL_PROXIMITY_PCT)
        .map(|l| l.price)
}

// ============================================================
// LEVEL HEURISTICS
// ============================================================

/// The last bar pierced a level intrabar and closed beyond it, while one of
/// the previous `min(lookback, 3) - 1` bars still closed on the other side.
pub fn is_false_breakout<T: OHLCV>(
    bars: &[T],
    support: Option<f64>,
    resistance: Option<f64>,
    lookback: usize,
) -> bool {
    let Some(last) = bars.len().checked_sub(1) else {
        return false;
    };
    if bars.len() < lookback {
        return false;
    }
    let bar = &bars[last];

    let above = resistance.filter(|&r| bar.close() > r && bar.low() < r);
    let below = support.filter(|&s| bar.close() < s && bar.high() > s);
    if above.is_none() && below.is_none() {
        return false;
    }

    let check = lookback.min(3);
    (1..check).filter_map(|k| last.checked_sub(k)).any(|j| {
        let c = bars[j].close();
        above.is_some_and(|r| c < r) || below.is_some_and(|s| c > s)
    })
}

/// Close held above support while the low swept more than half an ATR below it
pub fn is_stop_hunt<T: OHLCV>(bar: &T, support: f64, atr: f64) -> bool {
    bar.close() > support && bar.low() < support - 0.5 * atr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PricePoint;

    fn bar(o: f64, h: f64, l: f64, c: f64, v: u64) -> PricePoint {
        PricePoint::new(0, o, h, l, c, v)
    }

    fn calm(n: usize) -> Vec<PricePoint> {
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64 * 0.1;
                bar(c - 0.05, c + 0.05, c - 0.1, c, 1_000)
            })
            .collect()
    }

    fn healthy_snapshot(close: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            close,
            adx: Some(30.0),
            sma_fast: Some(close - 0.5),
            sma_slow: Some(close - 1.0),
            ema_slow: Some(close - 3.0),
            rsi: Some(60.0),
            atr: Some(0.2),
        }
    }

    fn kinds(q: &SignalQuality) -> Vec<RedFlagKind> {
        q.red_flags.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn test_too_few_bars_rejects() {
        let q = SignalValidator::validate(Side::Buy, &calm(4), &healthy_snapshot(100.0), &[]);
        assert_eq!(q.false_score, 100);
        assert_eq!(q.verdict, Verdict::Reject);
        assert_eq!(q.confidence_multiplier, 0.0);
    }

    #[test]
    fn test_clean_buy_is_accepted() {
        let bars = calm(30);
        let close = bars[29].close;
        let q = SignalValidator::validate(Side::Buy, &bars, &healthy_snapshot(close), &[]);
        assert_eq!(q.false_score, 0, "{:?}", q.red_flags);
        assert_eq!(q.verdict, Verdict::Accept);
        assert_eq!(q.confidence_multiplier, 1.0);
    }

    #[test]
    fn test_penalties_accumulate() {
        let bars = calm(30);
        let close = bars[29].close;
        let snapshot = IndicatorSnapshot {
            adx: Some(15.0),
            rsi: Some(35.0),
            ..healthy_snapshot(close)
        };
        let q = SignalValidator::validate(Side::Buy, &bars, &snapshot, &[]);
        assert_eq!(kinds(&q), vec![RedFlagKind::WeakTrend, RedFlagKind::OpposingMomentum]);
        assert_eq!(q.false_score, 55);
        assert_eq!(q.verdict, Verdict::Accept);

        let misaligned = IndicatorSnapshot {
            ema_slow: Some(close + 5.0),
            ..snapshot
        };
        let q = SignalValidator::validate(Side::Buy, &bars, &misaligned, &[]);
        assert_eq!(q.false_score, 77);
        assert_eq!(q.verdict, Verdict::Caution);
        assert_eq!(q.confidence_multiplier, 0.7);
    }

    #[test]
    fn test_false_score_is_clamped() {
        let bars = calm(30);
        let close = bars[29].close;
        let snapshot = IndicatorSnapshot {
            adx: Some(10.0),
            rsi: Some(80.0),
            sma_fast: Some(close + 1.0),
            sma_slow: Some(close * 1.2),
            ema_slow: Some(close * 1.1),
            ..healthy_snapshot(close)
        };
        let q = SignalValidator::validate(Side::Sell, &bars, &snapshot, &[]);
        assert!(q.red_flags.iter().map(|f| f.penalty).sum::<u32>() > 100);
        assert_eq!(q.false_score, 100);
        assert_eq!(q.verdict, Verdict::Reject);
    }

    #[test]
    fn test_level_trap_for_buy_under_resistance() {
        let bars = calm(30);
        let close = bars[29].close;
        let levels = vec![SupportResistanceLevel {
            price: close * 1.01,
            touches: 3,
            is_support: false,
            is_resistance: true,
            strength: 0.6,
        }];
        let q = SignalValidator::validate(Side::Buy, &bars, &healthy_snapshot(close), &levels);
        assert_eq!(kinds(&q), vec![RedFlagKind::LevelTrap]);
        assert!((q.red_flags[0].value - 100.0 / 101.0).abs() < 1e-9);
    }

    #[test]
    fn test_volume_trap_and_unsupported_breakout() {
        let mut bars = calm(30);
        bars[28].volume = 10_000;
        bars[29].volume = 100;
        let close = bars[29].close;
        let q = SignalValidator::validate(Side::Buy, &bars, &healthy_snapshot(close), &[]);
        assert!(kinds(&q).contains(&RedFlagKind::UnsupportedVolume));
        assert!(kinds(&q).contains(&RedFlagKind::VolumeTrap));
    }

    #[test]
    fn test_fake_breakout_reversal() {
        let mut bars = calm(30);
        bars[27] = bar(101.0, 103.2, 100.9, 103.0, 1_000);
        bars[28] = bar(103.0, 103.1, 102.0, 102.1, 1_000);
        bars[29] = bar(102.1, 102.2, 101.4, 101.5, 1_000);
        let snapshot = IndicatorSnapshot {
            sma_slow: Some(101.0),
            sma_fast: Some(101.2),
            ema_slow: Some(99.0),
            ..healthy_snapshot(101.5)
        };
        let q = SignalValidator::validate(Side::Buy, &bars, &snapshot, &[]);
        assert!(kinds(&q).contains(&RedFlagKind::FakeBreakout));
    }

    #[test]
    fn test_is_false_breakout() {
        let bars = [
            bar(99.0, 99.5, 98.5, 99.0, 1),
            bar(99.0, 99.8, 98.8, 99.5, 1),
            bar(99.5, 101.0, 99.2, 100.6, 1),
        ];
        assert!(is_false_breakout(&bars, None, Some(100.0), 3));
        assert!(!is_false_breakout(&bars, None, Some(98.0), 3));
        assert!(!is_false_breakout(&bars, None, Some(100.0), 5));
    }

    #[test]
    fn test_is_stop_hunt() {
        let swept = bar(100.5, 101.0, 98.0, 100.8, 1);
        assert!(is_stop_hunt(&swept, 100.0, 2.0));
        assert!(!is_stop_hunt(&swept, 100.0, 6.0));
        assert!(!is_stop_hunt(&swept, 101.0, 2.0));
    }

    #[test]
    fn test_verdict_steps() {
        assert_eq!(Verdict::from_score(100), Verdict::Reject);
        assert_eq!(Verdict::from_score(90), Verdict::Reject);
        assert_eq!(Verdict::from_score(89), Verdict::Caution);
        assert_eq!(Verdict::from_score(75), Verdict::Caution);
        assert_eq!(Verdict::from_score(74), Verdict::MinorCaution);
        assert_eq!(Verdict::from_score(60), Verdict::MinorCaution);
        assert_eq!(Verdict::from_score(59), Verdict::Accept);
    }
}
