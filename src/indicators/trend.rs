//! Directional movement: +DI, -DI and ADX

use serde::Serialize;

use super::undefined;
use crate::OHLCV;

/// ADX with its directional components, index-aligned with the bars
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdxSeries {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

/// Average Directional Index.
///
/// +DM, -DM and TR are Wilder-smoothed from a mean seed at `period`; the DIs
/// are defined from there. DX is undefined when neither side moved. ADX is
/// seeded by the mean of the first `period` consecutive defined DX values
/// (index `2 * period - 1` on ordinary data) and Wilder-smoothed after; an
/// undefined DX past that point carries the previous ADX forward.
pub fn adx<T: OHLCV>(bars: &[T], period: usize) -> AdxSeries {
    let n = bars.len();
    let mut out = AdxSeries {
        adx: undefined(n),
        plus_di: undefined(n),
        minus_di: undefined(n),
    };
    if period == 0 || n <= period {
        return out;
    }

    let mut tr = vec![0.0; n];
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let (cur, prev) = (&bars[i], &bars[i - 1]);
        let up = cur.high() - prev.high();
        let down = prev.low() - cur.low();
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
        let pc = prev.close();
        tr[i] = (cur.high() - cur.low())
            .max((cur.high() - pc).abs())
            .max((cur.low() - pc).abs());
    }

    let p = period as f64;
    let seed = |v: &[f64]| v[1..=period].iter().sum::<f64>() / p;
    let (mut s_tr, mut s_plus, mut s_minus) = (seed(&tr), seed(&plus_dm), seed(&minus_dm));

    let mut dx_run: Vec<f64> = Vec::with_capacity(period);
    let mut adx_prev: Option<f64> = None;

    for i in period..n {
        if i > period {
            s_tr = (s_tr * (p - 1.0) + tr[i]) / p;
            s_plus = (s_plus * (p - 1.0) + plus_dm[i]) / p;
            s_minus = (s_minus * (p - 1.0) + minus_dm[i]) / p;
        }

        let (pdi, mdi) = if s_tr > 0.0 {
            (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
        } else {
            (0.0, 0.0)
        };
        out.plus_di[i] = pdi;
        out.minus_di[i] = mdi;

        let di_sum = pdi + mdi;
        let dx = (di_sum > 0.0).then(|| 100.0 * (pdi - mdi).abs() / di_sum);

        match (adx_prev, dx) {
            (Some(prev), Some(dx)) => {
                let next = (prev * (p - 1.0) + dx) / p;
                out.adx[i] = next;
                adx_prev = Some(next);
            }
            (Some(prev), None) => out.adx[i] = prev,
            (None, Some(dx)) => {
                dx_run.push(dx);
                if dx_run.len() == period {
                    let seeded = dx_run.iter().sum::<f64>() / p;
                    out.adx[i] = seeded;
                    adx_prev = Some(seeded);
                }
            }
            (None, None) => dx_run.clear(),
        }
    }
    out
}
