//! Disparity statistics between two intensity arrays on a shared grid.
//!
//! All integrals are trapezoidal over the grid; denominators are floored at
//! [`TINY`] through [`safe_divide`] so every metric stays defined.

use serde::{Deserialize, Serialize};

use super::grid::{safe_divide, Grid, TINY};
use crate::error::{Result, SpectrumError};

/// Scalar disparity metrics plus the grid they were computed on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisparityReport {
    /// ∫|A−B| dE divided by the grid span.
    #[serde(rename = "L1_norm_area")]
    pub l1_norm_area: f64,
    /// ∫|A−B| dE divided by ∫A dE. Not symmetric in A and B.
    #[serde(rename = "Rel_change")]
    pub rel_change: f64,
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(rename = "Cosine")]
    pub cosine: f64,
    /// ∫min(A,B) dE over ∫max(A,B) dE.
    #[serde(rename = "Overlap")]
    pub overlap: f64,
    /// Energy of B's maximum minus energy of A's maximum (eV).
    #[serde(rename = "PeakShift_eV")]
    pub peak_shift: f64,
    #[serde(rename = "E_left")]
    pub e_left: f64,
    #[serde(rename = "E_right")]
    pub e_right: f64,
    #[serde(rename = "Span")]
    pub span: f64,
    #[serde(rename = "Step")]
    pub step: f64,
}

/// Index of the first maximum.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn zip_map(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

/// Compare `a` (reference) against `b` on `grid`.
///
/// Both arrays must be aligned to `grid` and hold at least two samples.
pub fn compute_metrics(grid: &Grid, a: &[f64], b: &[f64]) -> Result<DisparityReport> {
    if a.len() != b.len() {
        return Err(SpectrumError::LengthMismatch { left: a.len(), right: b.len() });
    }
    if a.len() != grid.len() {
        return Err(SpectrumError::LengthMismatch { left: grid.len(), right: a.len() });
    }
    if grid.len() < 2 {
        return Err(SpectrumError::TooFewSamples(grid.len()));
    }

    let span = grid.span();
    let l1_area = grid.integrate(&zip_map(a, b, |x, y| (x - y).abs()));
    let l1_norm_area = safe_divide(l1_area, span, TINY);
    let rel_change = safe_divide(l1_area, grid.integrate(a), TINY);

    let mse = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>() / a.len() as f64;
    let rmse = mse.sqrt();

    let norm_a = dot(a, a).sqrt().max(TINY);
    let norm_b = dot(b, b).sqrt().max(TINY);
    let cosine = dot(a, b) / (norm_a * norm_b);

    let overlap = safe_divide(
        grid.integrate(&zip_map(a, b, f64::min)),
        grid.integrate(&zip_map(a, b, f64::max)),
        TINY,
    );

    let points = grid.points();
    // Non-empty inputs always have a maximum.
    let peak_a = argmax(a).map_or(f64::NAN, |i| points[i]);
    let peak_b = argmax(b).map_or(f64::NAN, |i| points[i]);

    Ok(DisparityReport {
        l1_norm_area,
        rel_change,
        rmse,
        cosine,
        overlap,
        peak_shift: peak_b - peak_a,
        e_left: grid.first(),
        e_right: grid.last(),
        span,
        step: grid.step(),
    })
}
