use crate::error::{Result, SpectrumError};

/// Floor used in denominators of the disparity metrics.
pub const TINY: f64 = 1e-20;

/// Divide, flooring the denominator at `floor`.
///
/// Only changes the result when `denominator < floor`, i.e. when the
/// quotient would otherwise be undefined or blow up.
#[inline]
pub fn safe_divide(numerator: f64, denominator: f64, floor: f64) -> f64 {
    numerator / denominator.max(floor)
}

/// Trapezoidal integral of `y` sampled at `x`.
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    debug_assert_eq!(y.len(), x.len());
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
        .sum()
}

/// Trapezoidal integral of `y` at unit spacing between samples.
pub fn trapezoid_unit(y: &[f64]) -> f64 {
    y.windows(2).map(|w| 0.5 * (w[0] + w[1])).sum()
}

/// Median of the strictly positive, finite successive differences of `x`.
///
/// Falls back to the mean spacing when no difference qualifies.
pub fn median_spacing(x: &[f64]) -> f64 {
    let mut diffs: Vec<f64> = x
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0 && d.is_finite())
        .collect();
    if diffs.is_empty() {
        return match (x.first(), x.last()) {
            (Some(first), Some(last)) => (last - first) / (x.len().saturating_sub(1).max(1)) as f64,
            _ => 0.0,
        };
    }
    diffs.sort_by(f64::total_cmp);
    let mid = diffs.len() / 2;
    if diffs.len() % 2 == 0 {
        0.5 * (diffs[mid - 1] + diffs[mid])
    } else {
        diffs[mid]
    }
}

/// A uniform energy grid `start + i * step`, `i = 0..len`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    points: Vec<f64>,
    step: f64,
}

impl Grid {
    /// Half-open range `[start, stop)` at `step`, the way `arange` lays it out.
    ///
    /// Callers wanting `stop` included pass `stop + step / 2`.
    pub fn arange(start: f64, stop: f64, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(SpectrumError::InvalidParameter { name: "eps", value: step });
        }
        if !start.is_finite() {
            return Err(SpectrumError::InvalidParameter { name: "grid start", value: start });
        }
        if !(stop.is_finite() && stop > start) {
            return Err(SpectrumError::InvalidParameter { name: "grid stop", value: stop });
        }
        let n = ((stop - start) / step).ceil() as usize;
        let points = (0..n).map(|i| start + i as f64 * step).collect();
        Ok(Self { points, step })
    }

    /// Uniform points covering `[left, right]`, `right` included within half a step.
    pub fn covering(left: f64, right: f64, step: f64) -> Result<Self> {
        Self::arange(left, right + step / 2.0, step)
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.points.first().copied().unwrap_or(f64::NAN)
    }

    pub fn last(&self) -> f64 {
        self.points.last().copied().unwrap_or(f64::NAN)
    }

    /// `last - first`.
    pub fn span(&self) -> f64 {
        self.last() - self.first()
    }

    /// Trapezoidal integral of `y` over this grid.
    pub fn integrate(&self, y: &[f64]) -> f64 {
        trapezoid(y, &self.points)
    }

    pub fn into_points(self) -> Vec<f64> {
        self.points
    }
}
