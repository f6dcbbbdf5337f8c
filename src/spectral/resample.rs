use log::debug;

use super::grid::{median_spacing, Grid};
use crate::data::model::Spectrum;
use crate::error::{Result, SpectrumError};

/// Lower bound on the automatically chosen step (eV).
pub const MIN_AUTO_STEP: f64 = 1e-4;

/// Two spectra sampled onto one shared grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    pub grid: Grid,
    /// First spectrum on `grid`.
    pub reference: Vec<f64>,
    /// Second spectrum on `grid`.
    pub candidate: Vec<f64>,
}

impl Resampled {
    pub fn step(&self) -> f64 {
        self.grid.step()
    }
}

/// Piecewise-linear interpolation of `(xp, fp)` at `x`.
///
/// `xp` must be sorted ascending. Points outside `[xp[0], xp[last]]` give 0.
pub fn interpolate(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let (Some(&lo), Some(&hi)) = (xp.first(), xp.last()) else {
        return 0.0;
    };
    if !(lo..=hi).contains(&x) {
        return 0.0;
    }
    if x == hi {
        return fp[fp.len() - 1];
    }
    // xp[j] <= x < xp[j + 1]
    let j = xp.partition_point(|&v| v <= x) - 1;
    let t = (x - xp[j]) / (xp[j + 1] - xp[j]);
    fp[j] + t * (fp[j + 1] - fp[j])
}

/// Interpolate `spectrum` at every point of `grid`.
pub fn sample_onto(spectrum: &Spectrum, grid: &Grid) -> Vec<f64> {
    grid.points()
        .iter()
        .map(|&x| interpolate(x, &spectrum.energy, &spectrum.intensity))
        .collect()
}

/// Step used when none is given: the finer of the two median spacings,
/// floored at [`MIN_AUTO_STEP`].
pub fn auto_step(first: &Spectrum, second: &Spectrum) -> f64 {
    median_spacing(&first.energy)
        .min(median_spacing(&second.energy))
        .max(MIN_AUTO_STEP)
}

/// Resample two sorted spectra onto a uniform grid over their overlap.
///
/// Fails with [`SpectrumError::NoOverlap`] when the energy ranges do not
/// intersect, before any grid is built.
pub fn resample_overlap(
    first: &Spectrum,
    second: &Spectrum,
    eps: Option<f64>,
) -> Result<Resampled> {
    let (min1, max1) = first
        .energy_range()
        .ok_or(SpectrumError::EmptyInput("first spectrum"))?;
    let (min2, max2) = second
        .energy_range()
        .ok_or(SpectrumError::EmptyInput("second spectrum"))?;

    let left = min1.max(min2);
    let right = max1.min(max2);
    if !(right > left) {
        return Err(SpectrumError::NoOverlap { left, right });
    }

    let eps = match eps {
        Some(eps) => eps,
        None => auto_step(first, second),
    };
    let grid = Grid::covering(left, right, eps)?;
    if grid.len() < 2 {
        return Err(SpectrumError::TooFewSamples(grid.len()));
    }
    debug!(
        "resampling onto [{left:.6}, {right:.6}] with step {eps:.6} ({} points)",
        grid.len()
    );

    let reference = sample_onto(first, &grid);
    let candidate = sample_onto(second, &grid);
    Ok(Resampled {
        grid,
        reference,
        candidate,
    })
}
