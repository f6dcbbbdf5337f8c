use std::f64::consts::FRAC_PI_2;

use log::debug;

use super::grid::Grid;
use crate::config::BroadeningParams;
use crate::data::model::{RateTable, Spectrum};
use crate::error::{Result, SpectrumError};

/// Line-shape kernel centered at `mu` with width `delta`, evaluated at `x`.
///
/// `exp(-2 ((x - mu) / delta)^2) / (delta * sqrt(pi / 2))`, which integrates
/// to 1 over `x`. Kept in this form for output compatibility with existing
/// broadened spectra.
#[inline]
pub fn gaussian_kernel(x: f64, mu: f64, delta: f64) -> f64 {
    let coeff = 1.0 / (delta * FRAC_PI_2.sqrt());
    let d = (x - mu) / delta;
    coeff * (-2.0 * d * d).exp()
}

/// Grid spanning the lines plus `kappa * delta` on both sides.
pub fn broadening_grid(lines: &RateTable, params: &BroadeningParams) -> Result<Grid> {
    let (min, max) = lines
        .energy_range()
        .ok_or(SpectrumError::EmptyInput("rate table"))?;
    let margin = params.kappa * params.delta;
    Grid::covering(min - margin, max + margin, params.eps)
}

/// Turn discrete weighted lines into a continuous spectrum.
///
/// Each grid point holds the weighted kernel sum over all lines divided by
/// the number of lines. With smoothing off (or `delta <= 0`) the lines are
/// returned as-is, in table order. Peak normalization is left to the caller.
pub fn broaden(lines: &RateTable, params: &BroadeningParams) -> Result<Spectrum> {
    params.validate()?;
    if lines.is_empty() {
        return Err(SpectrumError::EmptyInput("rate table"));
    }
    if !params.convolves() {
        debug!("smoothing disabled, passing {} lines through", lines.len());
        return Ok(lines.to_spectrum());
    }

    let grid = broadening_grid(lines, params)?;
    debug!(
        "broadening {} lines onto {} points (delta = {}, eps = {})",
        lines.len(),
        grid.len(),
        params.delta,
        params.eps
    );

    let n = lines.len() as f64;
    let intensity = grid
        .points()
        .iter()
        .map(|&x| {
            let sum: f64 = lines
                .lines
                .iter()
                .map(|line| line.weight * gaussian_kernel(x, line.energy, params.delta))
                .sum();
            sum / n
        })
        .collect();

    Spectrum::new(grid.into_points(), intensity)
}
