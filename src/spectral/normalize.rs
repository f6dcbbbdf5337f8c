use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::grid::trapezoid_unit;
use crate::error::SpectrumError;

/// How intensities are rescaled before comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormMode {
    None,
    /// Divide by the maximum.
    #[default]
    Max,
    /// Divide by the trapezoidal integral over sample indices (unit spacing).
    Area,
}

impl FromStr for NormMode {
    type Err = SpectrumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(NormMode::None),
            "max" => Ok(NormMode::Max),
            "area" => Ok(NormMode::Area),
            other => Err(SpectrumError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for NormMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NormMode::None => "none",
            NormMode::Max => "max",
            NormMode::Area => "area",
        };
        f.write_str(name)
    }
}

/// Divide by the largest value; a non-positive maximum leaves `values` as is.
pub fn peak_normalize(values: &[f64]) -> Vec<f64> {
    let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    scale_by(values, peak)
}

fn scale_by(values: &[f64], divisor: f64) -> Vec<f64> {
    if divisor > 0.0 {
        values.iter().map(|v| v / divisor).collect()
    } else {
        values.to_vec()
    }
}

/// Rescale `intensity` according to `mode`.
pub fn normalize(intensity: &[f64], mode: NormMode) -> Vec<f64> {
    match mode {
        NormMode::None => intensity.to_vec(),
        NormMode::Max => peak_normalize(intensity),
        NormMode::Area => scale_by(intensity, trapezoid_unit(intensity)),
    }
}
