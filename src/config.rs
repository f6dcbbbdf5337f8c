use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrumError};
use crate::spectral::normalize::NormMode;

/// Gaussian broadening settings. Energies in eV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadeningParams {
    /// Kernel width.
    pub delta: f64,
    /// Grid step.
    pub eps: f64,
    /// Grid margin beyond the outermost lines, in multiples of `delta`.
    pub kappa: f64,
    /// When false the raw lines are returned without convolution.
    pub smooth: bool,
}

impl Default for BroadeningParams {
    fn default() -> Self {
        Self {
            delta: 0.06,
            eps: 0.002,
            kappa: 3.0,
            smooth: true,
        }
    }
}

impl BroadeningParams {
    /// Whether a dense grid is built at all.
    pub fn convolves(&self) -> bool {
        self.smooth && self.delta > 0.0
    }

    pub fn validate(&self) -> Result<()> {
        if !self.delta.is_finite() {
            return Err(SpectrumError::InvalidParameter { name: "delta", value: self.delta });
        }
        if !self.convolves() {
            return Ok(());
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(SpectrumError::InvalidParameter { name: "eps", value: self.eps });
        }
        if !(self.kappa.is_finite() && self.kappa >= 0.0) {
            return Err(SpectrumError::InvalidParameter { name: "kappa", value: self.kappa });
        }
        Ok(())
    }
}

/// Settings for a two-spectrum comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareParams {
    /// Resampling step; chosen from the inputs when `None`.
    pub eps: Option<f64>,
    pub norm: NormMode,
}

impl CompareParams {
    pub fn validate(&self) -> Result<()> {
        match self.eps {
            Some(eps) if !(eps.is_finite() && eps > 0.0) => {
                Err(SpectrumError::InvalidParameter { name: "eps", value: eps })
            }
            _ => Ok(()),
        }
    }
}
