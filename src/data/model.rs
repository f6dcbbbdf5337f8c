use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrumError};

// ---------------------------------------------------------------------------
// Spectrum – ordered (energy, intensity) samples
// ---------------------------------------------------------------------------

/// A one-dimensional emission spectrum on an energy axis (eV).
///
/// Loaders hand out spectra sorted by energy. Every transform in the crate
/// returns a new value instead of mutating one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Energy axis (x).
    pub energy: Vec<f64>,
    /// Intensity axis (y) – same length as `energy`.
    pub intensity: Vec<f64>,
}

impl Spectrum {
    /// Pair up two equally long arrays. Order is kept as supplied.
    pub fn new(energy: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        if energy.len() != intensity.len() {
            return Err(SpectrumError::LengthMismatch {
                left: energy.len(),
                right: intensity.len(),
            });
        }
        Ok(Self { energy, intensity })
    }

    /// Build from `(energy, intensity)` pairs, sorting by energy.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let (energy, intensity) = pairs.into_iter().unzip();
        Self { energy, intensity }.sorted()
    }

    /// Stable sort by energy. Duplicate energies are kept.
    pub fn sorted(self) -> Self {
        let mut pairs: Vec<(f64, f64)> = self.samples().collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (energy, intensity) = pairs.into_iter().unzip();
        Self { energy, intensity }
    }

    /// Drop leading and trailing zero-intensity samples.
    ///
    /// An all-zero spectrum is returned unchanged.
    pub fn trim_zeros(self) -> Self {
        let first = self.intensity.iter().position(|&v| v != 0.0);
        let last = self.intensity.iter().rposition(|&v| v != 0.0);
        match (first, last) {
            (Some(first), Some(last)) => Self {
                energy: self.energy[first..=last].to_vec(),
                intensity: self.intensity[first..=last].to_vec(),
            },
            _ => self,
        }
    }

    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.energy.iter().copied().zip(self.intensity.iter().copied())
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }

    /// Smallest and largest energy, `None` when empty.
    pub fn energy_range(&self) -> Option<(f64, f64)> {
        let min = self.energy.iter().copied().reduce(f64::min)?;
        let max = self.energy.iter().copied().reduce(f64::max)?;
        Some((min, max))
    }
}

// ---------------------------------------------------------------------------
// RateTable – discrete transition lines
// ---------------------------------------------------------------------------

/// One transition line: a center energy and its weight (rate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub energy: f64,
    pub weight: f64,
}

/// Unsorted list of weighted lines; energies need not be unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub lines: Vec<Line>,
}

impl RateTable {
    pub fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn energy_range(&self) -> Option<(f64, f64)> {
        let min = self.lines.iter().map(|l| l.energy).reduce(f64::min)?;
        let max = self.lines.iter().map(|l| l.energy).reduce(f64::max)?;
        Some((min, max))
    }

    /// The raw lines as a spectrum, in table order.
    pub fn to_spectrum(&self) -> Spectrum {
        Spectrum {
            energy: self.lines.iter().map(|l| l.energy).collect(),
            intensity: self.lines.iter().map(|l| l.weight).collect(),
        }
    }
}

impl FromIterator<(f64, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        Self {
            lines: iter
                .into_iter()
                .map(|(energy, weight)| Line { energy, weight })
                .collect(),
        }
    }
}
