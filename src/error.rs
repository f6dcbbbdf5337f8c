use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the numeric core and the loaders.
///
/// Degenerate divisors (a zero maximum or integral) are never reported here;
/// they are absorbed where they occur so the metrics stay defined.
#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("no usable numeric rows in {}", path.display())]
    ParseFailure { path: PathBuf },

    #[error("spectra have no overlapping energy range (left = {left}, right = {right})")]
    NoOverlap { left: f64, right: f64 },

    #[error("unknown normalization mode: {0:?} (expected none, max or area)")]
    UnknownMode(String),

    #[error("invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("array lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("at least 2 samples are required, got {0}")]
    TooFewSamples(usize),

    #[error("{0} is empty")]
    EmptyInput(&'static str),

    #[error("invalid column selection {0:?} (expected \"energy,intensity\", e.g. \"0,2\")")]
    InvalidColumns(String),
}

pub type Result<T> = std::result::Result<T, SpectrumError>;
