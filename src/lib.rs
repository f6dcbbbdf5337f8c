//! Emission spectrum comparison and Gaussian line broadening.
//!
//! Two spectra are resampled onto a shared grid over their overlap,
//! normalized, and compared through a set of disparity metrics. A table of
//! discrete transition lines can be broadened into a continuous spectrum and
//! used as either side of a comparison.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod output;
pub mod spectral;

pub use crate::config::{BroadeningParams, CompareParams};
pub use crate::data::model::{Line, RateTable, Spectrum};
pub use crate::error::{Result, SpectrumError};
pub use crate::spectral::metrics::DisparityReport;
pub use crate::spectral::normalize::NormMode;
pub use crate::spectral::{compare, Comparison};
