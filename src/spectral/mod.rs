//! Numeric core: alignment, normalization, metrics and broadening.
//!
//! ```text
//!   Spectrum   Spectrum            RateTable
//!       │          │                   │
//!       ▼          ▼                   ▼
//!   ┌────────────────┐           ┌───────────┐
//!   │    resample     │           │  broaden   │  Gaussian kernels → Spectrum
//!   └────────────────┘           └───────────┘
//!          │  Grid, A, B
//!          ▼
//!   ┌────────────────┐
//!   │   normalize     │  none / max / area, each array separately
//!   └────────────────┘
//!          │
//!          ▼
//!   ┌────────────────┐
//!   │    metrics      │  → DisparityReport
//!   └────────────────┘
//! ```

pub mod broaden;
pub mod grid;
pub mod metrics;
pub mod normalize;
pub mod resample;

use crate::config::CompareParams;
use crate::data::model::Spectrum;
use crate::error::Result;

use metrics::{compute_metrics, DisparityReport};
use normalize::normalize;
use resample::{resample_overlap, Resampled};

/// Outcome of comparing two spectra.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Normalized intensities on the shared grid.
    pub aligned: Resampled,
    pub report: DisparityReport,
}

/// Resample `reference` and `candidate` onto their overlap, normalize each,
/// and compute the disparity metrics.
pub fn compare(reference: &Spectrum, candidate: &Spectrum, params: &CompareParams) -> Result<Comparison> {
    params.validate()?;
    let resampled = resample_overlap(reference, candidate, params.eps)?;
    let aligned = Resampled {
        reference: normalize(&resampled.reference, params.norm),
        candidate: normalize(&resampled.candidate, params.norm),
        grid: resampled.grid,
    };
    let report = compute_metrics(&aligned.grid, &aligned.reference, &aligned.candidate)?;
    Ok(Comparison { aligned, report })
}
