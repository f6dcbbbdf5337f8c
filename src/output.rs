use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::data::model::Spectrum;
use crate::spectral::metrics::DisparityReport;
use crate::spectral::resample::Resampled;

/// Planck constant in eV·s.
pub const PLANCK_EV_S: f64 = 4.135_667_33e-15;
/// Speed of light in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
/// h·c in eV·nm.
pub const HC_EV_NM: f64 = 1239.84193;

/// Wavelength in nm of a photon of energy `ev`; zero energy maps to infinity.
pub fn ev_to_nm(ev: f64) -> f64 {
    (1e9 * PLANCK_EV_S * SPEED_OF_LIGHT) / ev
}

/// Same conversion using the rounded `1239.84193 eV·nm` constant.
pub fn ev_to_nm_approx(ev: f64) -> f64 {
    HC_EV_NM / ev
}

/// `%.{precision}e`: signed exponent with at least two digits.
pub fn fmt_sci(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return format!("{value}").to_lowercase();
    }
    let s = format!("{value:.precision$e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => s,
    }
}

/// `%.{precision}E`.
pub fn fmt_sci_upper(value: f64, precision: usize) -> String {
    fmt_sci(value, precision).to_uppercase()
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// `energy A B |A-B|` rows, `%.6f %.8e %.8e %.8e`.
pub fn write_aligned<W: Write>(out: &mut W, aligned: &Resampled) -> std::io::Result<()> {
    let rows = aligned
        .grid
        .points()
        .iter()
        .zip(&aligned.reference)
        .zip(&aligned.candidate);
    for ((e, a), b) in rows {
        writeln!(
            out,
            "{e:.6} {} {} {}",
            fmt_sci(*a, 8),
            fmt_sci(*b, 8),
            fmt_sci((a - b).abs(), 8)
        )?;
    }
    Ok(())
}

/// Two-column `energy intensity` rows, `%.6f %.8e`.
pub fn write_spectrum<W: Write>(out: &mut W, spectrum: &Spectrum) -> std::io::Result<()> {
    for (e, i) in spectrum.samples() {
        writeln!(out, "{e:.6} {}", fmt_sci(i, 8))?;
    }
    Ok(())
}

pub const FULL_HEADER: &str = "DE/eV    lambda/nm    intensity    +/-error";

/// Energy, wavelength, intensity and a zero error column, with header.
pub fn write_spectrum_full<W: Write>(out: &mut W, spectrum: &Spectrum) -> std::io::Result<()> {
    writeln!(out, "{FULL_HEADER}")?;
    for (e, i) in spectrum.samples() {
        writeln!(
            out,
            "{e:8.4}   {:>10}   {:>12}   0.00000",
            fmt_sci_upper(ev_to_nm(e), 4),
            fmt_sci_upper(i, 8)
        )?;
    }
    Ok(())
}

/// One value per line.
pub fn write_lines<W: Write, S: AsRef<str>>(out: &mut W, lines: &[S]) -> std::io::Result<()> {
    for line in lines {
        writeln!(out, "{}", line.as_ref())?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output groups
// ---------------------------------------------------------------------------

/// Output files rendered in memory and written together.
///
/// `commit` stages every file as a `<name>.tmp` sibling and renames the
/// group into place only once all of them are on disk. If staging fails,
/// the staged files are removed and no target is touched.
#[derive(Debug, Default)]
pub struct OutputFiles {
    pending: Vec<(PathBuf, Vec<u8>)>,
}

impl OutputFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, path: &Path, render: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<u8>) -> std::io::Result<()>,
    {
        let mut buf = Vec::new();
        render(&mut buf).with_context(|| format!("rendering {}", path.display()))?;
        self.pending.push((path.to_path_buf(), buf));
        Ok(())
    }

    pub fn aligned(&mut self, path: &Path, aligned: &Resampled) -> Result<()> {
        self.add(path, |out| write_aligned(out, aligned))
    }

    pub fn spectrum(&mut self, path: &Path, spectrum: &Spectrum) -> Result<()> {
        self.add(path, |out| write_spectrum(out, spectrum))
    }

    pub fn spectrum_full(&mut self, path: &Path, spectrum: &Spectrum) -> Result<()> {
        self.add(path, |out| write_spectrum_full(out, spectrum))
    }

    pub fn lines<S: AsRef<str>>(&mut self, path: &Path, lines: &[S]) -> Result<()> {
        self.add(path, |out| write_lines(out, lines))
    }

    pub fn report_json(&mut self, path: &Path, report: &DisparityReport) -> Result<()> {
        let mut buf = serde_json::to_vec_pretty(report).context("serializing report")?;
        buf.push(b'\n');
        self.pending.push((path.to_path_buf(), buf));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Write every file, or none of them.
    pub fn commit(self) -> Result<()> {
        let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(self.pending.len());
        for (path, bytes) in &self.pending {
            let tmp = staging_path(path);
            if let Err(err) = fs::write(&tmp, bytes) {
                discard(staged.iter().map(|(tmp, _)| tmp.as_path()));
                return Err(err).with_context(|| format!("writing {}", path.display()));
            }
            staged.push((tmp, path.as_path()));
        }

        for (i, (tmp, path)) in staged.iter().enumerate() {
            if let Err(err) = fs::rename(tmp, path) {
                discard(staged[i..].iter().map(|(tmp, _)| tmp.as_path()));
                return Err(err).with_context(|| format!("writing {}", path.display()));
            }
        }
        debug!("committed {} output file(s)", staged.len());
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn discard<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        if let Err(err) = fs::remove_file(path) {
            warn!("could not remove {}: {err}", path.display());
        }
    }
}

/// Write a single spectrum table.
pub fn save_spectrum(path: &Path, spectrum: &Spectrum) -> Result<()> {
    let mut files = OutputFiles::new();
    files.spectrum(path, spectrum)?;
    files.commit()
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Human-readable summary of a comparison.
pub fn format_report(report: &DisparityReport) -> String {
    [
        format!(
            "Aligned grid: E in [{:.4}, {:.4}] eV, step~{:.4} eV",
            report.e_left, report.e_right, report.step
        ),
        format!("L1_norm_area     = {:.6}   (int |d| dE / span)", report.l1_norm_area),
        format!("Relative_change  = {:.6}   (relative to reference area)", report.rel_change),
        format!("RMSE             = {}", fmt_sci(report.rmse, 6)),
        format!("Cosine similarity= {:.6}", report.cosine),
        format!("Spectrum overlap = {:.6}   (int min / int max)", report.overlap),
        format!("Peak shift (eV)  = {:.6}", report.peak_shift),
    ]
    .join("\n")
}
