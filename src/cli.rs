//! Command-line front end.
//!
//! Every subcommand finishes all computation before writing, then commits
//! its outputs as one group, so a failing run leaves nothing behind.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::info;

use crate::config::{BroadeningParams, CompareParams};
use crate::data::labels::{self, Fill, Target};
use crate::data::loader::{load_rate_table, load_spectrum, ColumnSchema, LoadOptions};
use crate::data::model::Spectrum;
use crate::output::{self, OutputFiles};
use crate::spectral::broaden::broaden;
use crate::spectral::compare;
use crate::spectral::normalize::{peak_normalize, NormMode};

#[derive(Parser, Debug)]
#[command(name = "emission-disparity")]
#[command(about = "Compare emission spectra and broaden transition lines")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Align two spectra in the energy domain and report their disparity
    Compare(CompareArgs),
    /// Broaden a rate table into a continuous spectrum
    Broaden(BroadenArgs),
    /// Training-label bookkeeping (values are copied verbatim)
    #[command(subcommand)]
    Labels(LabelsCommand),
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Reference spectrum (2 or 4 columns, or a .json/.csv/.parquet dataset)
    pub reference: PathBuf,
    /// Spectrum compared against the reference
    pub candidate: PathBuf,

    /// Reference columns "energy,intensity", e.g. "0,2"; guessed when omitted
    #[arg(long, default_value = "auto")]
    pub cols1: ColumnSchema,
    /// Candidate columns "energy,intensity"
    #[arg(long, default_value = "auto")]
    pub cols2: ColumnSchema,
    /// Dataset row for the reference
    #[arg(long, default_value_t = 0)]
    pub row1: usize,
    /// Dataset row for the candidate
    #[arg(long, default_value_t = 0)]
    pub row2: usize,
    /// Keep leading/trailing zero-intensity samples
    #[arg(long)]
    pub no_trim: bool,

    /// Resampling step (eV); chosen from the inputs when omitted
    #[arg(long)]
    pub eps: Option<f64>,
    /// Normalization before the metrics: none, max or area
    #[arg(long, default_value = "max")]
    pub norm: NormMode,

    /// Treat the reference as a rate table and broaden it first
    #[arg(long)]
    pub ref_rate: bool,
    /// Gaussian width (eV) for --ref-rate
    #[arg(long, default_value_t = 0.06)]
    pub delta: f64,
    /// Broadening grid step (eV) for --ref-rate
    #[arg(long, default_value_t = 0.002)]
    pub rate_eps: f64,
    /// Broadening margin in multiples of delta for --ref-rate
    #[arg(long, default_value_t = 3.0)]
    pub kappa: f64,

    /// Aligned output table (E  I_ref  I_cand  |diff|)
    #[arg(long, default_value = "disparity_aligned.dat")]
    pub out: PathBuf,
    /// Also write the metrics as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BroadenArgs {
    /// Rate table: energy in column 0, weight in column 2
    pub rate_table: PathBuf,

    /// Gaussian width (eV)
    #[arg(long, default_value_t = 0.06)]
    pub delta: f64,
    /// Energy step (eV)
    #[arg(long, default_value_t = 0.002)]
    pub eps: f64,
    /// Grid margin in multiples of delta
    #[arg(long, default_value_t = 3.0)]
    pub kappa: f64,
    /// Skip the convolution and write the raw lines
    #[arg(long)]
    pub no_smooth: bool,
    /// Do not scale the maximum to 1
    #[arg(long)]
    pub no_norm: bool,

    /// Two-column output (E  I)
    #[arg(long, default_value = "emission_spectrum_eV.dat")]
    pub out: PathBuf,
    /// Four-column output (E  lambda  I  error)
    #[arg(long, default_value = "emission_spectrum_full.dat")]
    pub full_out: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum LabelsCommand {
    /// Write the E and f values of the training indices to two files
    Extract {
        /// Truth table with rows "index E f"
        state_file: PathBuf,
        /// Training indices (1-based), one per line
        itrain: PathBuf,
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long, default_value = "")]
        suffix: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Full-length label file: truth on training positions, fill elsewhere
    Full {
        state_file: PathBuf,
        itrain: PathBuf,
        out: PathBuf,
        /// Column to write: E or f
        #[arg(long, default_value = "E")]
        target: Target,
        /// Total sample count; defaults to the largest index seen
        #[arg(long = "N")]
        n: Option<usize>,
        /// Value for non-training positions: nan or 0
        #[arg(long, default_value = "nan")]
        fill: Fill,
    },
    /// Merge truth values into model predictions on training positions
    Mix {
        state_file: PathBuf,
        /// Predictions, one per line in sample order
        pred_file: PathBuf,
        out: PathBuf,
        #[arg(long, default_value = "itrain.dat")]
        itrain: PathBuf,
        /// Use only the first n_train training indices
        #[arg(long)]
        n_train: usize,
        #[arg(long, default_value = "E")]
        target: Target,
        /// Total sample count; defaults to the number of predictions
        #[arg(long = "N")]
        n: Option<usize>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Compare(args) => run_compare(&args),
        Command::Broaden(args) => run_broaden(&args),
        Command::Labels(cmd) => run_labels(cmd),
    }
}

// ---------------------------------------------------------------------------
// compare
// ---------------------------------------------------------------------------

fn load_reference(args: &CompareArgs) -> Result<Spectrum> {
    if args.ref_rate {
        let table = load_rate_table(&args.reference)?;
        let params = BroadeningParams {
            delta: args.delta,
            eps: args.rate_eps,
            kappa: args.kappa,
            smooth: true,
        };
        let broadened = broaden(&table, &params)?;
        let intensity = peak_normalize(&broadened.intensity);
        return Ok(Spectrum::new(broadened.energy, intensity)?.sorted());
    }
    let options = LoadOptions {
        columns: args.cols1,
        trim_zeros: !args.no_trim,
        row: args.row1,
    };
    load_spectrum(&args.reference, &options)
}

fn run_compare(args: &CompareArgs) -> Result<()> {
    let reference = load_reference(args)?;
    let candidate = load_spectrum(
        &args.candidate,
        &LoadOptions {
            columns: args.cols2,
            trim_zeros: !args.no_trim,
            row: args.row2,
        },
    )?;

    let params = CompareParams {
        eps: args.eps,
        norm: args.norm,
    };
    let comparison = compare(&reference, &candidate, &params)?;

    let mut files = OutputFiles::new();
    files.aligned(&args.out, &comparison.aligned)?;
    if let Some(path) = &args.report {
        files.report_json(path, &comparison.report)?;
    }
    files.commit()?;

    println!("{}", output::format_report(&comparison.report));
    println!("Saved aligned spectra -> {}", args.out.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// broaden
// ---------------------------------------------------------------------------

fn run_broaden(args: &BroadenArgs) -> Result<()> {
    let table = load_rate_table(&args.rate_table)?;
    let params = BroadeningParams {
        delta: args.delta,
        eps: args.eps,
        kappa: args.kappa,
        smooth: !args.no_smooth,
    };
    let mut spectrum = broaden(&table, &params)?;
    if !args.no_norm {
        spectrum.intensity = peak_normalize(&spectrum.intensity);
    }

    let mut files = OutputFiles::new();
    files.spectrum(&args.out, &spectrum)?;
    files.spectrum_full(&args.full_out, &spectrum)?;
    files.commit()?;
    info!("{} points written", spectrum.len());
    println!(
        "Wrote: {}, {}",
        args.out.display(),
        args.full_out.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// labels
// ---------------------------------------------------------------------------

fn run_labels(cmd: LabelsCommand) -> Result<()> {
    match cmd {
        LabelsCommand::Extract {
            state_file,
            itrain,
            prefix,
            suffix,
            out_dir,
        } => {
            let truth = labels::load_truth(&state_file)?;
            let indices = labels::load_indices(&itrain)?;
            let rows = labels::extract_subset(&truth, &indices);
            let energies: Vec<&str> = rows.iter().map(|r| r.energy.as_str()).collect();
            let strengths: Vec<&str> = rows.iter().map(|r| r.strength.as_str()).collect();

            let e_path = out_dir.join(format!("{prefix}E{suffix}.dat"));
            let f_path = out_dir.join(format!("{prefix}f{suffix}.dat"));
            let mut files = OutputFiles::new();
            files.lines(&e_path, &energies)?;
            files.lines(&f_path, &strengths)?;
            files.commit()?;
            report_written(&[&e_path, &f_path], rows.len());
        }
        LabelsCommand::Full {
            state_file,
            itrain,
            out,
            target,
            n,
            fill,
        } => {
            let truth = labels::load_truth(&state_file)?;
            let train = labels::load_indices(&itrain)?;
            let column = labels::full_length(&truth, &train, target, n, fill)?;
            let mut files = OutputFiles::new();
            files.lines(&out, &column)?;
            files.commit()?;
            report_written(&[&out], column.len());
        }
        LabelsCommand::Mix {
            state_file,
            pred_file,
            out,
            itrain,
            n_train,
            target,
            n,
        } => {
            let truth = labels::load_truth(&state_file)?;
            let mut train = labels::load_indices(&itrain)?;
            train.truncate(n_train);
            let predictions = labels::load_predictions(&pred_file)?;
            let column = labels::mix_with_predictions(&truth, &train, &predictions, target, n);
            let mut files = OutputFiles::new();
            files.lines(&out, &column)?;
            files.commit()?;
            report_written(&[&out], column.len());
        }
    }
    Ok(())
}

/// The single stderr line for a fatal error, with its context chain.
pub fn failure_message(err: &anyhow::Error) -> String {
    format!("[ERROR] {err:#}").replace('\n', " ")
}

fn report_written(paths: &[&Path], rows: usize) {
    for path in paths {
        println!("Wrote {rows} rows -> {}", path.display());
    }
}
