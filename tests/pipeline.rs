use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use clap::Parser;
use emission_disparity::cli::{self, Cli};
use emission_disparity::data::loader::{load_rate_table, load_spectrum, LoadOptions};
use emission_disparity::spectral::broaden::broaden;
use emission_disparity::spectral::normalize::peak_normalize;
use emission_disparity::{compare, BroadeningParams, CompareParams, NormMode, Spectrum, SpectrumError};

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn run(args: &[&str]) -> anyhow::Result<()> {
    cli::run(Cli::try_parse_from(args).unwrap())
}

#[test]
fn two_and_four_column_files_compare() {
    let dir = tempfile::tempdir().unwrap();
    let two = write(dir.path(), "ml.dat", "0.0 0.0\n1.0 2.0\n2.0 0.0\n");
    let four = write(
        dir.path(),
        "td.dat",
        "DE/eV    lambda/nm    intensity    +/-error\n\
         0.5   2.4797E+03   0.0E+00   0.00000\n\
         1.5   8.2656E+02   4.0E+00   0.00000\n\
         2.5   4.9594E+02   0.0E+00   0.00000\n",
    );

    let opts = LoadOptions { trim_zeros: false, ..Default::default() };
    let a = load_spectrum(&two, &opts).unwrap();
    let b = load_spectrum(&four, &opts).unwrap();
    assert_eq!(b.intensity, vec![0.0, 4.0, 0.0]);

    let params = CompareParams { eps: Some(0.1), norm: NormMode::Max };
    let cmp = compare(&a, &b, &params).unwrap();
    assert_relative_eq!(cmp.report.peak_shift, 0.5, epsilon = 1e-9);
    assert_relative_eq!(cmp.report.cosine, 0.75, epsilon = 1e-9);
    assert_relative_eq!(cmp.report.e_left, 0.5);
    assert_relative_eq!(cmp.report.e_right, 2.0, epsilon = 1e-9);
}

#[test]
fn disjoint_files_fail_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.dat", "0.0 1.0\n1.0 1.0\n");
    let b = write(dir.path(), "b.dat", "2.0 1.0\n3.0 1.0\n");
    let out = dir.path().join("aligned.dat");

    let err = run(&[
        "emission-disparity",
        "compare",
        a.to_str().unwrap(),
        b.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ])
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SpectrumError>(),
        Some(SpectrumError::NoOverlap { .. })
    ));
    assert!(!out.exists());
}

#[test]
fn compare_command_writes_aligned_table_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.dat", "1.0 0.5\n1.5 1.0\n2.0 0.5\n");
    let b = write(dir.path(), "b.dat", "1.0 0.25\n1.5 0.5\n2.0 0.25\n");
    let out = dir.path().join("aligned.dat");
    let report = dir.path().join("report.json");

    run(&[
        "emission-disparity",
        "compare",
        a.to_str().unwrap(),
        b.to_str().unwrap(),
        "--eps",
        "0.5",
        "--out",
        out.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
    ])
    .unwrap();

    let table = fs::read_to_string(&out).unwrap();
    assert_eq!(
        table,
        "1.000000 5.00000000e-01 5.00000000e-01 0.00000000e+00\n\
         1.500000 1.00000000e+00 1.00000000e+00 0.00000000e+00\n\
         2.000000 5.00000000e-01 5.00000000e-01 0.00000000e+00\n"
    );

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["L1_norm_area"], 0.0);
    assert_eq!(json["Overlap"], 1.0);
    assert_eq!(json["Step"], 0.5);
}

#[test]
fn unknown_norm_mode_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.dat", "1.0 0.5\n2.0 1.0\n");
    let parsed = Cli::try_parse_from([
        "emission-disparity",
        "compare",
        a.to_str().unwrap(),
        a.to_str().unwrap(),
        "--norm",
        "l2",
    ]);
    assert!(parsed.is_err());
}

#[test]
fn broadened_rate_table_against_itself() {
    let dir = tempfile::tempdir().unwrap();
    let rates = write(
        dir.path(),
        "emission-rate.dat",
        "DE/eV  lambda/nm  diff_rate\n1.0 1239.8 1.0\n2.0 619.9 0.6\n",
    );
    let table = load_rate_table(&rates).unwrap();
    let params = BroadeningParams { delta: 0.1, eps: 0.01, kappa: 3.0, smooth: true };
    let broadened = broaden(&table, &params).unwrap();

    let expected_peak = 0.5 / (0.1 * (std::f64::consts::PI / 2.0).sqrt());
    let max = broadened.intensity.iter().copied().fold(f64::MIN, f64::max);
    assert_relative_eq!(max, expected_peak, max_relative = 1e-6);

    let normalized = Spectrum::new(broadened.energy.clone(), peak_normalize(&broadened.intensity)).unwrap();
    let cmp = compare(&normalized, &broadened, &CompareParams::default()).unwrap();
    assert_relative_eq!(cmp.report.cosine, 1.0, epsilon = 1e-12);
    assert_eq!(cmp.report.peak_shift, 0.0);
}

#[test]
fn broaden_command_writes_both_tables() {
    let dir = tempfile::tempdir().unwrap();
    let rates = write(dir.path(), "rates.dat", "DE/eV lambda/nm diff_rate\n2.0 619.9 3.0\n");
    let out = dir.path().join("eV.dat");
    let full = dir.path().join("full.dat");

    run(&[
        "emission-disparity",
        "broaden",
        rates.to_str().unwrap(),
        "--delta",
        "0.1",
        "--eps",
        "0.05",
        "--kappa",
        "2",
        "--out",
        out.to_str().unwrap(),
        "--full-out",
        full.to_str().unwrap(),
    ])
    .unwrap();

    let spectrum = load_spectrum(&out, &LoadOptions { trim_zeros: false, ..Default::default() }).unwrap();
    // [1.8, 2.2] at 0.05
    assert_eq!(spectrum.len(), 9);
    let max = spectrum.intensity.iter().copied().fold(f64::MIN, f64::max);
    assert_relative_eq!(max, 1.0, epsilon = 1e-9);

    let full_text = fs::read_to_string(&full).unwrap();
    assert!(full_text.starts_with("DE/eV    lambda/nm    intensity    +/-error\n"));
    assert_eq!(full_text.lines().count(), 10);
    // the four-column output reads back through the auto column guess
    let reread = load_spectrum(&full, &LoadOptions { trim_zeros: false, ..Default::default() }).unwrap();
    assert_eq!(reread.len(), 9);
}

#[test]
fn compare_against_rate_table_reference() {
    let dir = tempfile::tempdir().unwrap();
    let rates = write(dir.path(), "rates.dat", "DE/eV lambda/nm diff_rate\n2.0 619.9 1.0\n");
    let candidate: String = (0..=40)
        .map(|i| {
            let e = 1.8 + i as f64 * 0.01;
            format!("{e:.4} {:.8e}\n", (-2.0 * ((e - 2.0) / 0.06f64).powi(2)).exp())
        })
        .collect();
    let cand = write(dir.path(), "cand.dat", &candidate);
    let out = dir.path().join("aligned.dat");
    let report = dir.path().join("report.json");

    run(&[
        "emission-disparity",
        "compare",
        rates.to_str().unwrap(),
        cand.to_str().unwrap(),
        "--ref-rate",
        "--eps",
        "0.002",
        "--out",
        out.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
    ])
    .unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert!(json["Cosine"].as_f64().unwrap() > 0.999);
    assert!(json["PeakShift_eV"].as_f64().unwrap().abs() < 0.005);
}

#[test]
fn labels_commands_copy_values_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let state = write(
        dir.path(),
        "state2.index.E.f",
        "index E f\n1 3.25000 0.100\n2 2.5E0 1.0e-02\n3 4.000 0.3\n",
    );
    let itrain = write(dir.path(), "itrain.dat", "3\n1\n");
    let preds = write(dir.path(), "pred.dat", "9.1\n9.2\n9.3\n");

    run(&[
        "emission-disparity",
        "labels",
        "extract",
        state.to_str().unwrap(),
        itrain.to_str().unwrap(),
        "--suffix",
        "_train",
        "--out-dir",
        dir.path().to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(fs::read_to_string(dir.path().join("E_train.dat")).unwrap(), "4.000\n3.25000\n");
    assert_eq!(fs::read_to_string(dir.path().join("f_train.dat")).unwrap(), "0.3\n0.100\n");

    let full = dir.path().join("y.f.train.dat");
    run(&[
        "emission-disparity",
        "labels",
        "full",
        state.to_str().unwrap(),
        itrain.to_str().unwrap(),
        full.to_str().unwrap(),
        "--target",
        "f",
        "--fill",
        "0",
    ])
    .unwrap();
    assert_eq!(fs::read_to_string(&full).unwrap(), "0.100\n0\n0.3\n");

    let mixed = dir.path().join("y.E.em.dat");
    run(&[
        "emission-disparity",
        "labels",
        "mix",
        state.to_str().unwrap(),
        preds.to_str().unwrap(),
        mixed.to_str().unwrap(),
        "--itrain",
        itrain.to_str().unwrap(),
        "--n-train",
        "1",
    ])
    .unwrap();
    // only the first training index (3) counts
    assert_eq!(fs::read_to_string(&mixed).unwrap(), "9.1\n9.2\n4.000\n");
}

#[test]
fn compare_writes_nothing_when_report_cannot_be_written() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.dat", "1.0 0.5\n1.5 1.0\n2.0 0.5\n");
    let out = dir.path().join("aligned.dat");
    let report = dir.path().join("missing_dir").join("r.json");

    let result = run(&[
        "emission-disparity",
        "compare",
        a.to_str().unwrap(),
        a.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
    ]);
    assert!(result.is_err());
    assert!(!out.exists());
    assert!(!dir.path().join("aligned.dat.tmp").exists());
}

#[test]
fn broaden_writes_nothing_when_full_table_cannot_be_written() {
    let dir = tempfile::tempdir().unwrap();
    let rates = write(dir.path(), "rates.dat", "DE/eV lambda/nm diff_rate\n2.0 619.9 3.0\n");
    let out = dir.path().join("eV.dat");
    let full = dir.path().join("missing_dir").join("full.dat");

    let result = run(&[
        "emission-disparity",
        "broaden",
        rates.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--full-out",
        full.to_str().unwrap(),
    ]);
    assert!(result.is_err());
    assert!(!out.exists());
}
