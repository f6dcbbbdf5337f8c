use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::DataType;
use log::{debug, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::{Line, RateTable, Spectrum};
use crate::error::SpectrumError;

// ---------------------------------------------------------------------------
// Column schema and load options
// ---------------------------------------------------------------------------

/// Which whitespace-separated columns hold energy and intensity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSchema {
    /// Guess per row from its width: three or more numbers → `(0, 2)`
    /// (the `E lambda I err` layout), otherwise `(0, 1)`.
    #[default]
    Auto,
    Explicit { energy: usize, intensity: usize },
}

impl ColumnSchema {
    /// Resolve to `(energy, intensity)` indices for a row of `width` numbers.
    pub fn resolve(&self, width: usize) -> (usize, usize) {
        match *self {
            ColumnSchema::Auto if width >= 3 => (0, 2),
            ColumnSchema::Auto => (0, 1),
            ColumnSchema::Explicit { energy, intensity } => (energy, intensity),
        }
    }
}

impl FromStr for ColumnSchema {
    type Err = SpectrumError;

    /// `"auto"` or `"energy,intensity"`, e.g. `"0,2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ColumnSchema::Auto);
        }
        let invalid = || SpectrumError::InvalidColumns(s.to_string());
        let (e, i) = s.split_once(',').ok_or_else(invalid)?;
        Ok(ColumnSchema::Explicit {
            energy: e.trim().parse().map_err(|_| invalid())?,
            intensity: i.trim().parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSchema::Auto => f.write_str("auto"),
            ColumnSchema::Explicit { energy, intensity } => write!(f, "{energy},{intensity}"),
        }
    }
}

/// How a spectrum file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub columns: ColumnSchema,
    /// Drop leading/trailing zero-intensity samples.
    pub trim_zeros: bool,
    /// Row to take from multi-spectrum datasets (.json / .csv / .parquet).
    pub row: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            columns: ColumnSchema::Auto,
            trim_zeros: true,
            row: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a spectrum from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – dataset with `x` and `y` list columns, one spectrum per row
/// * `.json`    – `[{ "x": [...], "y": [...], ...meta }, ...]`
/// * `.csv`     – columns `x` and `y` containing semicolon-separated floats
/// * anything else – whitespace-separated text columns
///
/// The result is sorted by energy and, if requested, zero-trimmed.
pub fn load_spectrum(path: &Path, options: &LoadOptions) -> Result<Spectrum> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let spectrum = match ext.as_str() {
        "parquet" | "pq" => select_row(load_parquet(path)?, options.row, path)?,
        "json" => select_row(load_json(path)?, options.row, path)?,
        "csv" => select_row(load_csv(path)?, options.row, path)?,
        _ => load_text_spectrum(path, options.columns)?,
    };
    if spectrum.is_empty() {
        return Err(SpectrumError::ParseFailure { path: path.to_path_buf() }.into());
    }

    let spectrum = spectrum.sorted();
    let spectrum = if options.trim_zeros {
        spectrum.trim_zeros()
    } else {
        spectrum
    };
    debug!("loaded {} samples from {}", spectrum.len(), path.display());
    Ok(spectrum)
}

/// Load a rate table: energy in field 0, weight in field 2.
pub fn load_rate_table(path: &Path) -> Result<RateTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading rate table {}", path.display()))?;
    let table = parse_rate_table(&text);
    if table.is_empty() {
        return Err(SpectrumError::ParseFailure { path: path.to_path_buf() }.into());
    }
    debug!("loaded {} lines from {}", table.len(), path.display());
    Ok(table)
}

fn select_row(mut spectra: Vec<Spectrum>, row: usize, path: &Path) -> Result<Spectrum> {
    if row >= spectra.len() {
        bail!(
            "{}: row {row} requested but the dataset holds {} spectra",
            path.display(),
            spectra.len()
        );
    }
    Ok(spectra.swap_remove(row))
}

// ---------------------------------------------------------------------------
// Text loaders
// ---------------------------------------------------------------------------

fn load_text_spectrum(path: &Path, columns: ColumnSchema) -> Result<Spectrum> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading spectrum {}", path.display()))?;
    Ok(parse_spectrum_text(&text, columns))
}

/// A finite number; `nan`, `inf` and friends count as text.
fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_numbers(line: &str) -> Option<Vec<f64>> {
    line.split_whitespace().map(parse_number).collect()
}

/// Parse column text into a spectrum, in file order.
///
/// Lines holding any non-numeric token are headers and are skipped, as are
/// rows with fewer than two numbers or without the selected columns.
pub fn parse_spectrum_text(text: &str, columns: ColumnSchema) -> Spectrum {
    let mut energy = Vec::new();
    let mut intensity = Vec::new();
    let mut skipped = 0usize;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(nums) = parse_numbers(trimmed) else {
            skipped += 1;
            continue;
        };
        if nums.len() < 2 {
            skipped += 1;
            continue;
        }
        let (e_col, i_col) = columns.resolve(nums.len());
        match (nums.get(e_col), nums.get(i_col)) {
            (Some(&e), Some(&i)) => {
                energy.push(e);
                intensity.push(i);
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!("skipped {skipped} header or short rows");
    }
    Spectrum { energy, intensity }
}

/// Parse rate-table text. Rows need at least three fields with numeric
/// field 0 and field 2; anything else (such as a header) is skipped.
pub fn parse_rate_table(text: &str) -> RateTable {
    let lines = text
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return None;
            }
            let energy = parse_number(parts[0])?;
            let weight = parse_number(parts[2])?;
            Some(Line { energy, weight })
        })
        .collect();
    RateTable::new(lines)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "x": [1.80, 1.81, ...], "y": [0.12, 0.14, ...], "label": "TD" },
///   ...
/// ]
/// ```
///
/// Keys other than `x` and `y` are ignored.
fn load_json(path: &Path) -> Result<Vec<Spectrum>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut spectra = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let x = json_array_to_f64(obj.get("x"), i, "x")?;
        let y = json_array_to_f64(obj.get("y"), i, "y")?;

        spectra.push(Spectrum::new(x, y).with_context(|| format!("JSON record {i}"))?);
    }

    Ok(spectra)
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
/// `x` and `y` columns contain semicolon-separated floats:
///   `"1.80;1.81;1.82"`, `"0.12;0.14;0.11"`
/// Other columns are ignored.
fn load_csv(path: &Path) -> Result<Vec<Spectrum>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?;

    let x_idx = headers
        .iter()
        .position(|h| h == "x")
        .context("CSV missing 'x' column")?;
    let y_idx = headers
        .iter()
        .position(|h| h == "y")
        .context("CSV missing 'y' column")?;

    let mut spectra = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let x = parse_semicolon_floats(record.get(x_idx).unwrap_or(""), row_no, "x")?;
        let y = parse_semicolon_floats(record.get(y_idx).unwrap_or(""), row_no, "y")?;

        spectra.push(Spectrum::new(x, y).with_context(|| format!("CSV record {row_no}"))?);
    }

    Ok(spectra)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing spectra.
///
/// Expected schema:
/// - `x`: List<Float64> or LargeList<Float64> – energy arrays
/// - `y`: List<Float64> or LargeList<Float64> – intensity arrays
///
/// Other columns are ignored.
fn load_parquet(path: &Path) -> Result<Vec<Spectrum>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut spectra = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let x_idx = schema
            .index_of("x")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'x' column"))?;
        let y_idx = schema
            .index_of("y")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'y' column"))?;

        let x_col = batch.column(x_idx);
        let y_col = batch.column(y_idx);

        for row in 0..batch.num_rows() {
            let x = extract_f64_list(x_col, row)
                .with_context(|| format!("Row {row}: failed to read 'x'"))?;
            let y = extract_f64_list(y_col, row)
                .with_context(|| format!("Row {row}: failed to read 'y'"))?;

            spectra.push(Spectrum::new(x, y).with_context(|| format!("Parquet record {row}"))?);
        }
    }

    Ok(spectra)
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // Null entries become NaN; they cannot be interpolated meaningfully.
    let values: Vec<f64> =
        if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
            f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
        } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
            f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect()
        } else {
            bail!(
                "List inner type is {:?}, expected Float64 or Float32",
                values_array.data_type()
            )
        };
    if values.iter().any(|v| v.is_nan()) {
        warn!("row {row}: list column contains null or NaN entries");
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn auto_columns_follow_row_width() {
        assert_eq!(ColumnSchema::Auto.resolve(2), (0, 1));
        assert_eq!(ColumnSchema::Auto.resolve(4), (0, 2));
        let explicit = ColumnSchema::Explicit { energy: 1, intensity: 3 };
        assert_eq!(explicit.resolve(2), (1, 3));
    }

    #[test]
    fn parses_column_strings() {
        assert_eq!("auto".parse::<ColumnSchema>().unwrap(), ColumnSchema::Auto);
        assert_eq!(
            " 0, 2 ".parse::<ColumnSchema>().unwrap(),
            ColumnSchema::Explicit { energy: 0, intensity: 2 }
        );
        assert!("0;2".parse::<ColumnSchema>().is_err());
        assert!("a,b".parse::<ColumnSchema>().is_err());
        assert_eq!(ColumnSchema::Explicit { energy: 0, intensity: 2 }.to_string(), "0,2");
    }

    #[test]
    fn four_column_text_uses_third_column() {
        let text = "DE/eV    lambda/nm    intensity    +/-error\n\
                    2.0000   6.1992E+02   5.0E-01   0.00000\n\
                    1.5000   8.2656E+02   1.0E+00   0.00000\n";
        let sp = parse_spectrum_text(text, ColumnSchema::Auto);
        assert_eq!(sp.energy, vec![2.0, 1.5]);
        assert_eq!(sp.intensity, vec![0.5, 1.0]);
    }

    #[test]
    fn skips_short_rows_and_missing_columns() {
        let text = "# energy intensity\n\n1.0 2.0\n3.0\n4.0 5.0\n";
        let sp = parse_spectrum_text(text, ColumnSchema::Auto);
        assert_eq!(sp.energy, vec![1.0, 4.0]);

        let wide = ColumnSchema::Explicit { energy: 0, intensity: 2 };
        let sp = parse_spectrum_text("1 2\n1 2 3\n", wide);
        assert_eq!((sp.energy, sp.intensity), (vec![1.0], vec![3.0]));
    }

    #[test]
    fn non_finite_tokens_are_not_data() {
        let sp = parse_spectrum_text("1.0 0.5\n1.5 nan\n2.0 0.5\n2.5 inf\n3.0 -Infinity\n", ColumnSchema::Auto);
        assert_eq!(sp.energy, vec![1.0, 2.0]);
        assert!(sp.intensity.iter().all(|v| v.is_finite()));

        let table = parse_rate_table("1.0 1239.8 NaN\n2.0 619.9 0.6\ninf 0.0 1.0\n");
        assert_eq!(table.lines, vec![Line { energy: 2.0, weight: 0.6 }]);
    }

    #[test]
    fn load_sorts_and_trims() {
        let file = write_temp(".dat", "E I\n3.0 0.0\n1.0 0.0\n2.0 0.5\n2.5 1.0\n0.5 0.0\n");
        let sp = load_spectrum(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(sp.energy, vec![2.0, 2.5]);
        assert_eq!(sp.intensity, vec![0.5, 1.0]);

        let keep = LoadOptions { trim_zeros: false, ..Default::default() };
        let sp = load_spectrum(file.path(), &keep).unwrap();
        assert_eq!(sp.energy, vec![0.5, 1.0, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn headers_only_is_a_parse_failure() {
        let file = write_temp(".dat", "energy intensity\nfoo bar\n");
        let err = load_spectrum(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpectrumError>(),
            Some(SpectrumError::ParseFailure { .. })
        ));
    }

    #[test]
    fn rate_table_reads_fields_zero_and_two() {
        let file = write_temp(
            ".dat",
            "DE/eV  lambda/nm  diff_rate\n2.10 590.4 1.5e3\n1.95 635.8 7.0e2\nbad row\n",
        );
        let table = load_rate_table(file.path()).unwrap();
        assert_eq!(
            table.lines,
            vec![
                Line { energy: 2.10, weight: 1.5e3 },
                Line { energy: 1.95, weight: 7.0e2 },
            ]
        );
    }

    #[test]
    fn empty_rate_table_is_a_parse_failure() {
        let file = write_temp(".dat", "DE/eV lambda/nm diff_rate\n");
        let err = load_rate_table(file.path()).unwrap_err();
        assert!(err.downcast_ref::<SpectrumError>().is_some());
    }

    #[test]
    fn json_dataset_row_selection() {
        let file = write_temp(
            ".json",
            r#"[{"x": [1.0, 2.0], "y": [0.1, 0.2], "label": "a"},
                {"x": [3.0, 1.0, 2.0], "y": [0.3, 0.1, 0.2]}]"#,
        );
        let opts = LoadOptions { row: 1, trim_zeros: false, ..Default::default() };
        let sp = load_spectrum(file.path(), &opts).unwrap();
        assert_eq!(sp.energy, vec![1.0, 2.0, 3.0]);
        assert_eq!(sp.intensity, vec![0.1, 0.2, 0.3]);

        let out_of_range = LoadOptions { row: 2, ..Default::default() };
        assert!(load_spectrum(file.path(), &out_of_range).is_err());
    }

    #[test]
    fn csv_dataset_semicolon_lists() {
        let file = write_temp(".csv", "id,x,y\n7,\"1.0;1.5;2.0\",\"0.0;1.0;0.5\"\n");
        let sp = load_spectrum(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(sp.energy, vec![1.5, 2.0]);
        assert_eq!(sp.intensity, vec![1.0, 0.5]);
    }

    #[test]
    fn csv_length_mismatch_is_an_error() {
        let file = write_temp(".csv", "x,y\n\"1.0;2.0\",\"0.5\"\n");
        let err = load_spectrum(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpectrumError>(),
            Some(SpectrumError::LengthMismatch { left: 2, right: 1 })
        ));

        let file = write_temp(".json", r#"[{"x": [1.0], "y": [0.5, 0.6]}]"#);
        let err = load_spectrum(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(format!("{err:#}").starts_with("JSON record 0"));
    }
}
