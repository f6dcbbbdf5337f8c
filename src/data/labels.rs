//! Training-label bookkeeping.
//!
//! Values travel as [`RawValue`]s, the exact text token read from the input,
//! so a label file written here reproduces the source digits byte for byte.
//! Nothing in this module parses a label into a float.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use log::warn;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RawValue – verbatim text token
// ---------------------------------------------------------------------------

/// A value kept exactly as it was written in the source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawValue(String);

impl RawValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Truth table: index → (E, f)
// ---------------------------------------------------------------------------

/// Which column of the truth table a label file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Excitation energy, column 1.
    Energy,
    /// Oscillator strength, column 2.
    Strength,
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "E" | "e" => Ok(Target::Energy),
            "f" | "F" => Ok(Target::Strength),
            other => bail!("unknown label target {other:?} (expected E or f)"),
        }
    }
}

/// Placeholder written at positions without a label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fill {
    #[default]
    Nan,
    Zero,
}

impl Fill {
    pub fn token(&self) -> &'static str {
        match self {
            Fill::Nan => "nan",
            Fill::Zero => "0",
        }
    }
}

impl FromStr for Fill {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nan" => Ok(Fill::Nan),
            "0" => Ok(Fill::Zero),
            other => bail!("unknown fill {other:?} (expected nan or 0)"),
        }
    }
}

/// One row of the truth table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruthRow {
    pub energy: RawValue,
    pub strength: RawValue,
}

impl TruthRow {
    pub fn get(&self, target: Target) -> &RawValue {
        match target {
            Target::Energy => &self.energy,
            Target::Strength => &self.strength,
        }
    }
}

/// Ground-truth values keyed by their 1-based sample index.
pub type TruthTable = BTreeMap<usize, TruthRow>;

/// Parse `index E f` rows. Rows with fewer than three fields or a
/// non-integer index (headers) are skipped; later duplicates win.
pub fn parse_truth(text: &str) -> TruthTable {
    text.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return None;
            }
            let index = parts[0].parse::<usize>().ok()?;
            Some((
                index,
                TruthRow {
                    energy: RawValue::new(parts[1]),
                    strength: RawValue::new(parts[2]),
                },
            ))
        })
        .collect()
}

pub fn load_truth(path: &Path) -> Result<TruthTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading truth table {}", path.display()))?;
    Ok(parse_truth(&text))
}

/// Parse one 1-based index per line, keeping file order. Lines that are
/// not integers are skipped.
pub fn parse_indices(text: &str) -> Vec<usize> {
    text.lines()
        .filter_map(|line| line.trim().parse::<usize>().ok())
        .collect()
}

pub fn load_indices(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading index file {}", path.display()))?;
    Ok(parse_indices(&text))
}

/// Parse a prediction file: one value per non-empty line, kept verbatim.
pub fn parse_predictions(text: &str) -> Vec<RawValue> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(RawValue::new)
        .collect()
}

pub fn load_predictions(path: &Path) -> Result<Vec<RawValue>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading predictions {}", path.display()))?;
    Ok(parse_predictions(&text))
}

// ---------------------------------------------------------------------------
// Selections
// ---------------------------------------------------------------------------

/// The `(E, f)` rows of `indices` present in `truth`, in index order.
pub fn extract_subset<'a>(truth: &'a TruthTable, indices: &[usize]) -> Vec<&'a TruthRow> {
    indices.iter().filter_map(|i| truth.get(i)).collect()
}

/// A full-length label column: positions `1..=n` carry the truth value when
/// listed in `train` (or `nan` if the truth table lacks it), `fill` otherwise.
///
/// `n` defaults to the largest index seen in `train` or `truth`.
pub fn full_length(
    truth: &TruthTable,
    train: &[usize],
    target: Target,
    n: Option<usize>,
    fill: Fill,
) -> Result<Vec<String>> {
    let train: BTreeSet<usize> = train.iter().copied().collect();
    let Some(&max_train) = train.last() else {
        bail!("training index set is empty");
    };
    let max_truth = truth.keys().next_back().copied().unwrap_or(0);
    let n = n.unwrap_or(max_train.max(max_truth));

    Ok((1..=n)
        .map(|i| {
            if train.contains(&i) {
                truth
                    .get(&i)
                    .map_or_else(|| Fill::Nan.token().to_string(), |row| row.get(target).to_string())
            } else {
                fill.token().to_string()
            }
        })
        .collect())
}

/// Merge truth values into model predictions: positions `1..=n` listed in
/// `train` and present in `truth` carry the truth value, all others the
/// prediction for that position.
///
/// `n` defaults to the number of predictions; a larger `n` is clamped.
pub fn mix_with_predictions(
    truth: &TruthTable,
    train: &[usize],
    predictions: &[RawValue],
    target: Target,
    n: Option<usize>,
) -> Vec<String> {
    let train: BTreeSet<usize> = train.iter().copied().collect();
    let mut n = n.unwrap_or(predictions.len());
    if n != predictions.len() {
        warn!(
            "{} predictions but N = {n}; writing the smaller",
            predictions.len()
        );
        n = n.min(predictions.len());
    }

    predictions[..n]
        .iter()
        .enumerate()
        .map(|(pos, pred)| {
            let i = pos + 1;
            match truth.get(&i) {
                Some(row) if train.contains(&i) => row.get(target).to_string(),
                _ => pred.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRUTH: &str = "index E f\n1 3.1415000 0.0100\n2 2.7100 1e-3\n4 1.00000 0.5\n";

    #[test]
    fn truth_values_stay_verbatim() {
        let truth = parse_truth(TRUTH);
        assert_eq!(truth.len(), 3);
        assert_eq!(truth[&1].energy.as_str(), "3.1415000");
        assert_eq!(truth[&2].get(Target::Strength).as_str(), "1e-3");
    }

    #[test]
    fn indices_keep_order_and_skip_junk() {
        assert_eq!(parse_indices("4\n\n1\nx\n2\n"), vec![4, 1, 2]);
    }

    #[test]
    fn subset_follows_index_order() {
        let truth = parse_truth(TRUTH);
        let rows = extract_subset(&truth, &[4, 3, 1]);
        let energies: Vec<&str> = rows.iter().map(|r| r.energy.as_str()).collect();
        assert_eq!(energies, vec!["1.00000", "3.1415000"]);
    }

    #[test]
    fn full_length_fills_gaps() {
        let truth = parse_truth(TRUTH);
        let col = full_length(&truth, &[1, 3], Target::Energy, None, Fill::Zero).unwrap();
        assert_eq!(col, vec!["3.1415000", "0", "nan", "0"]);

        let col = full_length(&truth, &[2], Target::Strength, Some(2), Fill::Nan).unwrap();
        assert_eq!(col, vec!["nan", "1e-3"]);
    }

    #[test]
    fn full_length_needs_training_indices() {
        assert!(full_length(&TruthTable::new(), &[], Target::Energy, None, Fill::Nan).is_err());
    }

    #[test]
    fn mix_prefers_truth_on_training_positions() {
        let truth = parse_truth(TRUTH);
        let preds = parse_predictions("9.0\n9.1\n9.2\n9.3\n");
        let mixed = mix_with_predictions(&truth, &[1, 3, 4], &preds, Target::Energy, None);
        // 3 is a training index without truth: falls back to the prediction
        assert_eq!(mixed, vec!["3.1415000", "9.1", "9.2", "1.00000"]);
    }

    #[test]
    fn mix_clamps_to_prediction_count() {
        let truth = parse_truth(TRUTH);
        let preds = parse_predictions("9.0\n9.1\n");
        let mixed = mix_with_predictions(&truth, &[2], &preds, Target::Strength, Some(5));
        assert_eq!(mixed, vec!["9.0", "1e-3"]);
    }

    #[test]
    fn target_and_fill_parse() {
        assert_eq!("E".parse::<Target>().unwrap(), Target::Energy);
        assert_eq!("f".parse::<Target>().unwrap(), Target::Strength);
        assert!("x".parse::<Target>().is_err());
        assert_eq!("0".parse::<Fill>().unwrap(), Fill::Zero);
    }
}
