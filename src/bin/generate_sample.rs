use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use emission_disparity::output::{ev_to_nm, fmt_sci, save_spectrum};
use emission_disparity::Spectrum;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn generate_spectrum(
    energies: &[f64],
    bands: &[(f64, f64, f64)],
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    energies
        .iter()
        .map(|&e| {
            let signal: f64 = bands
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(e, mu, sigma, amp))
                .sum();
            (signal + rng.gauss(0.0, noise_level)).max(0.0)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Transition lines scattered around a few band centers.
fn write_rate_table(path: &str, rng: &mut SimpleRng) -> Result<usize> {
    let centers = [(1.85, 0.04, 40), (2.05, 0.03, 60), (2.40, 0.05, 25)];
    let mut file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    writeln!(file, "DE/eV    lambda/nm    diff_rate")?;

    let mut rows = 0;
    for &(center, spread, count) in &centers {
        for _ in 0..count {
            let e = rng.gauss(center, spread);
            let rate = 1e3 * (1.0 + rng.next_f64());
            writeln!(file, "{e:.6}   {:.4}   {}", ev_to_nm(e), fmt_sci(rate, 6))?;
            rows += 1;
        }
    }
    Ok(rows)
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let rate_rows = write_rate_table("sample_rates.dat", &mut rng)?;

    // Energies: 1.50 → 2.80 eV, step 0.005
    let energies: Vec<f64> = (0..=260).map(|i| 1.5 + i as f64 * 0.005).collect();

    let reference_bands = [(1.85, 0.06, 0.6), (2.05, 0.05, 1.0), (2.40, 0.07, 0.35)];
    let candidate_bands = [(1.87, 0.07, 0.55), (2.06, 0.05, 1.0), (2.38, 0.06, 0.4)];

    let reference = generate_spectrum(&energies, &reference_bands, 0.002, &mut rng);
    let candidate = generate_spectrum(&energies, &candidate_bands, 0.01, &mut rng);

    save_spectrum(
        Path::new("sample_reference_eV.dat"),
        &Spectrum::new(energies.clone(), reference.clone())?,
    )?;
    save_spectrum(
        Path::new("sample_candidate_eV.dat"),
        &Spectrum::new(energies.clone(), candidate.clone())?,
    )?;

    // Same two spectra as a Parquet dataset, one row each.
    let rows = [("reference", &reference), ("candidate", &candidate)];

    let mut x_builder = ListBuilder::new(Float64Builder::new());
    let mut y_builder = ListBuilder::new(Float64Builder::new());
    for (_, intensity) in &rows {
        x_builder.values().append_slice(&energies);
        x_builder.append(true);
        y_builder.values().append_slice(intensity);
        y_builder.append(true);
    }
    let x_array = x_builder.finish();
    let y_array = y_builder.finish();
    let label_array = StringArray::from(rows.iter().map(|(name, _)| *name).collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::List(Arc::new(Field::new("item", DataType::Float64, true))), false),
        Field::new("y", DataType::List(Arc::new(Field::new("item", DataType::Float64, true))), false),
        Field::new("label", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(x_array), Arc::new(y_array), Arc::new(label_array)],
    )
    .context("building record batch")?;

    let output_path = "sample_spectra.parquet";
    let file = std::fs::File::create(output_path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    println!(
        "Wrote {rate_rows} lines to sample_rates.dat, {} samples to \
         sample_reference_eV.dat / sample_candidate_eV.dat, 2 spectra to {output_path}",
        energies.len()
    );
    Ok(())
}
