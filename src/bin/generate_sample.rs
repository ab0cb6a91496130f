//! Writes `sample_data.csv`, a small deterministic dataset for trying the
//! explorer: categorical and numeric columns, a few missing cells, and a
//! per-category signal in `score` that clustering can find.

use anyhow::{Context, Result};

use tablescope::data::loader;
use tablescope::{CellValue, Column, Dataset};

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

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let categories = ["A", "B", "C"];
    // Cluster-friendly: each category sits at its own score level.
    let score_levels = [20.0, 50.0, 80.0];
    let cities = ["Taipei", "Kaohsiung", "Taichung", "Tainan"];
    let rows = 36;

    let mut id = Vec::with_capacity(rows);
    let mut name = Vec::with_capacity(rows);
    let mut category = Vec::with_capacity(rows);
    let mut city = Vec::with_capacity(rows);
    let mut value = Vec::with_capacity(rows);
    let mut score = Vec::with_capacity(rows);

    for i in 0..rows {
        let cat = i % categories.len();

        id.push(CellValue::Number((i + 1) as f64));
        name.push(CellValue::Text(format!("user_{:02}", i + 1)));
        category.push(CellValue::Text(categories[cat].to_string()));

        // A couple of gaps so missing-value handling has something to chew on.
        city.push(if i % 11 == 7 {
            CellValue::Missing
        } else {
            CellValue::Text(cities[i % cities.len()].to_string())
        });
        value.push(CellValue::Number(
            ((10.0 + i as f64 * 0.75 + rng.gauss(0.0, 1.5)) * 100.0).round() / 100.0,
        ));
        score.push(if i % 9 == 4 {
            CellValue::Missing
        } else {
            CellValue::Number(
                ((score_levels[cat] + rng.gauss(0.0, 4.0)) * 100.0).round() / 100.0,
            )
        });
    }

    let dataset = Dataset::from_columns(vec![
        Column::new("id", id),
        Column::new("name", name),
        Column::new("category", category),
        Column::new("city", city),
        Column::new("value", value),
        Column::new("score", score),
    ])?;

    let output_path = "sample_data.csv";
    let bytes = loader::serialize(&dataset)?;
    std::fs::write(output_path, bytes)
        .with_context(|| format!("writing {output_path}"))?;

    println!(
        "Wrote {} rows x {} columns to {output_path}",
        dataset.row_count(),
        dataset.column_count()
    );
    Ok(())
}
