use anyhow::{Context, Result};
use slicer_fiducials::{FiducialSet, FiducialTable, Format, LegacyRow};

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

/// Rough RAS positions (mm) of a few brain landmarks.
const LANDMARKS: [(&str, [f64; 3]); 8] = [
    ("AC", [0.0, 1.5, -2.0]),
    ("PC", [0.0, -25.0, -1.0]),
    ("LE", [31.0, 64.0, -14.0]),
    ("RE", [-32.0, 64.0, -13.0]),
    ("VN4", [0.0, -40.0, -30.0]),
    ("genu", [0.0, 28.0, 5.0]),
    ("rostrum", [0.0, 20.0, -8.0]),
    ("dens_axis", [0.0, -10.0, -70.0]),
];

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = SimpleRng::new(42);

    let rows: Vec<LegacyRow> = LANDMARKS
        .iter()
        .map(|&(label, [x, y, z])| LegacyRow {
            label: label.to_string(),
            x: rng.gauss(x, 1.0),
            y: rng.gauss(y, 1.0),
            z: rng.gauss(z, 1.0),
            sel: 1,
            vis: 1,
        })
        .collect();

    let set = FiducialSet::from_table(FiducialTable::Legacy(rows))
        .context("building sample fiducials")?;

    let legacy_path = "sample_legacy.fcsv";
    let markups_path = "sample_markups.fcsv";
    set.write(legacy_path, Some(Format::Legacy))
        .with_context(|| format!("writing {legacy_path}"))?;
    set.write(markups_path, Some(Format::Extended))
        .with_context(|| format!("writing {markups_path}"))?;

    println!(
        "Wrote {} landmarks to {legacy_path} and {markups_path}",
        set.len()
    );
    Ok(())
}
