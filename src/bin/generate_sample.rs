//! Generate a synthetic survey CSV and a matching model artifact so the
//! explorer can be exercised without the published dataset.
//!
//! Writes `data/survey_lung_cancer.csv` and `models/lung_model.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use lungscope::predict::artifact::{Classes, FeatureEncoding, FeatureSpec};
use lungscope::{ModelArtifact, Prediction, Schema};

const ROWS: usize = 300;

const FLAG_COLUMNS: [(&str, f64); 13] = [
    ("SMOKING", 0.55),
    ("YELLOW_FINGERS", 0.55),
    ("ANXIETY", 0.50),
    ("PEER_PRESSURE", 0.50),
    ("CHRONIC_DISEASE", 0.50),
    ("FATIGUE", 0.65),
    ("ALLERGY", 0.55),
    ("WHEEZING", 0.55),
    ("ALCOHOL_CONSUMING", 0.55),
    ("COUGHING", 0.60),
    ("SHORTNESS_OF_BREATH", 0.65),
    ("SWALLOWING_DIFFICULTY", 0.45),
    ("CHEST_PAIN", 0.55),
];

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

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform integer in `lo..=hi`.
    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_f64() * (hi - lo + 1) as f64) as i64
    }
}

fn artifact() -> ModelArtifact {
    ModelArtifact {
        version: "synthetic-lr1".into(),
        classes: Classes {
            negative: "NO".into(),
            positive: "YES".into(),
        },
        intercept: -1.2,
        features: vec![
            FeatureSpec {
                field: "AGE".into(),
                weight: 0.45,
                encoding: FeatureEncoding::Numeric {
                    center: 62.0,
                    scale: 8.0,
                },
            },
            FeatureSpec {
                field: "GENDER".into(),
                weight: 0.15,
                encoding: FeatureEncoding::Levels {
                    levels: BTreeMap::from([("M".to_string(), 1.0), ("F".to_string(), 0.0)]),
                },
            },
            FeatureSpec {
                field: "SMOKING".into(),
                weight: 1.1,
                encoding: FeatureEncoding::Binary,
            },
            FeatureSpec {
                field: "COUGHING".into(),
                weight: 0.7,
                encoding: FeatureEncoding::Binary,
            },
            FeatureSpec {
                field: "WHEEZING".into(),
                weight: 0.6,
                encoding: FeatureEncoding::Binary,
            },
            FeatureSpec {
                field: "CHEST_PAIN".into(),
                weight: 0.5,
                encoding: FeatureEncoding::Binary,
            },
        ],
    }
}

/// One synthetic survey row in raw CSV encoding (flags as 1/2).
fn generate_row(rng: &mut SimpleRng, schema: &Schema, model: &ModelArtifact) -> Result<Vec<String>> {
    let gender = if rng.chance(0.5) { "M" } else { "F" };
    let age = rng.range(30, 85);
    let flags: Vec<&str> = FLAG_COLUMNS
        .iter()
        .map(|&(_, p)| if rng.chance(p) { "2" } else { "1" })
        .collect();

    // Label the row with the same model the artifact ships, plus noise, so
    // the generated data and the artifact agree on the signal. The label is
    // not a model input, so a placeholder satisfies the validator.
    let mut raw: BTreeMap<String, String> = BTreeMap::new();
    raw.insert("GENDER".into(), gender.into());
    raw.insert("AGE".into(), age.to_string());
    for (&(name, _), &flag) in FLAG_COLUMNS.iter().zip(&flags) {
        raw.insert(name.into(), flag.into());
    }
    raw.insert("LUNG_CANCER".into(), "NO".into());

    let record = schema.validate(&raw, 0).context("synthetic row invalid")?;
    let Prediction { probability, label } = model.score(&record).context("scoring synthetic row")?;
    let noisy_yes = match label.as_str() {
        "YES" => rng.chance(probability.min(0.95)),
        _ => rng.chance(1.0 - probability.min(0.95)),
    };

    let mut row = vec![gender.to_string(), age.to_string()];
    row.extend(flags.iter().map(|f| f.to_string()));
    row.push(if noisy_yes { "YES" } else { "NO" }.to_string());
    Ok(row)
}

fn main() -> Result<()> {
    env_logger::init();

    let model = artifact();
    let schema = Schema::lung_cancer_survey();
    let mut rng = SimpleRng::new(42);

    fs::create_dir_all("data").context("creating data/")?;
    fs::create_dir_all("models").context("creating models/")?;

    let csv_path = Path::new("data/survey_lung_cancer.csv");
    let mut writer = csv::Writer::from_path(csv_path).context("opening output CSV")?;
    let mut header = vec!["GENDER", "AGE"];
    header.extend(FLAG_COLUMNS.iter().map(|&(name, _)| name));
    header.push("LUNG_CANCER");
    writer.write_record(&header)?;
    for _ in 0..ROWS {
        writer.write_record(generate_row(&mut rng, &schema, &model)?)?;
    }
    writer.flush()?;
    log::info!("wrote {ROWS} rows to {}", csv_path.display());

    let model_path = Path::new("models/lung_model.json");
    let json = serde_json::to_string_pretty(&model).context("serializing artifact")?;
    fs::write(model_path, json).context("writing artifact")?;
    log::info!("wrote model artifact to {}", model_path.display());

    Ok(())
}
