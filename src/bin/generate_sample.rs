use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rusty_jeans::data::model::ClickRecord;
use rusty_jeans::predict::artifact::{LinearClassifier, ModelArtifact};
use rusty_jeans::predict::feature::{FeatureSchema, SelectionField};

#[derive(Parser, Debug)]
#[command(author, version, about = "Write a synthetic clickstream and a matching model", long_about = None)]
struct Args {
    /// Number of sessions to simulate
    #[arg(long, default_value_t = 2000)]
    sessions: usize,

    /// Output directory for clicks.csv and clicks_clf.json
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,
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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

    /// Uniform integer in `lo..=hi`.
    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_u64() % (hi - lo + 1) as u64) as i64
    }
}

const DAYS_IN_MONTH: [i64; 8] = [0, 0, 0, 0, 30, 31, 30, 31];
const MODEL_PREFIX: [&str; 4] = ["A", "B", "C", "P"];
/// Highest order class; longer sessions are folded into it.
const MAX_ORDER_CLASS: i64 = 5;

fn simulate(rng: &mut SimpleRng, sessions: usize) -> Vec<ClickRecord> {
    let mut records = Vec::new();
    for session in 1..=sessions as i64 {
        // Most traffic comes from Poland, as in the real shop.
        let country = if rng.next_f64() < 0.8 { 29 } else { rng.range(1, 47) };
        let month = rng.range(4, 7);
        let day = rng.range(1, DAYS_IN_MONTH[month as usize]);
        let clicks = rng.range(1, 8);

        for order in 1..=clicks {
            let main_category = rng.range(1, 4);
            let early = order <= 2;
            let location = if early && rng.next_f64() < 0.7 {
                rng.range(1, 3)
            } else {
                rng.range(1, 6)
            };
            let price = (rng.range(18, 82) as f64) - if early { 0.0 } else { 10.0 * rng.next_f64() };
            let price = price.max(1.0).round();
            records.push(ClickRecord {
                year: 2008,
                month,
                day,
                order,
                country,
                session_id: session,
                main_category,
                clothing_model: format!(
                    "{}{}",
                    MODEL_PREFIX[(main_category - 1) as usize],
                    rng.range(1, 55)
                ),
                colour: rng.range(1, 14),
                location,
                model_photography: if rng.next_f64() < 0.75 { 1 } else { 2 },
                price,
                price_above_average: if price > 43.0 { 1 } else { 2 },
                page: (1 + (order - 1) / 2).min(5),
            });
        }
    }
    records
}

fn feature_value(record: &ClickRecord, source: SelectionField) -> f64 {
    match source {
        SelectionField::Price => record.price,
        SelectionField::Colour => record.colour as f64,
        SelectionField::Location => record.location as f64,
        SelectionField::Category => record.main_category as f64,
        SelectionField::Photography => record.model_photography as f64,
    }
}

/// Linear discriminant with a shared unit variance in standardised space:
/// class weights are the standardised class centroids.
fn fit(records: &[ClickRecord], schema: &FeatureSchema) -> LinearClassifier {
    let sources: Vec<SelectionField> = schema.bindings().iter().map(|b| b.source).collect();
    let n_features = sources.len();
    let n_classes = MAX_ORDER_CLASS as usize;
    let n = records.len().max(1) as f64;

    let rows: Vec<Vec<f64>> = records
        .iter()
        .map(|r| sources.iter().map(|s| feature_value(r, *s)).collect())
        .collect();

    let mut means = vec![0.0; n_features];
    for row in &rows {
        for (m, x) in means.iter_mut().zip(row) {
            *m += x / n;
        }
    }
    let mut stds = vec![0.0; n_features];
    for row in &rows {
        for ((s, x), m) in stds.iter_mut().zip(row).zip(&means) {
            *s += (x - m).powi(2) / n;
        }
    }
    let stds: Vec<f64> = stds.into_iter().map(|v| v.sqrt().max(1e-6)).collect();

    let mut centroids = vec![vec![0.0; n_features]; n_classes];
    let mut counts = vec![0usize; n_classes];
    for (row, r) in rows.iter().zip(records) {
        let class = (r.order.min(MAX_ORDER_CLASS) - 1) as usize;
        counts[class] += 1;
        for (j, x) in row.iter().enumerate() {
            centroids[class][j] += (x - means[j]) / stds[j];
        }
    }
    for (centroid, &count) in centroids.iter_mut().zip(&counts) {
        for v in centroid.iter_mut() {
            *v /= count.max(1) as f64;
        }
    }

    let weights: Vec<Vec<f64>> = (0..n_features)
        .map(|j| centroids.iter().map(|c| c[j]).collect())
        .collect();
    let biases: Vec<f64> = centroids
        .iter()
        .zip(&counts)
        .map(|(c, &count)| {
            let prior = (count.max(1) as f64) / n;
            -0.5 * c.iter().map(|v| v * v).sum::<f64>() + prior.ln()
        })
        .collect();

    LinearClassifier {
        feature_columns: schema.columns(),
        classes: (1..=MAX_ORDER_CLASS).map(|c| c.to_string()).collect(),
        weights,
        biases,
        means: Some(means),
        stds: Some(stds),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let records = simulate(&mut rng, args.sessions);

    std::fs::create_dir_all(&args.out_dir).context("creating output directory")?;
    let csv_path = args.out_dir.join("clicks.csv");
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(&csv_path)
        .context("creating clicks.csv")?;
    for record in &records {
        writer.serialize(record).context("writing click record")?;
    }
    writer.flush().context("flushing clicks.csv")?;

    let model = fit(&records, &FeatureSchema::default());
    let json = ModelArtifact::Linear(model)
        .to_json_pretty()
        .map_err(anyhow::Error::msg)?;
    let model_path = args.out_dir.join("clicks_clf.json");
    std::fs::write(&model_path, json).context("writing clicks_clf.json")?;

    println!(
        "Wrote {} clicks from {} sessions to {} and a linear model to {}",
        records.len(),
        args.sessions,
        csv_path.display(),
        model_path.display()
    );
    Ok(())
}
