use anyhow::{Context, Result};
use log::info;

use edustat::data::csv_text;
use edustat::data::model::{FieldValue, Record, RecordSet};
use edustat::data::schema::{self, ALL_FIELDS};

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

    fn range(&mut self, low: u64, high: u64) -> u64 {
        low + self.next_u64() % (high - low + 1)
    }
}

/// Regions with a development index that shifts both digital access and scores.
const REGIONS: [(&str, &str, f64); 5] = [
    ("Seoul", "S", 0.85),
    ("Busan", "B", 0.72),
    ("Daegu", "D", 0.68),
    ("Gwangju", "G", 0.61),
    ("Gangwon", "K", 0.55),
];

const FIRST_YEAR: u32 = 2018;
const LAST_YEAR: u32 = 2023;
const POLICY_YEAR: u32 = 2021;
const SCHOOLS_PER_REGION: usize = 8;

fn put(record: &mut Record, field: &str, value: f64, decimals: usize) {
    record.insert(field, FieldValue::Text(format!("{value:.decimals$}")));
}

fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_schools.csv".to_string());

    let mut rng = SimpleRng::new(42);
    let mut records = Vec::new();

    for &(region, prefix, hdi) in &REGIONS {
        for school in 0..SCHOOLS_PER_REGION {
            let code = format!("{prefix}{:04}", 1001 + school);
            let name = format!("{region} School {}", school + 1);
            let students = rng.range(150, 1200) as f64;
            let base_digital = rng.gauss(60.0 + hdi * 20.0, 10.0);

            for year in FIRST_YEAR..=LAST_YEAR {
                let after = year >= POLICY_YEAR;
                let growth = (year - FIRST_YEAR) as f64 * 2.0 + if after { 5.0 } else { 0.0 };
                let digital = (base_digital + growth + rng.gauss(0.0, 3.0)).clamp(0.0, 100.0);
                let math = (50.0 * hdi
                    + 0.2 * digital
                    + 10.0 * hdi
                    + 0.1 * digital * hdi
                    + rng.gauss(0.0, 5.0))
                .clamp(0.0, 100.0);

                let mut record = Record::new();
                record.insert(schema::SCHOOL_NAME, FieldValue::Text(name.clone()));
                record.insert(schema::SCHOOL_CODE, FieldValue::Text(code.clone()));
                record.insert(schema::REGION, FieldValue::Text(region.to_string()));
                record.insert(schema::YEAR, FieldValue::Text(year.to_string()));
                put(&mut record, schema::TOTAL_STUDENTS, students, 0);
                put(&mut record, schema::DIGITAL_SCORE, digital, 1);
                put(&mut record, schema::MATH_SCORE, math, 1);
                put(&mut record, schema::COMPUTER_COUNT, (students * digital / 400.0).round(), 0);
                put(&mut record, schema::INTERNET_SPEED, (100.0 + digital * 8.0).round(), 0);
                put(&mut record, schema::SMART_CLASSROOM_COUNT, (digital / 10.0).floor(), 0);
                put(&mut record, schema::DIGITAL_TEXTBOOK_COUNT, (students * digital / 150.0).round(), 0);
                put(&mut record, schema::CLASS_USAGE_RATE, (digital * 0.9 + rng.gauss(0.0, 4.0)).clamp(0.0, 100.0), 1);
                put(&mut record, schema::STUDENT_USAGE_RATE, (digital * 0.8 + rng.gauss(0.0, 6.0)).clamp(0.0, 100.0), 1);
                put(&mut record, schema::TEACHER_USAGE_RATE, (digital * 0.95 + rng.gauss(0.0, 3.0)).clamp(0.0, 100.0), 1);
                record.insert(
                    schema::POLICY_STATUS,
                    FieldValue::Text(if after { "after" } else { "before" }.to_string()),
                );
                records.push(record);
            }
        }
    }

    let columns = ALL_FIELDS.iter().map(|f| f.to_string()).collect();
    let set = RecordSet::with_columns(columns, records);
    let text = csv_text::to_csv_string(&set).context("serializing sample dataset")?;
    std::fs::write(&output_path, text)
        .with_context(|| format!("writing {output_path}"))?;

    info!("wrote {} records to {output_path}", set.len());
    println!("Wrote {} school-year records to {output_path}", set.len());
    Ok(())
}
