//! Aggregation engine: pure reductions over a [`RecordSet`].
//!
//! ```text
//!   RecordSet (already filtered)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  Engine   │  count / sum / mean, grouped maps, series, policy split
//!   └──────────┘
//!        │
//!        ▼
//!   results::*  → presentation layer (charts, tables)
//! ```
//!
//! Numeric fields read through [`Record::number`], so a missing or malformed
//! value contributes `0.0` and still counts as a record. Averages over zero
//! records are `NaN`.

pub mod results;
pub mod sections;

use std::collections::{BTreeMap, BTreeSet};

use crate::config::EngineConfig;
use crate::data::model::{Record, RecordSet};
use crate::data::schema::{PolicyStatus, POLICY_STATUS};
use results::{
    BeforeAfter, Counts, Distribution, Histogram, LinearFit, PairedSeries, PolicyComparison,
    PolicyTrend, Summary, Trend,
};

/// Bucket label for records whose group field is absent or blank.
pub const DEFAULT_MISSING_GROUP: &str = "Other";

// ---------------------------------------------------------------------------
// Running mean
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless query surface over one record set.
#[derive(Debug, Clone)]
pub struct Engine<'a> {
    records: &'a RecordSet,
    missing_group: String,
}

impl<'a> Engine<'a> {
    pub fn new(records: &'a RecordSet) -> Self {
        Engine {
            records,
            missing_group: DEFAULT_MISSING_GROUP.to_string(),
        }
    }

    pub fn with_config(records: &'a RecordSet, config: &EngineConfig) -> Self {
        Engine {
            records,
            missing_group: config.missing_group_label.clone(),
        }
    }

    pub fn records(&self) -> &'a RecordSet {
        self.records
    }

    fn group_key(&self, record: &Record, field: &str) -> String {
        record
            .key(field)
            .unwrap_or_else(|| self.missing_group.clone())
    }

    fn group_means(&self, group: &str, value: &str) -> BTreeMap<String, Mean> {
        let mut groups: BTreeMap<String, Mean> = BTreeMap::new();
        for record in self.records {
            groups
                .entry(self.group_key(record, group))
                .or_default()
                .push(record.number(value));
        }
        groups
    }

    // -- scalars --

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn sum_field(&self, field: &str) -> f64 {
        self.records.iter().map(|r| r.number(field)).sum()
    }

    /// `sum_field / count`; `NaN` for an empty set.
    pub fn average_field(&self, field: &str) -> f64 {
        Mean {
            sum: self.sum_field(field),
            count: self.count(),
        }
        .value()
    }

    pub fn summary(&self, field: &str) -> Summary {
        Summary {
            count: self.count(),
            total: self.sum_field(field),
            average: self.average_field(field),
        }
    }

    // -- grouped --

    /// Sum of `value` per distinct `group` key.
    pub fn group_sum(&self, group: &str, value: &str) -> Distribution {
        self.group_means(group, value)
            .into_iter()
            .map(|(key, mean)| (key, mean.sum))
            .collect()
    }

    /// Mean of `value` per distinct `group` key.
    pub fn group_average(&self, group: &str, value: &str) -> Distribution {
        self.group_means(group, value)
            .into_iter()
            .map(|(key, mean)| (key, mean.value()))
            .collect()
    }

    /// Number of records per distinct `field` key.
    pub fn value_counts(&self, field: &str) -> Counts {
        let mut counts = Counts::new();
        for record in self.records {
            *counts.entry(self.group_key(record, field)).or_default() += 1;
        }
        counts
    }

    /// Unique present values of `field`, ascending lexicographic.
    pub fn distinct_sorted(&self, field: &str) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.key(field))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sum of each listed field over the whole set, keyed by field name.
    pub fn field_totals(&self, fields: &[&str]) -> Distribution {
        fields
            .iter()
            .map(|f| (f.to_string(), self.sum_field(f)))
            .collect()
    }

    /// Mean of each listed field over the whole set, keyed by field name.
    pub fn field_averages(&self, fields: &[&str]) -> Distribution {
        fields
            .iter()
            .map(|f| (f.to_string(), self.average_field(f)))
            .collect()
    }

    // -- series --

    /// Mean of `value` for every distinct `group` key, keys ascending.
    pub fn trend(&self, group: &str, value: &str) -> Trend {
        let (keys, values): (Vec<String>, Vec<f64>) = self
            .group_means(group, value)
            .into_iter()
            .map(|(key, mean)| (key, mean.value()))
            .unzip();
        Trend { keys, values }
    }

    /// Mean of `value` for each of the given keys, in the given order.
    /// A key with no matching records yields `NaN`.
    pub fn trend_over<S: AsRef<str>>(&self, keys: &[S], group: &str, value: &str) -> Trend {
        let groups = self.group_means(group, value);
        let values = keys
            .iter()
            .map(|key| groups.get(key.as_ref()).copied().unwrap_or_default().value())
            .collect();
        Trend {
            keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
            values,
        }
    }

    /// Per-record `(x, y)` values; both sides always have `count()` entries.
    pub fn correlation_series(&self, x: &str, y: &str) -> PairedSeries {
        PairedSeries {
            x: self.records.iter().map(|r| r.number(x)).collect(),
            y: self.records.iter().map(|r| r.number(y)).collect(),
        }
    }

    pub fn histogram_bins(&self, value: &str, bin_count: usize) -> Histogram {
        Histogram {
            values: self.records.iter().map(|r| r.number(value)).collect(),
            bin_count,
        }
    }

    // -- correlation --

    /// Pearson correlation coefficient of `x` and `y`.
    ///
    /// `NaN` with fewer than two records or when either side is constant.
    pub fn pearson(&self, x: &str, y: &str) -> f64 {
        let moments = Moments::of(&self.correlation_series(x, y));
        if moments.n < 2 || moments.sxx == 0.0 || moments.syy == 0.0 {
            return f64::NAN;
        }
        moments.sxy / (moments.sxx * moments.syy).sqrt()
    }

    /// Least-squares line of `y` on `x`; `None` with fewer than two records
    /// or a constant `x`.
    pub fn linear_fit(&self, x: &str, y: &str) -> Option<LinearFit> {
        let moments = Moments::of(&self.correlation_series(x, y));
        if moments.n < 2 || moments.sxx == 0.0 {
            return None;
        }
        let slope = moments.sxy / moments.sxx;
        Some(LinearFit {
            slope,
            intercept: moments.mean_y - slope * moments.mean_x,
        })
    }

    // -- policy --

    /// Mean of `value` per `group` key, split by `policy_status`.
    /// An empty side is `NaN`. Records with another status still create their group.
    pub fn policy_comparison(&self, group: &str, value: &str) -> PolicyComparison {
        let mut groups: BTreeMap<String, (Mean, Mean)> = BTreeMap::new();
        for record in self.records {
            let entry = groups.entry(self.group_key(record, group)).or_default();
            let status = record
                .key(POLICY_STATUS)
                .as_deref()
                .and_then(PolicyStatus::parse);
            match status {
                Some(PolicyStatus::Before) => entry.0.push(record.number(value)),
                Some(PolicyStatus::After) => entry.1.push(record.number(value)),
                None => {}
            }
        }
        groups
            .into_iter()
            .map(|(key, (before, after))| {
                (
                    key,
                    BeforeAfter {
                        before: before.value(),
                        after: after.value(),
                    },
                )
            })
            .collect()
    }

    /// [`Engine::policy_comparison`] as aligned series, keys ascending.
    pub fn policy_trend(&self, group: &str, value: &str) -> PolicyTrend {
        let comparison = self.policy_comparison(group, value);
        let mut trend = PolicyTrend {
            keys: Vec::with_capacity(comparison.len()),
            before: Vec::with_capacity(comparison.len()),
            after: Vec::with_capacity(comparison.len()),
        };
        for (key, pair) in comparison {
            trend.keys.push(key);
            trend.before.push(pair.before);
            trend.after.push(pair.after);
        }
        trend
    }
}

/// Centered second moments of a paired series.
struct Moments {
    n: usize,
    mean_x: f64,
    mean_y: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

impl Moments {
    fn of(series: &PairedSeries) -> Self {
        let n = series.len();
        let mean = |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };
        let mean_x = mean(&series.x);
        let mean_y = mean(&series.y);

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for (x, y) in series.x.iter().zip(&series.y) {
            let dx = x - mean_x;
            let dy = y - mean_y;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        Moments {
            n,
            mean_x,
            mean_y,
            sxx,
            syy,
            sxy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{DIGITAL_SCORE, MATH_SCORE, REGION, YEAR};

    fn rs(rows: &[&[(&str, &str)]]) -> RecordSet {
        RecordSet::from_records(
            rows.iter()
                .map(|pairs| Record::from_pairs(pairs.iter().copied()))
                .collect(),
        )
    }

    fn sample() -> RecordSet {
        rs(&[
            &[(REGION, "Seoul"), (YEAR, "2020"), (MATH_SCORE, "80"), (DIGITAL_SCORE, "60"), (POLICY_STATUS, "before")],
            &[(REGION, "Seoul"), (YEAR, "2021"), (MATH_SCORE, "90"), (DIGITAL_SCORE, "70"), (POLICY_STATUS, "after")],
            &[(REGION, "Busan"), (YEAR, "2020"), (MATH_SCORE, "70"), (DIGITAL_SCORE, "50"), (POLICY_STATUS, "before")],
            &[(YEAR, "2021"), (MATH_SCORE, "60"), (POLICY_STATUS, "after")],
        ])
    }

    #[test]
    fn scalars() {
        let set = sample();
        let engine = Engine::new(&set);
        assert_eq!(engine.count(), 4);
        assert_eq!(engine.sum_field(MATH_SCORE), 300.0);
        assert_eq!(engine.average_field(MATH_SCORE), 75.0);
        // the fourth record has no digital score but still counts
        assert_eq!(engine.average_field(DIGITAL_SCORE), 45.0);
        assert_eq!(
            engine.summary(MATH_SCORE),
            Summary {
                count: 4,
                total: 300.0,
                average: 75.0
            }
        );
    }

    #[test]
    fn empty_set_average_is_nan() {
        let set = RecordSet::default();
        let engine = Engine::new(&set);
        assert_eq!(engine.count(), 0);
        assert!(engine.average_field(MATH_SCORE).is_nan());
        assert!(engine.group_sum(REGION, MATH_SCORE).is_empty());
        assert!(engine.trend(YEAR, MATH_SCORE).keys.is_empty());
    }

    #[test]
    fn grouping_uses_placeholder_for_missing_keys() {
        let set = sample();
        let engine = Engine::new(&set);
        let sums = engine.group_sum(REGION, MATH_SCORE);
        assert_eq!(sums.get("Seoul"), Some(&170.0));
        assert_eq!(sums.get("Busan"), Some(&70.0));
        assert_eq!(sums.get(DEFAULT_MISSING_GROUP), Some(&60.0));

        let avgs = engine.group_average(REGION, MATH_SCORE);
        assert_eq!(avgs.get("Seoul"), Some(&85.0));

        let counts = engine.value_counts(REGION);
        assert_eq!(counts.get("Seoul"), Some(&2));
        assert_eq!(counts.get(DEFAULT_MISSING_GROUP), Some(&1));
    }

    #[test]
    fn placeholder_label_is_configurable() {
        let set = sample();
        let config = EngineConfig {
            missing_group_label: "Unknown".to_string(),
            ..EngineConfig::default()
        };
        let engine = Engine::with_config(&set, &config);
        assert!(engine.group_sum(REGION, MATH_SCORE).contains_key("Unknown"));
    }

    #[test]
    fn distinct_sorted_skips_absent_values() {
        let set = sample();
        let engine = Engine::new(&set);
        assert_eq!(engine.distinct_sorted(REGION), ["Busan", "Seoul"]);
        assert_eq!(engine.distinct_sorted(YEAR), ["2020", "2021"]);
    }

    #[test]
    fn trend_keeps_keys_and_values_aligned() {
        let set = sample();
        let engine = Engine::new(&set);
        let trend = engine.trend(YEAR, MATH_SCORE);
        assert_eq!(trend.keys, ["2020", "2021"]);
        assert_eq!(trend.values, [75.0, 75.0]);

        let over = engine.trend_over(&["2019", "2020", "2021"], YEAR, MATH_SCORE);
        assert_eq!(over.keys, ["2019", "2020", "2021"]);
        assert!(over.values[0].is_nan());
        assert_eq!(over.values[1], 75.0);
    }

    #[test]
    fn series_and_histogram_cover_every_record() {
        let set = sample();
        let engine = Engine::new(&set);
        let series = engine.correlation_series(DIGITAL_SCORE, MATH_SCORE);
        assert_eq!(series.x, [60.0, 70.0, 50.0, 0.0]);
        assert_eq!(series.y, [80.0, 90.0, 70.0, 60.0]);

        let hist = engine.histogram_bins(MATH_SCORE, 10);
        assert_eq!(hist.values.len(), 4);
        assert_eq!(hist.bin_count, 10);
    }

    #[test]
    fn totals_and_averages_per_field() {
        let set = sample();
        let engine = Engine::new(&set);
        let totals = engine.field_totals(&[MATH_SCORE, DIGITAL_SCORE]);
        assert_eq!(totals[MATH_SCORE], 300.0);
        assert_eq!(totals[DIGITAL_SCORE], 180.0);
        let avgs = engine.field_averages(&[MATH_SCORE]);
        assert_eq!(avgs[MATH_SCORE], 75.0);
    }

    #[test]
    fn pearson_and_fit_on_a_line() {
        let set = rs(&[
            &[("x", "1"), ("y", "3")],
            &[("x", "2"), ("y", "5")],
            &[("x", "3"), ("y", "7")],
        ]);
        let engine = Engine::new(&set);
        assert!((engine.pearson("x", "y") - 1.0).abs() < 1e-12);
        let fit = engine.linear_fit("x", "y").unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_correlation() {
        let single = rs(&[&[("x", "1"), ("y", "2")]]);
        assert!(Engine::new(&single).pearson("x", "y").is_nan());
        assert!(Engine::new(&single).linear_fit("x", "y").is_none());

        let flat = rs(&[&[("x", "1"), ("y", "2")], &[("x", "1"), ("y", "4")]]);
        assert!(Engine::new(&flat).pearson("x", "y").is_nan());
        assert!(Engine::new(&flat).linear_fit("x", "y").is_none());
    }

    #[test]
    fn policy_split_per_group() {
        let set = sample();
        let engine = Engine::new(&set);
        let cmp = engine.policy_comparison(REGION, MATH_SCORE);
        assert_eq!(cmp["Seoul"], BeforeAfter { before: 80.0, after: 90.0 });
        assert_eq!(cmp["Busan"].before, 70.0);
        assert!(cmp["Busan"].after.is_nan());

        let by_year = engine.policy_trend(YEAR, MATH_SCORE);
        assert_eq!(by_year.keys, ["2020", "2021"]);
        assert_eq!(by_year.before[0], 75.0);
        assert!(by_year.after[0].is_nan());
        assert!(by_year.before[1].is_nan());
        assert_eq!(by_year.after[1], 75.0);
    }

    #[test]
    fn unknown_policy_status_yields_nan_sides() {
        let set = rs(&[&[(REGION, "Daegu"), (MATH_SCORE, "50"), (POLICY_STATUS, "during")]]);
        let cmp = Engine::new(&set).policy_comparison(REGION, MATH_SCORE);
        assert!(cmp["Daegu"].before.is_nan());
        assert!(cmp["Daegu"].after.is_nan());
    }
}
