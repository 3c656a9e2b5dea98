use std::collections::BTreeMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Result shapes handed to the presentation layer
// ---------------------------------------------------------------------------
//
// Averages over zero records are `NaN`. serde_json writes `NaN` as `null`,
// which a chart layer renders as "no data".

/// Group key → aggregate value, ordered by key.
pub type Distribution = BTreeMap<String, f64>;

/// Group key → number of records.
pub type Counts = BTreeMap<String, usize>;

/// Group key → before/after averages.
pub type PolicyComparison = BTreeMap<String, BeforeAfter>;

/// Scalar summary of one numeric field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub total: f64,
    pub average: f64,
}

/// Averages per key; `keys[i]` belongs to `values[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub keys: Vec<String>,
    pub values: Vec<f64>,
}

/// Per-record `(x, y)` pairs in record order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedSeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl PairedSeries {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeforeAfter {
    pub before: f64,
    pub after: f64,
}

/// Before/after averages laid out as aligned series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyTrend {
    pub keys: Vec<String>,
    pub before: Vec<f64>,
    pub after: Vec<f64>,
}

/// Clean numeric values plus the requested bin count. Binning is up to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub values: Vec<f64>,
    pub bin_count: usize,
}

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Any engine output, tagged for transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AggregationResult {
    Summary(Summary),
    Distribution(Distribution),
    Counts(Counts),
    Trend(Trend),
    Series(PairedSeries),
    PolicyComparison(PolicyComparison),
    PolicyTrend(PolicyTrend),
    Histogram(Histogram),
}

impl AggregationResult {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<Summary> for AggregationResult {
    fn from(value: Summary) -> Self {
        AggregationResult::Summary(value)
    }
}

impl From<Trend> for AggregationResult {
    fn from(value: Trend) -> Self {
        AggregationResult::Trend(value)
    }
}

impl From<PairedSeries> for AggregationResult {
    fn from(value: PairedSeries) -> Self {
        AggregationResult::Series(value)
    }
}

impl From<PolicyTrend> for AggregationResult {
    fn from(value: PolicyTrend) -> Self {
        AggregationResult::PolicyTrend(value)
    }
}

impl From<Histogram> for AggregationResult {
    fn from(value: Histogram) -> Self {
        AggregationResult::Histogram(value)
    }
}
