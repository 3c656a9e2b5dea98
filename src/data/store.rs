use log::debug;

use super::model::{Record, RecordSet};
use super::schema::{REGION, SCHOOL_CODE, SCHOOL_NAME, YEAR};
use crate::engine::Engine;

// ---------------------------------------------------------------------------
// Selectors: the region / year / search filter triple
// ---------------------------------------------------------------------------

/// Filter selectors. A selector that is `None`, empty or only whitespace
/// imposes no constraint; the remaining ones are combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selectors {
    pub region: Option<String>,
    pub year: Option<String>,
    pub search: Option<String>,
}

impl Selectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Whether no selector constrains anything.
    pub fn is_empty(&self) -> bool {
        active(&self.region).is_none()
            && active(&self.year).is_none()
            && active(&self.search).is_none()
    }

    /// Whether `record` passes every active selector.
    ///
    /// * `region` / `year`: exact equality with the record's key text.
    /// * `search`: case-insensitive substring of `school_name` or `school_code`.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(region) = active(&self.region) {
            if !record.key_equals(REGION, region) {
                return false;
            }
        }
        if let Some(year) = active(&self.year) {
            if !record.key_equals(YEAR, year) {
                return false;
            }
        }
        if let Some(term) = active(&self.search) {
            let term = term.to_lowercase();
            let hit = |field: &str| {
                record
                    .key(field)
                    .is_some_and(|value| value.to_lowercase().contains(&term))
            };
            if !hit(SCHOOL_NAME) && !hit(SCHOOL_CODE) {
                return false;
            }
        }
        true
    }
}

fn active(selector: &Option<String>) -> Option<&str> {
    selector
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Return a fresh set holding the records of `set` that pass `selectors`,
/// in their original order.
pub fn filter_records(set: &RecordSet, selectors: &Selectors) -> RecordSet {
    if selectors.is_empty() {
        return set.clone();
    }
    let kept: Vec<Record> = set
        .iter()
        .filter(|record| selectors.matches(record))
        .cloned()
        .collect();
    debug!("filter {:?}: {} of {} records", selectors, kept.len(), set.len());
    set.derive(kept)
}

// ---------------------------------------------------------------------------
// RecordStore – the current full dataset
// ---------------------------------------------------------------------------

/// Holds the full working dataset. Filtering never mutates it.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    dataset: RecordSet,
}

impl RecordStore {
    pub fn new(dataset: RecordSet) -> Self {
        RecordStore { dataset }
    }

    /// Replace the whole dataset.
    pub fn load(&mut self, dataset: RecordSet) {
        self.dataset = dataset;
    }

    pub fn dataset(&self) -> &RecordSet {
        &self.dataset
    }

    pub fn filter_by(&self, selectors: &Selectors) -> RecordSet {
        filter_records(&self.dataset, selectors)
    }

    /// Distinct regions of the full dataset, for filter drop-downs.
    pub fn regions(&self) -> Vec<String> {
        Engine::new(&self.dataset).distinct_sorted(REGION)
    }

    /// Distinct years of the full dataset, for filter drop-downs.
    pub fn years(&self) -> Vec<String> {
        Engine::new(&self.dataset).distinct_sorted(YEAR)
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }
}
