use std::time::Duration;

use log::{error, info};

use crate::config::Config;
use crate::data::loader::{DataSource, LoadOutcome, Loader};
use crate::data::model::RecordSet;
use crate::data::store::{RecordStore, Selectors};
use crate::engine::sections::DashboardReport;
use crate::engine::Engine;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The dashboard state owned by the UI side: the loaded dataset, the current
/// filter selectors and the cached visible subset. Aggregation itself lives in
/// the stateless [`Engine`].
pub struct Session {
    config: Config,

    /// Full dataset of the last successful load.
    store: RecordStore,

    /// Source of the dataset in `store` (None until a load succeeds).
    source: Option<DataSource>,

    /// Current filter selections.
    selectors: Selectors,

    /// Records passing the current selectors (cached).
    visible: RecordSet,

    /// Status / error message shown in the UI.
    status_message: Option<String>,

    loader: Loader,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(Config::default())
    }
}

impl Session {
    pub fn new(config: Config) -> Self {
        let loader = Loader::new(config.data.http_timeout());
        Self {
            config,
            store: RecordStore::default(),
            source: None,
            selectors: Selectors::default(),
            visible: RecordSet::default(),
            status_message: None,
            loader,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // -- loading --

    /// Start a background load; a later call supersedes it.
    pub fn begin_load(&mut self, source: DataSource) -> u64 {
        self.status_message = None;
        self.loader.start(source)
    }

    /// Start loading the configured data source.
    pub fn load_configured(&mut self) -> u64 {
        let source = self.config.data.source();
        self.begin_load(source)
    }

    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loader.is_pending()
    }

    /// Apply the newest load's outcome if it has arrived. Returns whether
    /// anything was applied.
    pub fn poll_load(&mut self) -> bool {
        match self.loader.poll() {
            Some(outcome) => {
                self.apply_outcome(outcome);
                true
            }
            None => false,
        }
    }

    /// Like [`Session::poll_load`] but blocks up to `timeout`.
    pub fn wait_load(&mut self, timeout: Duration) -> bool {
        match self.loader.wait(timeout) {
            Some(outcome) => {
                self.apply_outcome(outcome);
                true
            }
            None => false,
        }
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) {
        match outcome.result {
            Ok(dataset) => {
                info!(
                    "load #{} applied: {} records from {}",
                    outcome.generation,
                    dataset.len(),
                    outcome.source
                );
                self.set_dataset(dataset);
                self.source = Some(outcome.source);
            }
            Err(e) => {
                // The previous dataset stays active.
                error!("Failed to load {}: {e}", outcome.source);
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Replace the dataset and re-apply the current selectors.
    pub fn set_dataset(&mut self, dataset: RecordSet) {
        self.store.load(dataset);
        self.status_message = None;
        self.refilter();
    }

    // -- filters --

    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    pub fn set_selectors(&mut self, selectors: Selectors) {
        self.selectors = selectors;
        self.refilter();
    }

    pub fn set_region(&mut self, region: Option<String>) {
        self.selectors.region = region;
        self.refilter();
    }

    pub fn set_year(&mut self, year: Option<String>) {
        self.selectors.year = year;
        self.refilter();
    }

    pub fn set_search(&mut self, term: Option<String>) {
        self.selectors.search = term;
        self.refilter();
    }

    pub fn clear_filters(&mut self) {
        self.set_selectors(Selectors::default());
    }

    /// Recompute `visible` after a selector or dataset change.
    fn refilter(&mut self) {
        self.visible = self.store.filter_by(&self.selectors);
    }

    // -- views --

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn source(&self) -> Option<&DataSource> {
        self.source.as_ref()
    }

    pub fn visible(&self) -> &RecordSet {
        &self.visible
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Engine over the visible records.
    pub fn engine(&self) -> Engine<'_> {
        Engine::with_config(&self.visible, &self.config.engine)
    }

    /// Every dashboard section for the visible records. The achievement
    /// trend spans all years of the full dataset.
    pub fn report(&self) -> DashboardReport {
        let years = self.store.years();
        DashboardReport::build(
            &self.engine(),
            self.config.engine.histogram_bins,
            Some(years.as_slice()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::Format;

    const WAIT: Duration = Duration::from_secs(5);

    const CSV: &str = "\
school_name,school_code,region,year,math_score,policy_status
Hanbit,S1,Seoul,2020,80,before
Gangnam,S2,Seoul,2021,90,after
Haeundae,B1,Busan,2020,70,before
";

    fn inline(text: &str, format: Format) -> DataSource {
        DataSource::Inline {
            text: text.to_string(),
            format,
        }
    }

    fn loaded() -> Session {
        let mut session = Session::default();
        session.begin_load(inline(CSV, Format::Csv));
        assert!(session.wait_load(WAIT));
        session
    }

    #[test]
    fn load_populates_visible_records() {
        let session = loaded();
        assert!(!session.is_loading());
        assert_eq!(session.store().len(), 3);
        assert_eq!(session.visible().len(), 3);
        assert!(session.source().is_some());
        assert_eq!(session.status_message(), None);
    }

    #[test]
    fn filters_drive_the_engine() {
        let mut session = loaded();
        session.set_region(Some("Seoul".to_string()));
        assert_eq!(session.visible().len(), 2);
        assert_eq!(session.engine().average_field("math_score"), 85.0);

        session.set_year(Some("2021".to_string()));
        assert_eq!(session.visible().len(), 1);

        session.clear_filters();
        assert_eq!(session.visible().len(), 3);

        session.set_search(Some("haeun".to_string()));
        assert_eq!(session.visible().len(), 1);
    }

    #[test]
    fn failed_reload_keeps_previous_dataset() {
        let mut session = loaded();
        session.begin_load(inline("{}", Format::Json));
        assert!(session.wait_load(WAIT));
        assert_eq!(session.store().len(), 3);
        assert!(session
            .status_message()
            .is_some_and(|m| m.starts_with("Error:")));
    }

    #[test]
    fn reload_keeps_selectors() {
        let mut session = loaded();
        session.set_region(Some("Busan".to_string()));
        session.begin_load(inline(
            r#"[{"region": "Busan", "year": 2022, "math_score": 60},
                {"region": "Seoul", "year": 2022, "math_score": 95}]"#,
            Format::Json,
        ));
        assert!(session.wait_load(WAIT));
        assert_eq!(session.visible().len(), 1);
        assert_eq!(session.engine().sum_field("math_score"), 60.0);
    }

    #[test]
    fn superseded_load_is_never_applied() {
        let mut session = Session::default();
        session.begin_load(inline(CSV, Format::Csv));
        session.begin_load(inline("region\nDaegu\n", Format::Csv));
        assert!(session.wait_load(WAIT));
        assert_eq!(session.store().regions(), ["Daegu"]);
        assert!(!session.wait_load(Duration::from_millis(50)));
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn report_uses_full_year_axis() {
        let mut session = loaded();
        session.set_year(Some("2021".to_string()));
        let report = session.report();
        assert_eq!(report.overview.school_count, 1);
        assert_eq!(report.achievement.trend.keys, ["2020", "2021"]);
        assert!(report.achievement.trend.values[0].is_nan());
        assert_eq!(report.achievement.trend.values[1], 90.0);
        assert_eq!(report.achievement.distribution.bin_count, 10);
    }
}
