use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value as JsonValue;

use super::csv_text;
use super::model::{FieldValue, Record, RecordSet};
use crate::error::{LoadError, ParseError};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Text encoding of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    /// Format for a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Format::Csv),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// `.csv` or `.json` file, dispatched by extension.
    File(PathBuf),
    /// HTTP(S) endpoint answering with a JSON array or CSV text.
    Url(String),
    /// Text already in memory.
    Inline { text: String, format: Format },
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => write!(f, "{url}"),
            DataSource::Inline { format, text } => {
                write!(f, "<inline {format:?}, {} bytes>", text.len())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a dataset synchronously.
pub fn load_source(source: &DataSource, http_timeout: Duration) -> Result<RecordSet, LoadError> {
    let set = match source {
        DataSource::File(path) => load_file(path)?,
        DataSource::Url(url) => fetch_url(url, http_timeout)?,
        DataSource::Inline { text, format } => parse_text(text, *format)?,
    };
    info!("Loaded {} records with columns {:?} from {source}", set.len(), set.columns());
    Ok(set)
}

/// Parse in-memory text of the given format.
pub fn parse_text(text: &str, format: Format) -> Result<RecordSet, ParseError> {
    match format {
        Format::Csv => csv_text::parse(text),
        Format::Json => parse_json(text),
    }
}

fn load_file(path: &Path) -> Result<RecordSet, LoadError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let format = Format::from_extension(ext)
        .ok_or_else(|| LoadError::UnsupportedFormat(format!(".{ext}")))?;

    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_text(&text, format)?)
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

fn fetch_url(url: &str, timeout: Duration) -> Result<RecordSet, LoadError> {
    debug!("GET {url}");
    let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text()?;

    Ok(parse_text(&body, format_for_url(url, content_type.as_deref()))?)
}

/// JSON when the content type or the URL path says so, CSV otherwise.
fn format_for_url(url: &str, content_type: Option<&str>) -> Format {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json")) {
        return Format::Json;
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit_once('.') {
        Some((_, ext)) if ext.eq_ignore_ascii_case("json") => Format::Json,
        _ => Format::Csv,
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "school_name": "Hanbit", "region": "Seoul", "year": 2020, "math_score": 80.5 },
///   ...
/// ]
/// ```
///
/// `null` and blank strings are absent; nested arrays or objects are kept as
/// their JSON text.
pub fn parse_json(text: &str) -> Result<RecordSet, ParseError> {
    let root: JsonValue = serde_json::from_str(text)?;
    let rows = root.as_array().ok_or(ParseError::NotAnArray)?;

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or(ParseError::NotAnObject { index })?;

        let mut record = Record::new();
        for (key, val) in obj {
            if let Some(value) = json_to_field(val) {
                record.insert(key.clone(), value);
            }
        }
        records.push(record);
    }

    debug!("parsed {} JSON records", records.len());
    Ok(RecordSet::from_records(records))
}

fn json_to_field(val: &JsonValue) -> Option<FieldValue> {
    match val {
        JsonValue::String(s) => FieldValue::from_cell(s),
        JsonValue::Number(n) => n.as_f64().map(FieldValue::Number),
        JsonValue::Bool(b) => Some(FieldValue::Bool(*b)),
        JsonValue::Null => None,
        other => Some(FieldValue::Text(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Background loading
// ---------------------------------------------------------------------------

/// Result of one background load.
#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: u64,
    pub source: DataSource,
    pub result: Result<RecordSet, LoadError>,
}

struct PendingLoad {
    generation: u64,
    source: DataSource,
    receiver: Receiver<Result<RecordSet, LoadError>>,
}

/// Runs loads on worker threads with last-write-wins semantics.
///
/// Each [`Loader::start`] supersedes the load before it: the older worker's
/// receiver is dropped, so its result is discarded whenever it finishes.
pub struct Loader {
    http_timeout: Duration,
    generation: u64,
    pending: Option<PendingLoad>,
}

impl Loader {
    pub fn new(http_timeout: Duration) -> Self {
        Loader {
            http_timeout,
            generation: 0,
            pending: None,
        }
    }

    /// Start loading `source` in the background and return its generation.
    pub fn start(&mut self, source: DataSource) -> u64 {
        self.generation += 1;
        let generation = self.generation;

        if let Some(old) = self.pending.take() {
            warn!(
                "load #{} ({}) superseded by load #{generation}",
                old.generation, old.source
            );
        }

        let (sender, receiver) = mpsc::channel();
        let worker_source = source.clone();
        let timeout = self.http_timeout;
        thread::spawn(move || {
            let result = load_source(&worker_source, timeout);
            // The receiver is gone when a newer load superseded this one.
            let _ = sender.send(result);
        });

        self.pending = Some(PendingLoad {
            generation,
            source,
            receiver,
        });
        generation
    }

    /// Whether the newest load has not reported yet.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Generation of the newest load started, `0` before the first.
    pub fn latest_generation(&self) -> u64 {
        self.generation
    }

    /// Non-blocking check for the newest load's outcome.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let pending = self.pending.as_ref()?;
        let result = match pending.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(LoadError::Disconnected),
        };
        self.finish(result)
    }

    /// Block up to `timeout` for the newest load's outcome.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadOutcome> {
        let pending = self.pending.as_ref()?;
        let result = match pending.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Err(LoadError::Disconnected),
        };
        self.finish(result)
    }

    fn finish(&mut self, result: Result<RecordSet, LoadError>) -> Option<LoadOutcome> {
        let pending = self.pending.take()?;
        Some(LoadOutcome {
            generation: pending.generation,
            source: pending.source,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn json_rows_become_records() {
        let set = parse_json(
            r#"[
                {"school_name": "Hanbit", "region": "Seoul", "year": 2020, "math_score": 80.5,
                 "policy_status": "before", "digital_score": null, "tags": ["a"]},
                {"region": "Busan", "year": "2021", "smart": true, "school_code": " "}
            ]"#,
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        let first = &set.records()[0];
        assert_eq!(first.key("year").as_deref(), Some("2020"));
        assert_eq!(first.number("math_score"), 80.5);
        assert!(first.get("digital_score").is_none());
        assert_eq!(first.key("tags").as_deref(), Some(r#"["a"]"#));

        let second = &set.records()[1];
        assert_eq!(second.get("smart"), Some(&FieldValue::Bool(true)));
        assert!(second.get("school_code").is_none());
        assert_eq!(second.number("smart"), 0.0);
    }

    #[test]
    fn json_shape_errors() {
        assert!(matches!(parse_json(r#"{"a": 1}"#), Err(ParseError::NotAnArray)));
        assert!(matches!(
            parse_json(r#"[{"a": 1}, 3]"#),
            Err(ParseError::NotAnObject { index: 1 })
        ));
        assert!(matches!(parse_json("[{"), Err(ParseError::Json(_))));
    }

    #[test]
    fn csv_and_json_are_interchangeable() {
        let from_csv = parse_text("region,year,math_score\nSeoul,2020,80\n", Format::Csv).unwrap();
        let from_json = parse_text(
            r#"[{"region": "Seoul", "year": 2020, "math_score": 80}]"#,
            Format::Json,
        )
        .unwrap();
        let a = &from_csv.records()[0];
        let b = &from_json.records()[0];
        assert_eq!(a.key("year"), b.key("year"));
        assert_eq!(a.number("math_score"), b.number("math_score"));
    }

    #[test]
    fn files_dispatch_by_extension() {
        let csv = write_temp(".csv", "region,year\nSeoul,2020\n");
        let set = load_source(&DataSource::File(csv.path().to_path_buf()), TIMEOUT).unwrap();
        assert_eq!(set.len(), 1);

        let json = write_temp(".JSON", r#"[{"region": "Seoul"}, {"region": "Busan"}]"#);
        let set = load_source(&DataSource::File(json.path().to_path_buf()), TIMEOUT).unwrap();
        assert_eq!(set.len(), 2);

        let other = write_temp(".parquet", "");
        let err = load_source(&DataSource::File(other.path().to_path_buf()), TIMEOUT).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ext) if ext == ".parquet"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.csv");
        let err = load_source(&DataSource::File(path.clone()), TIMEOUT).unwrap_err();
        assert!(matches!(err, LoadError::Io { path: p, .. } if p == path));
    }

    #[test]
    fn url_format_detection() {
        assert_eq!(format_for_url("http://h/data", Some("application/json; charset=utf-8")), Format::Json);
        assert_eq!(format_for_url("http://h/data.json?v=2", None), Format::Json);
        assert_eq!(format_for_url("http://h/data.csv", Some("text/csv")), Format::Csv);
        assert_eq!(format_for_url("http://h/api/overview/regional", None), Format::Csv);
    }

    #[test]
    fn background_load_reports_once() {
        let mut loader = Loader::new(TIMEOUT);
        assert!(loader.poll().is_none());

        let generation = loader.start(DataSource::Inline {
            text: "region\nSeoul\n".to_string(),
            format: Format::Csv,
        });
        assert!(loader.is_pending());

        let outcome = loader.wait(TIMEOUT).expect("load finished");
        assert_eq!(outcome.generation, generation);
        assert_eq!(outcome.result.unwrap().len(), 1);
        assert!(!loader.is_pending());
        assert!(loader.poll().is_none());
    }

    #[test]
    fn newer_load_wins() {
        let mut loader = Loader::new(TIMEOUT);
        let first = loader.start(DataSource::Inline {
            text: "region\nSeoul\nBusan\n".to_string(),
            format: Format::Csv,
        });
        let second = loader.start(DataSource::Inline {
            text: "region\nDaegu\n".to_string(),
            format: Format::Csv,
        });
        assert!(second > first);
        assert_eq!(loader.latest_generation(), second);

        let outcome = loader.wait(TIMEOUT).expect("load finished");
        assert_eq!(outcome.generation, second);
        let set = outcome.result.unwrap();
        assert_eq!(set.records()[0].key("region").as_deref(), Some("Daegu"));
        assert!(loader.wait(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn failed_load_is_reported() {
        let mut loader = Loader::new(TIMEOUT);
        loader.start(DataSource::Inline {
            text: "[1]".to_string(),
            format: Format::Json,
        });
        let outcome = loader.wait(TIMEOUT).expect("load finished");
        assert!(matches!(
            outcome.result,
            Err(LoadError::Parse(ParseError::NotAnObject { index: 0 }))
        ));
    }
}
