//! # Export Spooler
//!
//! Two-phase exports: `store` materializes a dataset under a random export id
//! with a fixed TTL, `load` retrieves it for download. Records that outlive
//! their TTL disappear; a download after expiry is a plain miss, never an
//! error. CSV rendering flattens nested documents into dot-separated columns.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::cache_key;
use crate::cache::CacheProvider;
use crate::error::CoreError;

/// The closed set of exportable datasets. Anything else is a validation
/// error, not a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    Dashboard,
    Users,
    Courses,
    Revenue,
    Engagement,
    Instructors,
    Students,
}

impl ExportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportType::Dashboard => "dashboard",
            ExportType::Users => "users",
            ExportType::Courses => "courses",
            ExportType::Revenue => "revenue",
            ExportType::Engagement => "engagement",
            ExportType::Instructors => "instructors",
            ExportType::Students => "students",
        }
    }
}

impl FromStr for ExportType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(ExportType::Dashboard),
            "users" => Ok(ExportType::Users),
            "courses" => Ok(ExportType::Courses),
            "revenue" => Ok(ExportType::Revenue),
            "engagement" => Ok(ExportType::Engagement),
            "instructors" => Ok(ExportType::Instructors),
            "students" => Ok(ExportType::Students),
            other => Err(CoreError::Validation(format!(
                "unknown export type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(CoreError::Validation(format!(
                "unknown export format '{other}'"
            ))),
        }
    }
}

/// Filters a caller may apply to an export request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub include_details: bool,
    pub category_id: Option<Uuid>,
    pub instructor_id: Option<Uuid>,
}

/// A dataset is either row-shaped (exports column-per-field) or a single
/// nested document (exports as one flattened row).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExportData {
    Rows(Vec<Value>),
    Document(Value),
}

impl ExportData {
    pub fn record_count(&self) -> usize {
        match self {
            ExportData::Rows(rows) => rows.len(),
            ExportData::Document(_) => 1,
        }
    }
}

/// A fully materialized export, stored verbatim and replayed on download.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub export_id: Uuid,
    pub export_type: ExportType,
    pub period: String,
    pub format: ExportFormat,
    pub filters: BTreeMap<String, String>,
    pub record_count: usize,
    pub generated_at: DateTime<Utc>,
    pub generated_by: Option<Uuid>,
    pub data: ExportData,
}

pub struct ExportSpooler {
    provider: CacheProvider,
    ttl: Duration,
}

impl ExportSpooler {
    pub fn new(provider: CacheProvider, ttl: Duration) -> Self {
        Self { provider, ttl }
    }

    /// Persist an export record. Unlike report caching this write is not
    /// best-effort: an unstored export would hand out a download id that can
    /// never resolve, so storage failures propagate.
    #[instrument(skip(self, record), fields(export_id = %record.export_id, export_type = %record.export_type))]
    pub async fn store(&self, record: &ExportRecord) -> Result<(), CoreError> {
        let key = cache_key::export_key(&record.export_id);
        let payload = serde_json::to_string(record)?;
        self.provider.set(&key, &payload, self.ttl).await?;
        debug!(
            records = record.record_count,
            ttl_seconds = self.ttl.as_secs(),
            "export spooled"
        );
        Ok(())
    }

    /// Fetch a spooled export. `None` means unknown or expired; callers
    /// cannot tell the two apart.
    pub async fn load(&self, export_id: &Uuid) -> Result<Option<ExportRecord>, CoreError> {
        let key = cache_key::export_key(export_id);
        match self.provider.get(&key).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}

/// Render a dataset as CSV. Headers are the sorted union of every row's
/// flattened paths; a row missing a column emits an empty cell.
pub fn render_csv(data: &ExportData) -> Result<String, CoreError> {
    let rows: Vec<BTreeMap<String, String>> = match data {
        ExportData::Rows(rows) => rows.iter().map(flatten_row).collect(),
        ExportData::Document(doc) => vec![flatten_row(doc)],
    };

    let mut headers: Vec<&str> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }
    headers.sort_unstable();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&headers)
        .map_err(|e| CoreError::Export(format!("csv header write failed: {e}")))?;
    for row in &rows {
        let record: Vec<&str> = headers
            .iter()
            .map(|h| row.get(*h).map(String::as_str).unwrap_or(""))
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| CoreError::Export(format!("csv row write failed: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CoreError::Export(format!("csv flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| CoreError::Export(format!("csv not utf-8: {e}")))
}

fn flatten_row(value: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(&mut out, "", value);
    out
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(out, &path, child);
            }
        }
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(scalar_text)
                .collect::<Vec<_>>()
                .join("; ");
            out.insert(prefix.to_string(), joined);
        }
        other => {
            out.insert(prefix.to_string(), scalar_text(other));
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn export_type_parses_the_allow_list_only() {
        assert_eq!("students".parse::<ExportType>().unwrap(), ExportType::Students);
        assert_eq!("dashboard".parse::<ExportType>().unwrap(), ExportType::Dashboard);
        assert!(matches!(
            "payments".parse::<ExportType>(),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            "Users".parse::<ExportType>(),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn export_format_defaults_to_json() {
        assert_eq!(ExportFormat::default(), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn csv_flattens_nested_objects_with_dot_paths() {
        let data = ExportData::Rows(vec![json!({
            "user": {"name": "Ada", "stats": {"score": 91.5}},
            "active": true,
        })]);
        let csv = render_csv(&data).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "active,user.name,user.stats.score");
        assert_eq!(lines.next().unwrap(), "true,Ada,91.5");
    }

    #[test]
    fn csv_joins_arrays_and_quotes_delimiters() {
        let data = ExportData::Rows(vec![json!({
            "title": "Intro, Part 1",
            "tags": ["rust", "async"],
            "note": "he said \"hi\"",
        })]);
        let csv = render_csv(&data).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "note,tags,title");
        assert_eq!(
            lines.next().unwrap(),
            "\"he said \"\"hi\"\"\",rust; async,\"Intro, Part 1\""
        );
    }

    #[test]
    fn csv_quotes_fields_with_embedded_newlines() {
        let data = ExportData::Rows(vec![json!({
            "note": "line1\nline2, with \"quote\"",
        })]);
        let csv = render_csv(&data).unwrap();
        // The field stays a single quoted cell: internal quotes doubled,
        // the newline preserved inside the quotes.
        assert_eq!(csv, "note\n\"line1\nline2, with \"\"quote\"\"\"\n");
    }

    #[test]
    fn csv_unions_headers_across_uneven_rows() {
        let data = ExportData::Rows(vec![
            json!({"a": 1, "b": 2}),
            json!({"a": 3, "c": 4}),
        ]);
        let csv = render_csv(&data).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "a,b,c");
        assert_eq!(lines.next().unwrap(), "1,2,");
        assert_eq!(lines.next().unwrap(), "3,,4");
    }

    #[test]
    fn document_exports_as_a_single_row() {
        let data = ExportData::Document(json!({"summary": {"totalUsers": 42}}));
        assert_eq!(data.record_count(), 1);
        let csv = render_csv(&data).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn null_values_render_empty() {
        let data = ExportData::Rows(vec![json!({"email": null, "name": "Bo"})]);
        let csv = render_csv(&data).unwrap();
        assert_eq!(csv.lines().nth(1).unwrap(), ",Bo");
    }

    #[tokio::test]
    async fn store_then_load_round_trips_the_record() {
        let spooler = ExportSpooler::new(
            CacheProvider::in_memory(64, Duration::from_secs(60)),
            Duration::from_secs(60),
        );
        let record = ExportRecord {
            export_id: Uuid::new_v4(),
            export_type: ExportType::Revenue,
            period: "30d".to_string(),
            format: ExportFormat::Csv,
            filters: BTreeMap::new(),
            record_count: 2,
            generated_at: Utc::now(),
            generated_by: None,
            data: ExportData::Rows(vec![json!({"revenue": 10.0}), json!({"revenue": 20.0})]),
        };

        spooler.store(&record).await.unwrap();
        let loaded = spooler.load(&record.export_id).await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn load_of_unknown_id_is_a_miss() {
        let spooler = ExportSpooler::new(
            CacheProvider::in_memory(64, Duration::from_secs(60)),
            Duration::from_secs(60),
        );
        assert!(spooler.load(&Uuid::new_v4()).await.unwrap().is_none());
    }
}
