//! Integration tests for the export spool lifecycle: store, download, expiry,
//! and CSV rendering of spooled datasets.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use coursedash_core::analytics::export::render_csv;
use coursedash_core::analytics::{
    ExportData, ExportFormat, ExportRecord, ExportSpooler, ExportType,
};
use coursedash_core::cache::CacheProvider;

fn spooler(ttl: Duration) -> ExportSpooler {
    ExportSpooler::new(CacheProvider::in_memory(64, Duration::from_secs(3600)), ttl)
}

fn sample_record(data: ExportData) -> ExportRecord {
    ExportRecord {
        export_id: Uuid::new_v4(),
        export_type: ExportType::Courses,
        period: "30d".to_string(),
        format: ExportFormat::Json,
        filters: BTreeMap::new(),
        record_count: data.record_count(),
        generated_at: Utc::now(),
        generated_by: None,
        data,
    }
}

#[tokio::test]
async fn stored_export_replays_verbatim() {
    let spooler = spooler(Duration::from_secs(60));
    let record = sample_record(ExportData::Rows(vec![
        json!({"courseId": Uuid::new_v4(), "title": "Rust 101", "enrollments": 12}),
        json!({"courseId": Uuid::new_v4(), "title": "Async in Depth", "enrollments": 4}),
    ]));

    spooler.store(&record).await.unwrap();

    let loaded = spooler.load(&record.export_id).await.unwrap().unwrap();
    assert_eq!(loaded, record);
    assert_eq!(loaded.record_count, 2);
}

#[tokio::test]
async fn expired_export_is_indistinguishable_from_unknown() {
    let spooler = spooler(Duration::from_secs(0));
    let record = sample_record(ExportData::Rows(vec![json!({"a": 1})]));

    spooler.store(&record).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(spooler.load(&record.export_id).await.unwrap().is_none());
    assert!(spooler.load(&Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn spooled_rows_render_as_csv() {
    let spooler = spooler(Duration::from_secs(60));
    let record = sample_record(ExportData::Rows(vec![
        json!({"title": "Intro, Part 1", "stats": {"enrollments": 10}}),
        json!({"title": "Part 2", "stats": {"enrollments": 3}}),
    ]));

    spooler.store(&record).await.unwrap();
    let loaded = spooler.load(&record.export_id).await.unwrap().unwrap();

    let csv = render_csv(&loaded.data).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next().unwrap(), "stats.enrollments,title");
    assert_eq!(lines.next().unwrap(), "10,\"Intro, Part 1\"");
    assert_eq!(lines.next().unwrap(), "3,Part 2");
}

#[tokio::test]
async fn document_dataset_counts_as_one_record() {
    let spooler = spooler(Duration::from_secs(60));
    let record = sample_record(ExportData::Document(json!({
        "summary": {"totalUsers": 9},
        "period": "30d",
    })));

    spooler.store(&record).await.unwrap();
    let loaded = spooler.load(&record.export_id).await.unwrap().unwrap();
    assert_eq!(loaded.record_count, 1);
}
