//! Tests for the TOML catalog store

use std::fs;

use chrono::NaiveDate;
use tempfile::TempDir;

use reltree::domain::{ChangeDetail, ReleaseRecord};
use reltree::infrastructure::traits::{ReleaseSource, ReleaseStore};
use reltree::infrastructure::CatalogStore;

fn record(version: &str, from_ver: &str, platform: &str, changes: &[&str]) -> ReleaseRecord {
    ReleaseRecord {
        version: version.to_string(),
        from_ver: from_ver.to_string(),
        platform: platform.to_string(),
        release_date: NaiveDate::from_ymd_opt(2026, 3, 1),
        submitted_by: "ci".to_string(),
        changes: changes.iter().map(|c| c.to_string()).collect(),
    }
}

#[test]
fn given_missing_file_when_reading_then_catalog_is_empty() {
    let temp = TempDir::new().unwrap();
    let store = CatalogStore::new(temp.path().join("catalog.toml"));

    assert!(store.platforms().unwrap().is_empty());
    assert!(store.releases("android").unwrap().is_empty());
    assert!(store.get("1").unwrap().is_none());
}

#[test]
fn given_upserts_when_reopened_then_records_persist_in_order() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("catalog.toml");
    let store = CatalogStore::new(&path);

    store.upsert(record("11", "", "android", &[])).unwrap();
    store.upsert(record("21", "11", "android", &["1"])).unwrap();
    store.upsert(record("5", "", "ios", &["I-1"])).unwrap();

    let reopened = CatalogStore::new(&path);
    let versions: Vec<String> = reopened
        .releases("android")
        .unwrap()
        .into_iter()
        .map(|r| r.version)
        .collect();
    assert_eq!(versions, ["11", "21"]);
    assert_eq!(reopened.platforms().unwrap(), ["android", "ios"]);
    assert_eq!(
        reopened.get("21").unwrap().and_then(|r| r.release_date),
        NaiveDate::from_ymd_opt(2026, 3, 1)
    );
}

#[test]
fn given_existing_version_when_upserting_then_replaces_in_place() {
    let temp = TempDir::new().unwrap();
    let store = CatalogStore::new(temp.path().join("catalog.toml"));
    store.upsert(record("11", "", "android", &[])).unwrap();
    store.upsert(record("21", "11", "android", &["1"])).unwrap();

    let previous = store
        .upsert(record("11", "", "android", &["0"]))
        .unwrap()
        .expect("replaced record");

    assert!(previous.changes.is_empty());
    let releases = store.releases("android").unwrap();
    assert_eq!(releases[0].version, "11");
    assert_eq!(releases[0].changes, ["0"]);
    assert_eq!(releases.len(), 2);
}

#[test]
fn given_record_when_deleted_then_returned_and_gone() {
    let temp = TempDir::new().unwrap();
    let store = CatalogStore::new(temp.path().join("catalog.toml"));
    store.upsert(record("11", "", "android", &["a"])).unwrap();

    let removed = store.delete("11").unwrap();

    assert_eq!(removed.map(|r| r.version), Some("11".to_string()));
    assert!(store.delete("11").unwrap().is_none());
    assert!(store.platforms().unwrap().is_empty());
}

#[test]
fn given_hand_written_catalog_when_reading_then_optional_fields_default() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("catalog.toml");
    fs::write(
        &path,
        r#"
[[release]]
version = "1.0"
platform = "web"

[[release]]
version = "1.1"
from_ver = "1.0"
platform = "web"
release_date = "2026-05-04"
changes = ["W-1", "W-2"]
"#,
    )
    .unwrap();
    let store = CatalogStore::new(&path);

    let releases = store.releases("web").unwrap();

    assert_eq!(releases.len(), 2);
    assert_eq!(releases[0].from_ver, "");
    assert!(releases[0].changes.is_empty());
    assert_eq!(releases[1].release_date, NaiveDate::from_ymd_opt(2026, 5, 4));
}

#[test]
fn given_malformed_catalog_when_reading_then_invalid_data_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("catalog.toml");
    fs::write(&path, "[[release]]\nversion = 1\n").unwrap();
    let store = CatalogStore::new(&path);

    let err = store.platforms().unwrap_err();

    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    assert!(err.to_string().contains("catalog.toml"));
}

#[test]
fn given_change_details_when_upserted_then_replaced_by_id_and_kept_beside_releases() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("catalog.toml");
    let store = CatalogStore::new(&path);
    store.upsert(record("11", "", "android", &["1", "2"])).unwrap();

    store
        .upsert_changes(vec![
            ChangeDetail {
                title: "Draft".into(),
                ..ChangeDetail::new("1")
            },
            ChangeDetail::new("2"),
        ])
        .unwrap();
    store
        .upsert_changes(vec![ChangeDetail {
            title: "Fix crash on resume".into(),
            impact: "high".into(),
            ..ChangeDetail::new("1")
        }])
        .unwrap();

    let reopened = CatalogStore::new(&path);
    let details = reopened
        .change_details(&["1".to_string(), "9".to_string()])
        .unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].title, "Fix crash on resume");
    assert_eq!(details[0].impact, "high");
    assert_eq!(reopened.releases("android").unwrap().len(), 1);
}
