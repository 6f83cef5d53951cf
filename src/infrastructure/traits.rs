//! Store boundary traits for testability
//!
//! The tree core never persists anything itself. These traits abstract the
//! authoritative release store, allowing services to be tested with the
//! in-memory implementation.

use std::io;

use crate::domain::{ChangeDetail, ReleaseRecord};

/// Read side of the authoritative release store.
pub trait ReleaseSource: Send + Sync {
    /// All platforms that have at least one release, sorted.
    fn platforms(&self) -> io::Result<Vec<String>>;

    /// Every release of a platform, in store order.
    fn releases(&self, platform: &str) -> io::Result<Vec<ReleaseRecord>>;
}

/// Read/write release store.
pub trait ReleaseStore: ReleaseSource {
    /// Look up a release by version (versions are unique across platforms).
    fn get(&self, version: &str) -> io::Result<Option<ReleaseRecord>>;

    /// Insert a release or replace the one with the same version.
    ///
    /// Returns the replaced record, if any.
    fn upsert(&self, record: ReleaseRecord) -> io::Result<Option<ReleaseRecord>>;

    /// Remove a release. Returns the removed record, if any.
    fn delete(&self, version: &str) -> io::Result<Option<ReleaseRecord>>;

    /// Stored metadata for `ids`; ids without details are skipped.
    fn change_details(&self, ids: &[String]) -> io::Result<Vec<ChangeDetail>>;

    /// Insert change metadata or replace the entries with the same id.
    fn upsert_changes(&self, details: Vec<ChangeDetail>) -> io::Result<()>;
}

/// Platform names of `records`, sorted and deduplicated.
pub(crate) fn platforms_of<'a>(records: impl IntoIterator<Item = &'a ReleaseRecord>) -> Vec<String> {
    let mut platforms: Vec<String> = records.into_iter().map(|r| r.platform.clone()).collect();
    platforms.sort();
    platforms.dedup();
    platforms
}

/// Apply an upsert to an ordered record list, keeping the position of a replaced record.
pub(crate) fn upsert_into(records: &mut Vec<ReleaseRecord>, record: ReleaseRecord) -> Option<ReleaseRecord> {
    match records.iter_mut().find(|r| r.version == record.version) {
        Some(slot) => Some(std::mem::replace(slot, record)),
        None => {
            records.push(record);
            None
        }
    }
}

pub(crate) fn remove_from(records: &mut Vec<ReleaseRecord>, version: &str) -> Option<ReleaseRecord> {
    let pos = records.iter().position(|r| r.version == version)?;
    Some(records.remove(pos))
}

pub(crate) fn upsert_details_into(existing: &mut Vec<ChangeDetail>, details: Vec<ChangeDetail>) {
    for detail in details {
        match existing.iter_mut().find(|d| d.id == detail.id) {
            Some(slot) => *slot = detail,
            None => existing.push(detail),
        }
    }
}

pub(crate) fn details_for(existing: &[ChangeDetail], ids: &[String]) -> Vec<ChangeDetail> {
    existing
        .iter()
        .filter(|d| ids.contains(&d.id))
        .cloned()
        .collect()
}
