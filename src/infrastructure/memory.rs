//! In-memory release store.

use std::io;

use parking_lot::RwLock;

use crate::domain::{ChangeDetail, ReleaseRecord};
use crate::infrastructure::traits::{
    details_for, platforms_of, remove_from, upsert_details_into, upsert_into, ReleaseSource,
    ReleaseStore,
};

/// Release store kept in process memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<ReleaseRecord>>,
    details: RwLock<Vec<ChangeDetail>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ReleaseRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
            details: RwLock::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl ReleaseSource for InMemoryStore {
    fn platforms(&self) -> io::Result<Vec<String>> {
        Ok(platforms_of(self.records.read().iter()))
    }

    fn releases(&self, platform: &str) -> io::Result<Vec<ReleaseRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.platform == platform)
            .cloned()
            .collect())
    }
}

impl ReleaseStore for InMemoryStore {
    fn get(&self, version: &str) -> io::Result<Option<ReleaseRecord>> {
        Ok(self.records.read().iter().find(|r| r.version == version).cloned())
    }

    fn upsert(&self, record: ReleaseRecord) -> io::Result<Option<ReleaseRecord>> {
        Ok(upsert_into(&mut self.records.write(), record))
    }

    fn delete(&self, version: &str) -> io::Result<Option<ReleaseRecord>> {
        Ok(remove_from(&mut self.records.write(), version))
    }

    fn change_details(&self, ids: &[String]) -> io::Result<Vec<ChangeDetail>> {
        Ok(details_for(&self.details.read(), ids))
    }

    fn upsert_changes(&self, details: Vec<ChangeDetail>) -> io::Result<()> {
        upsert_details_into(&mut self.details.write(), details);
        Ok(())
    }
}
