//! TOML file catalog: the authoritative release store used by the CLI.
//!
//! ```toml
//! [[release]]
//! version = "21"
//! from_ver = "11"
//! platform = "android"
//! release_date = "2026-01-01"
//! submitted_by = "ci"
//! changes = ["1"]
//!
//! [[change]]
//! id = "1"
//! title = "Fix crash on resume"
//! domain = "player"
//! impact = "high"
//! relnotes = "Playback resumes reliably after backgrounding."
//! ```
//!
//! `[[change]]` tables are optional; a change id without one is reported
//! with its id only.

use std::io::{self, Write};
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::{ChangeDetail, ReleaseRecord};
use crate::infrastructure::traits::{
    details_for, platforms_of, remove_from, upsert_details_into, upsert_into, ReleaseSource,
    ReleaseStore,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "release")]
    releases: Vec<ReleaseRecord>,
    #[serde(default, rename = "change", skip_serializing_if = "Vec::is_empty")]
    changes: Vec<ChangeDetail>,
}

/// File-backed release store. A missing file is an empty catalog.
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_file(&self) -> io::Result<CatalogFile> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CatalogFile::default()),
            Err(e) => return Err(e),
        };
        toml::from_str(&content).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("parse catalog {}: {}", self.path.display(), e),
            )
        })
    }

    fn read_all(&self) -> io::Result<Vec<ReleaseRecord>> {
        Ok(self.read_file()?.releases)
    }

    /// Write the catalog through a temp file in the same directory, then rename.
    fn write_file(&self, file: &CatalogFile) -> io::Result<()> {
        let content = toml::to_string_pretty(file)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!("catalog written: {}", self.path.display());
        Ok(())
    }

    /// Read-modify-write; `f` reports whether the catalog changed.
    fn modify<T>(&self, f: impl FnOnce(&mut CatalogFile) -> (T, bool)) -> io::Result<T> {
        let _guard = self.write_lock.lock();
        let mut file = self.read_file()?;
        let (result, changed) = f(&mut file);
        if changed {
            self.write_file(&file)?;
        }
        Ok(result)
    }
}

impl ReleaseSource for CatalogStore {
    fn platforms(&self) -> io::Result<Vec<String>> {
        Ok(platforms_of(self.read_all()?.iter()))
    }

    fn releases(&self, platform: &str) -> io::Result<Vec<ReleaseRecord>> {
        let mut releases = self.read_all()?;
        releases.retain(|r| r.platform == platform);
        Ok(releases)
    }
}

impl ReleaseStore for CatalogStore {
    fn get(&self, version: &str) -> io::Result<Option<ReleaseRecord>> {
        Ok(self.read_all()?.into_iter().find(|r| r.version == version))
    }

    fn upsert(&self, record: ReleaseRecord) -> io::Result<Option<ReleaseRecord>> {
        self.modify(|file| (upsert_into(&mut file.releases, record), true))
    }

    fn delete(&self, version: &str) -> io::Result<Option<ReleaseRecord>> {
        self.modify(|file| {
            let removed = remove_from(&mut file.releases, version);
            let changed = removed.is_some();
            (removed, changed)
        })
    }

    fn change_details(&self, ids: &[String]) -> io::Result<Vec<ChangeDetail>> {
        Ok(details_for(&self.read_file()?.changes, ids))
    }

    fn upsert_changes(&self, details: Vec<ChangeDetail>) -> io::Result<()> {
        if details.is_empty() {
            return Ok(());
        }
        self.modify(|file| {
            upsert_details_into(&mut file.changes, details);
            ((), true)
        })
    }
}
