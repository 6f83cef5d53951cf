//! Release use cases
//!
//! Keeps the authoritative store and the in-memory trees in step: every
//! store write is followed by an incremental insert or a platform rebuild.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::application::error_ext::IoResultExt;
use crate::application::services::tree_manager::{
    LoadSummary, RebuildOutcome, TreeManager, TreeStats,
};
use crate::application::{ApplicationError, ApplicationResult, ValidationDetail};
use crate::domain::{
    ChangeDetail, ChangePolicy, DomainError, Filters, ReleaseInput, ReleaseRecord, TreeBuilder,
};
use crate::infrastructure::traits::ReleaseStore;

/// A release as submitted by a user or CI job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSubmission {
    pub version: String,
    /// Parent version, empty for a root release
    pub from_ver: String,
    pub platform: String,
    pub release_date: Option<NaiveDate>,
    pub submitted_by: String,
    pub changes: Vec<ChangeDetail>,
}

impl ReleaseSubmission {
    fn validate(&self) -> ApplicationResult<()> {
        let mut details = Vec::new();
        if self.version.trim().is_empty() {
            details.push(ValidationDetail {
                index: None,
                id: String::new(),
                reason: "release version is required".to_string(),
            });
        }
        if self.platform.trim().is_empty() {
            details.push(ValidationDetail {
                index: None,
                id: String::new(),
                reason: "release platform is required".to_string(),
            });
        }
        if !self.version.is_empty() && self.version == self.from_ver {
            details.push(ValidationDetail {
                index: None,
                id: self.version.clone(),
                reason: "release cannot be its own parent".to_string(),
            });
        }
        for (i, change) in self.changes.iter().enumerate() {
            if change.id.trim().is_empty() {
                details.push(ValidationDetail {
                    index: Some(i),
                    id: change.id.clone(),
                    reason: "change id is required".to_string(),
                });
            }
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(ApplicationError::Validation { details })
        }
    }

    /// Split into the release record and the change metadata to store.
    fn into_parts(self) -> (ReleaseRecord, Vec<ChangeDetail>) {
        let record = ReleaseRecord {
            version: self.version,
            from_ver: self.from_ver,
            platform: self.platform,
            release_date: self.release_date,
            submitted_by: self.submitted_by,
            changes: self.changes.iter().map(|c| c.id.clone()).collect(),
        };
        (record, self.changes)
    }
}

/// Sorted distinct values, empty strings dropped.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// State of a platform tree after a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildStatus {
    Rebuilt(TreeStats),
    /// The deleted release was the last one of its platform.
    Removed,
    /// The rebuild failed; the previous tree is kept and marked stale.
    Stale(String),
}

/// Service for submitting, deleting and diffing releases.
pub struct ReleaseService {
    store: Arc<dyn ReleaseStore>,
    trees: Arc<TreeManager>,
    policy: ChangePolicy,
}

impl ReleaseService {
    pub fn new(store: Arc<dyn ReleaseStore>, trees: Arc<TreeManager>) -> Self {
        Self {
            store,
            trees,
            policy: ChangePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ChangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ChangePolicy {
        self.policy
    }

    pub fn trees(&self) -> &TreeManager {
        &self.trees
    }

    /// Build the trees of every platform in the store.
    pub fn load(&self) -> ApplicationResult<LoadSummary> {
        self.trees.load_all(&*self.store)
    }

    fn require(&self, version: &str) -> ApplicationResult<ReleaseRecord> {
        self.store
            .get(version)
            .with_context("read release", version)?
            .ok_or_else(|| ApplicationError::NotFound(version.to_string()))
    }

    /// Check that the parent exists on the submitted platform.
    fn check_parent(&self, sub: &ReleaseSubmission) -> ApplicationResult<()> {
        if sub.from_ver.is_empty() {
            return Ok(());
        }
        let parent = self
            .store
            .get(&sub.from_ver)
            .with_context("read release", &sub.from_ver)?
            .ok_or_else(|| {
                ApplicationError::tree(
                    &sub.platform,
                    DomainError::ParentNotFound {
                        version: sub.version.clone(),
                        parent: sub.from_ver.clone(),
                    },
                )
            })?;
        if parent.platform != sub.platform {
            return Err(ApplicationError::CrossPlatform {
                a: sub.version.clone(),
                a_platform: sub.platform.clone(),
                b: parent.version,
                b_platform: parent.platform,
            });
        }
        Ok(())
    }

    /// Build every platform the write touches as it would look afterwards.
    ///
    /// Catches a second root, a release moved below its own descendant, a
    /// root given a parent, and children orphaned by a platform move.
    fn check_lineage(
        &self,
        record: &ReleaseRecord,
        previous: Option<&ReleaseRecord>,
    ) -> ApplicationResult<()> {
        let mut releases = self
            .store
            .releases(&record.platform)
            .with_context("read releases", &record.platform)?;
        match releases.iter_mut().find(|r| r.version == record.version) {
            Some(slot) => *slot = record.clone(),
            None => releases.push(record.clone()),
        }
        let inputs: Vec<ReleaseInput> = releases.iter().map(ReleaseRecord::to_input).collect();
        TreeBuilder::new()
            .build(&inputs)
            .map_err(|e| ApplicationError::tree(&record.platform, e))?;

        if let Some(prev) = previous.filter(|p| p.platform != record.platform) {
            let remaining: Vec<ReleaseInput> = self
                .store
                .releases(&prev.platform)
                .with_context("read releases", &prev.platform)?
                .iter()
                .filter(|r| r.version != prev.version)
                .map(ReleaseRecord::to_input)
                .collect();
            TreeBuilder::new()
                .build(&remaining)
                .map_err(|e| ApplicationError::tree(&prev.platform, e))?;
        }
        Ok(())
    }

    fn rebuilt_stats(&self, platform: &str) -> ApplicationResult<TreeStats> {
        match self.trees.rebuild(platform, &*self.store)? {
            RebuildOutcome::Built(stats) => Ok(stats),
            RebuildOutcome::Removed => Err(ApplicationError::NoTree(platform.to_string())),
        }
    }

    /// Validate and store a release, then bring its platform tree up to date.
    ///
    /// The resulting lineage is checked before anything is written, so a
    /// rejected submission leaves store and trees untouched. A new version is
    /// inserted incrementally into a loaded tree; a re-submission (or a
    /// platform without a loaded tree) triggers a rebuild.
    #[instrument(level = "debug", skip(self, sub), fields(version = %sub.version, platform = %sub.platform))]
    pub fn submit(&self, sub: ReleaseSubmission) -> ApplicationResult<TreeStats> {
        sub.validate()?;
        self.check_parent(&sub)?;

        let (record, details) = sub.into_parts();
        let existing = self
            .store
            .get(&record.version)
            .with_context("read release", &record.version)?;
        self.check_lineage(&record, existing.as_ref())?;

        let input = record.to_input();
        let platform = record.platform.clone();
        let submitted_by = record.submitted_by.clone();
        let change_count = record.changes.len();

        self.store
            .upsert_changes(details)
            .with_context("store changes", &input.version)?;
        let previous = self
            .store
            .upsert(record)
            .with_context("store release", &input.version)?;

        let stats = match previous {
            None if self.trees.tree(&platform).is_some() => {
                match self.trees.insert(&platform, &input) {
                    Ok(stats) => stats,
                    Err(e) => {
                        warn!(error = %e, "incremental insert failed, rebuilding");
                        self.rebuilt_stats(&platform)?
                    }
                }
            }
            None => self.rebuilt_stats(&platform)?,
            Some(prev) => {
                if prev.platform != platform {
                    debug!(from = %prev.platform, to = %platform, "release moved platform");
                    if let Err(e) = self.trees.rebuild(&prev.platform, &*self.store) {
                        warn!(platform = %prev.platform, error = %e, "rebuild of previous platform failed");
                    }
                }
                self.rebuilt_stats(&platform)?
            }
        };

        info!(
            version = %input.version,
            submitted_by = %submitted_by,
            change_count,
            "release submitted"
        );
        Ok(stats)
    }

    /// Remove a release from the store and rebuild its platform.
    ///
    /// The store write is final; a failed rebuild is reported, not returned.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&self, version: &str) -> ApplicationResult<RebuildStatus> {
        let record = self.require(version)?;
        self.store
            .delete(version)
            .with_context("delete release", version)?;
        info!(version = %version, platform = %record.platform, "release deleted");

        let status = match self.trees.rebuild(&record.platform, &*self.store) {
            Ok(RebuildOutcome::Built(stats)) => RebuildStatus::Rebuilt(stats),
            Ok(RebuildOutcome::Removed) => RebuildStatus::Removed,
            Err(e) => {
                warn!(platform = %record.platform, error = %e, "tree is stale after delete");
                RebuildStatus::Stale(e.to_string())
            }
        };
        Ok(status)
    }

    pub fn release(&self, version: &str) -> ApplicationResult<ReleaseRecord> {
        self.require(version)
    }

    pub fn releases(&self, platform: &str) -> ApplicationResult<Vec<ReleaseRecord>> {
        self.store
            .releases(platform)
            .with_context("read releases", platform)
    }

    pub fn platforms(&self) -> ApplicationResult<Vec<String>> {
        self.store.platforms().with_context("list", "platforms")
    }

    /// Change-items in `end` but not in `start`, with the configured policy.
    ///
    /// Both versions must exist and belong to the same platform. Items come
    /// in output order, each with its stored metadata (id only if none).
    pub fn changes_between(&self, end: &str, start: &str) -> ApplicationResult<Vec<ChangeDetail>> {
        self.changes_between_with(end, start, self.policy)
    }

    pub fn changes_between_with(
        &self,
        end: &str,
        start: &str,
        policy: ChangePolicy,
    ) -> ApplicationResult<Vec<ChangeDetail>> {
        let end_rel = self.require(end)?;
        let start_rel = self.require(start)?;
        if end_rel.platform != start_rel.platform {
            return Err(ApplicationError::CrossPlatform {
                a: end.to_string(),
                a_platform: end_rel.platform,
                b: start.to_string(),
                b_platform: start_rel.platform,
            });
        }
        let ids: Vec<String> = self
            .trees
            .calc_changes_with(&end_rel.platform, end, start, policy)?
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        self.details(ids)
    }

    fn details(&self, ids: Vec<String>) -> ApplicationResult<Vec<ChangeDetail>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut known: HashMap<String, ChangeDetail> = self
            .store
            .change_details(&ids)
            .with_context("read changes", "details")?
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        Ok(ids
            .into_iter()
            .map(|id| known.remove(&id).unwrap_or_else(|| ChangeDetail::new(id)))
            .collect())
    }

    /// Distinct non-empty domains and impacts of the changes shipped on a platform.
    pub fn filters(&self, platform: &str) -> ApplicationResult<Filters> {
        let ids: BTreeSet<String> = self
            .releases(platform)?
            .into_iter()
            .flat_map(|r| r.changes)
            .collect();
        let ids: Vec<String> = ids.into_iter().collect();
        let details = self
            .store
            .change_details(&ids)
            .with_context("read changes", platform)?;

        Ok(Filters {
            domains: distinct(details.iter().map(|d| d.domain.as_str())),
            impacts: distinct(details.iter().map(|d| d.impact.as_str())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_blank_fields_when_validating_then_collects_every_detail() {
        let sub = ReleaseSubmission {
            changes: vec!["1".into(), "".into(), " ".into()],
            ..Default::default()
        };

        let err = sub.validate().unwrap_err();

        let ApplicationError::Validation { details } = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(details.len(), 4);
        assert_eq!(details[0].reason, "release version is required");
        assert_eq!(details[1].reason, "release platform is required");
        assert_eq!(details[2].index, Some(1));
        assert_eq!(details[3].index, Some(2));
    }

    #[test]
    fn given_self_parent_when_validating_then_rejects() {
        let sub = ReleaseSubmission {
            version: "21".into(),
            from_ver: "21".into(),
            platform: "android".into(),
            ..Default::default()
        };

        assert!(matches!(
            sub.validate(),
            Err(ApplicationError::Validation { .. })
        ));
    }
}
