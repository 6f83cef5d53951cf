//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One unit of change (e.g. a ticket) introduced by a release.
///
/// The identifier is opaque; equality is by identifier only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeItem(String);

impl ChangeItem {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChangeItem {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ChangeItem {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Descriptive metadata of a change-item, kept by the store.
///
/// Details are shared across releases and replaced as a whole when a
/// release carrying the same id is submitted again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDetail {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub relnotes: String,
}

impl ChangeDetail {
    /// A detail record carrying only the id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl From<&str> for ChangeDetail {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Distinct change domains and impacts of one platform, for narrowing diffs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub domains: Vec<String>,
    pub impacts: Vec<String>,
}

/// Raw data for a single release node handed to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInput {
    /// Version identifier, unique across all platforms
    pub version: String,
    /// Parent version; empty string means "no parent" (root)
    pub parent: String,
    /// Change-items introduced by this release
    pub changes: Vec<ChangeItem>,
}

impl ReleaseInput {
    pub fn new<I, C>(version: impl Into<String>, parent: impl Into<String>, changes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ChangeItem>,
    {
        Self {
            version: version.into(),
            parent: parent.into(),
            changes: changes.into_iter().map(Into::into).collect(),
        }
    }

    /// A release without a parent.
    pub fn root<I, C>(version: impl Into<String>, changes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ChangeItem>,
    {
        Self::new(version, "", changes)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_empty()
    }
}

/// A release as kept by the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub version: String,
    #[serde(default)]
    pub from_ver: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub submitted_by: String,
    #[serde(default)]
    pub changes: Vec<String>,
}

impl ReleaseRecord {
    /// Tree input for this record (defensive copy of the change ids).
    pub fn to_input(&self) -> ReleaseInput {
        ReleaseInput::new(
            self.version.clone(),
            self.from_ver.clone(),
            self.changes.iter().map(String::as_str),
        )
    }
}

/// How `calc_changes` treats change-items found only on the start path.
///
/// `Strict` assumes an append-only change model: every change on the start
/// path must also be reachable from the end path, otherwise the diff fails.
/// `Subtract` drops such items silently (plain set difference), which suits
/// histories with cherry-picks or reverts across branches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangePolicy {
    #[default]
    Strict,
    Subtract,
}

impl fmt::Display for ChangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangePolicy::Strict => f.write_str("strict"),
            ChangePolicy::Subtract => f.write_str("subtract"),
        }
    }
}

impl FromStr for ChangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ChangePolicy::Strict),
            "subtract" => Ok(ChangePolicy::Subtract),
            other => Err(format!(
                "unknown change policy '{other}' (expected 'strict' or 'subtract')"
            )),
        }
    }
}

/// A single node in a tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub version: String,
    pub from_ver: String,
    pub changes: Vec<String>,
    pub children: Vec<String>,
}

/// Point-in-time snapshot of one release tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDump {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub platform: String,
    pub node_count: usize,
    pub root: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
    pub nodes: Vec<NodeInfo>,
}

impl TreeDump {
    pub fn node(&self, version: &str) -> Option<&NodeInfo> {
        self.nodes.iter().find(|n| n.version == version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_policy_names_when_parsing_then_accepts_any_case() {
        assert_eq!("strict".parse::<ChangePolicy>(), Ok(ChangePolicy::Strict));
        assert_eq!(" Subtract ".parse::<ChangePolicy>(), Ok(ChangePolicy::Subtract));
        assert!("lenient".parse::<ChangePolicy>().is_err());
    }

    #[test]
    fn given_record_when_converting_to_input_then_copies_fields() {
        let record = ReleaseRecord {
            version: "22".into(),
            from_ver: "21".into(),
            platform: "android".into(),
            release_date: None,
            submitted_by: "ci".into(),
            changes: vec!["5".into()],
        };

        let input = record.to_input();

        assert_eq!(input, ReleaseInput::new("22", "21", ["5"]));
        assert!(!input.is_root());
    }
}
