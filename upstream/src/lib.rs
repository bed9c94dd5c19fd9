//! Contract between the event-broadcast core and the upstream data source.
//!
//! The `sse` crate polls watched repositories through the [`ResourceSource`]
//! trait and the `domain` crate implements it against the GitHub REST API.
//! Keeping the contract here means neither crate depends on the other.
//!
//! # Types
//!
//! - **RepoKey**: identifies a watched repository as `(owner, name)`
//! - **RepoSnapshot**: the fields fetched on every poll and used for change detection
//! - **ResourceSource**: async fetch of the current snapshot for a key

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

pub mod error;

pub use error::{Error, ErrorKind};

/// Identifies one watched repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoKey {
    owner: String,
    name: String,
}

impl RepoKey {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name`, the form GitHub uses for `full_name`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Last successfully fetched state of a repository.
///
/// Only the counters take part in change detection; `full_name` is carried
/// along so update events can name the repository the way upstream does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoSnapshot {
    pub full_name: String,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub watchers: u64,
}

impl RepoSnapshot {
    /// Names of the tracked counters that differ from `previous`, in a fixed order.
    pub fn changed_fields(&self, previous: &RepoSnapshot) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.stars != previous.stars {
            changed.push("stars");
        }
        if self.forks != previous.forks {
            changed.push("forks");
        }
        if self.open_issues != previous.open_issues {
            changed.push("open_issues");
        }
        if self.watchers != previous.watchers {
            changed.push("watchers");
        }
        changed
    }
}

/// Fetches the current state of a watched repository.
///
/// Implementations should not apply their own retry loops: the poller calls
/// again on its next tick and reports each failure to subscribers.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch_repository(&self, key: &RepoKey) -> Result<RepoSnapshot, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(stars: u64, forks: u64) -> RepoSnapshot {
        RepoSnapshot {
            full_name: "acme/widget".to_string(),
            stars,
            forks,
            open_issues: 3,
            watchers: 7,
        }
    }

    #[test]
    fn test_repo_key_display_matches_full_name() {
        let key = RepoKey::new("acme", "widget");
        assert_eq!(key.to_string(), "acme/widget");
        assert_eq!(key.full_name(), "acme/widget");
        assert_eq!(key.owner(), "acme");
        assert_eq!(key.name(), "widget");
    }

    #[test]
    fn test_changed_fields_empty_for_identical_snapshots() {
        assert!(snapshot(10, 2).changed_fields(&snapshot(10, 2)).is_empty());
    }

    #[test]
    fn test_changed_fields_reports_each_counter_in_order() {
        let previous = snapshot(10, 2);
        let mut current = snapshot(11, 3);
        current.watchers = 8;

        assert_eq!(
            current.changed_fields(&previous),
            vec!["stars", "forks", "watchers"]
        );
    }

    #[test]
    fn test_changed_fields_ignores_full_name() {
        let previous = snapshot(10, 2);
        let mut renamed = snapshot(10, 2);
        renamed.full_name = "acme/gadget".to_string();

        assert!(renamed.changed_fields(&previous).is_empty());
    }
}
