//! Snapshot selection
//!
//! A snapshot is one versioned descriptor set stored under a namespace/name pair.
//! Callers pick one with a version string, the `--latest` flag, or a free-text
//! channel. This module turns those raw selectors into a single [`SnapshotIdentity`].

use crate::constants::LATEST_CHANNEL;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::fmt;

/// Raw selectors as supplied by the caller, before any validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotQuery {
    pub namespace: String,
    pub name: String,
    pub version: Option<String>,
    pub channel: Option<String>,
    pub latest: bool,
}

/// Which snapshot of a namespace/name pair an identity points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// An exact version tag
    Version(String),
    /// Whatever snapshot is currently marked latest
    Latest,
    /// No constraint; only meaningful when filtering a listing
    Unconstrained,
}

/// Resolved, unambiguous snapshot target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotIdentity {
    pub namespace: String,
    pub name: String,
    pub selector: Selector,
}

impl SnapshotIdentity {
    pub fn version(&self) -> Option<&str> {
        match &self.selector {
            Selector::Version(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_latest(&self) -> bool {
        self.selector == Selector::Latest
    }
}

impl fmt::Display for SnapshotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Selector::Version(v) => write!(f, "{}/{}@{}", self.namespace, self.name, v),
            Selector::Latest => write!(f, "{}/{}@{}", self.namespace, self.name, LATEST_CHANNEL),
            Selector::Unconstrained => write!(f, "{}/{}", self.namespace, self.name),
        }
    }
}

/// Three-valued "is this the latest snapshot" answer.
///
/// `Unknown` is distinct from `False`: a filter built from `Unknown` must not
/// exclude snapshots whose latest status was never asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatestStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl LatestStatus {
    /// Tri-state reading of a free-text channel
    pub fn from_channel(channel: &str) -> Self {
        if channel.is_empty() {
            LatestStatus::Unknown
        } else if channel == LATEST_CHANNEL {
            LatestStatus::True
        } else {
            LatestStatus::False
        }
    }

    /// `None` when unknown, so callers have to handle that branch explicitly
    pub fn known(self) -> Option<bool> {
        match self {
            LatestStatus::True => Some(true),
            LatestStatus::False => Some(false),
            LatestStatus::Unknown => None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl SnapshotQuery {
    /// Resolve the raw selectors into one identity.
    ///
    /// A version string equal to `latest` is treated exactly like the latest flag.
    /// That alias is kept for older callers and takes precedence over any channel.
    pub fn resolve(&self) -> Result<SnapshotIdentity> {
        let version = non_empty(&self.version);
        if self.latest && version.is_some() {
            return Err(Error::ConflictingSelector);
        }
        if !self.latest && version.is_none() {
            return Err(Error::MissingSelector);
        }

        let selector = match version {
            _ if self.latest => Selector::Latest,
            Some(LATEST_CHANNEL) => Selector::Latest,
            Some(v) => Selector::Version(v.to_string()),
            None => Selector::Unconstrained,
        };

        Ok(SnapshotIdentity {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            selector,
        })
    }

    /// Latest status for read paths that only carry a channel string.
    ///
    /// The `latest` version alias applies here too.
    pub fn latest_status(&self) -> LatestStatus {
        if non_empty(&self.version) == Some(LATEST_CHANNEL) {
            return LatestStatus::True;
        }
        LatestStatus::from_channel(self.channel.as_deref().unwrap_or_default())
    }

    /// Listing filter equivalent to this query, without selector validation
    pub fn to_filter(&self) -> SnapshotFilter {
        let latest = self.latest_status();
        let version = match non_empty(&self.version) {
            Some(LATEST_CHANNEL) | None => None,
            Some(v) => Some(v.to_string()),
        };
        SnapshotFilter {
            namespace: Some(self.namespace.clone()).filter(|s| !s.is_empty()),
            name: Some(self.name.clone()).filter(|s| !s.is_empty()),
            version,
            latest,
        }
    }
}

/// Optional filters for listing snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub latest: LatestStatus,
}

/// Snapshot record as reported by the registry.
///
/// All fields are always serialized, including zero values; `id` is written as a
/// string the way protobuf JSON writes 64-bit integers.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub id: i64,
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub latest: bool,
}
