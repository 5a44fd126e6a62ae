use crate::config::ClientConfig;
use crate::constants::LATEST_CHANNEL;
use crate::error::Error;
use crate::snapshot::{Selector, Snapshot, SnapshotFilter, SnapshotIdentity};
use anyhow::{anyhow, Result};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the registry's snapshot and descriptor endpoints
pub struct RegistryClient {
    pub base_url: Url,
    pub client: Client,
}

#[derive(Deserialize)]
struct ListSnapshotsResponse {
    #[serde(default)]
    snapshots: Vec<Snapshot>,
}

#[derive(Deserialize)]
struct PromoteSnapshotResponse {
    #[serde(default)]
    snapshot: Snapshot,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl RegistryClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&cfg.host)
            .map_err(|e| anyhow!("invalid registry host '{}': {e}", cfg.host))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("invalid registry host '{}'", cfg.host));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(RegistryClient { base_url, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL for downloading the descriptor set of a resolved snapshot
    pub fn get_download_url(
        &self,
        identity: &SnapshotIdentity,
        full_names: &[String],
    ) -> Result<Url> {
        let ns = identity.namespace.as_str();
        let name = identity.name.as_str();
        let mut url = match &identity.selector {
            Selector::Version(v) => self.endpoint(&[
                "v1",
                "namespaces",
                ns,
                "descriptors",
                name,
                "versions",
                v.as_str(),
            ]),
            Selector::Latest => self.endpoint(&[
                "v1",
                "namespaces",
                ns,
                "descriptors",
                name,
                "channels",
                LATEST_CHANNEL,
            ]),
            Selector::Unconstrained => return Err(Error::MissingSelector.into()),
        };
        if !full_names.is_empty() {
            let mut query = url.query_pairs_mut();
            for full_name in full_names {
                query.append_pair("fullnames", full_name);
            }
        }
        Ok(url)
    }

    /// URL for listing snapshots; an unknown latest status adds no filter
    pub fn get_list_url(&self, filter: &SnapshotFilter) -> Url {
        let mut url = self.endpoint(&["v1", "snapshots"]);
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(ns) = &filter.namespace {
            pairs.push(("namespace", ns.clone()));
        }
        if let Some(name) = &filter.name {
            pairs.push(("name", name.clone()));
        }
        if let Some(version) = &filter.version {
            pairs.push(("version", version.clone()));
        }
        if let Some(latest) = filter.latest.known() {
            pairs.push(("latest", latest.to_string()));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        url
    }

    /// Download the raw descriptor set bytes for a resolved snapshot
    pub async fn download_descriptor(
        &self,
        identity: &SnapshotIdentity,
        full_names: &[String],
    ) -> Result<bytes::Bytes> {
        let url = self.get_download_url(identity, full_names)?;
        debug!(%url, "downloading descriptor set");
        let resp = check(self.client.get(url).send().await?).await?;
        Ok(resp.bytes().await?)
    }

    pub async fn list_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>> {
        let url = self.get_list_url(filter);
        debug!(%url, "listing snapshots");
        let resp = check(self.client.get(url).send().await?).await?;
        let body: ListSnapshotsResponse = resp.json().await?;
        Ok(body.snapshots)
    }

    /// Mark a snapshot as the latest for its namespace/name
    pub async fn promote_snapshot(&self, id: i64) -> Result<Snapshot> {
        let id = id.to_string();
        let url = self.endpoint(&["v1", "snapshots", id.as_str(), "promote"]);
        debug!(%url, "promoting snapshot");
        let resp = check(self.client.patch(url).send().await?).await?;
        let body: PromoteSnapshotResponse = resp.json().await?;
        Ok(body.snapshot)
    }
}

/// Turn a non-success response into the registry's own error message
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = remote_message(&body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| status.to_string());
    Err(Error::Remote {
        status: status.as_u16(),
        message,
    }
    .into())
}

fn remote_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return Some(parsed.message);
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
