use super::object_store::{ObjectInfo, ObjectStore};
use crate::error::{CoreError, CoreResult};
use regex::Regex;
use time::{Duration, OffsetDateTime};
use url::Url;

pub const DEFAULT_BUCKET: &str = "attachments";
pub const DEFAULT_URL_TTL: Duration = Duration::hours(24);

/// Proposal artifact bookkeeping over a generic object store: a
/// deterministic path convention, signed access URLs, and retention
/// pruning. The bridge owns no state beyond the bucket name.
pub struct ArtifactBridge<'a> {
    store: &'a dyn ObjectStore,
    bucket: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pruned {
    pub kept: usize,
    pub deleted: Vec<String>,
}

/// Bucket-relative prefix holding every artifact of one proposal.
pub fn artifact_prefix(proposal_id: &str) -> String {
    format!("proposals/{}/", proposal_id)
}

/// `proposals/{id}/proposal-{id}-{YYYYMMDDHHMMSS}.pdf`. The timestamp
/// component keeps successive exports from overwriting each other.
pub fn artifact_path(proposal_id: &str, at: OffsetDateTime) -> String {
    format!(
        "{}proposal-{}-{}.pdf",
        artifact_prefix(proposal_id),
        proposal_id,
        compact_timestamp(at)
    )
}

fn compact_timestamp(at: OffsetDateTime) -> String {
    let utc = at.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second()
    )
}

impl<'a> ArtifactBridge<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: impl Into<String>) -> Self {
        ArtifactBridge {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn with_default_bucket(store: &'a dyn ObjectStore) -> Self {
        Self::new(store, DEFAULT_BUCKET)
    }

    /// Store `bytes` under the path convention and return the path.
    pub fn upload(
        &self,
        proposal_id: &str,
        bytes: &[u8],
        at: OffsetDateTime,
    ) -> CoreResult<String> {
        if proposal_id.trim().is_empty() {
            return Err(CoreError::MissingRequiredField("proposal_id"));
        }
        let path = artifact_path(proposal_id, at);
        self.store.upload(&self.bucket, &path, bytes)?;
        Ok(path)
    }

    /// Signed read URL for a stored artifact. `ttl` defaults to 24 hours.
    pub fn access_url(&self, path: &str, ttl: Option<Duration>) -> CoreResult<Url> {
        self.store
            .create_signed_url(&self.bucket, path, ttl.unwrap_or(DEFAULT_URL_TTL))
    }

    /// Delete all but the newest `keep_latest` artifacts for a proposal.
    ///
    /// Ordering prefers the timestamp embedded in the artifact name (it is
    /// the creation time the uploader stamped) and falls back to the
    /// store-reported creation time for objects that predate the naming
    /// convention. Fewer than `keep_latest` artifacts is a successful
    /// no-op.
    pub fn prune(&self, proposal_id: &str, keep_latest: usize) -> CoreResult<Pruned> {
        let prefix = artifact_prefix(proposal_id);
        let objects = self.store.list(&self.bucket, &prefix)?;

        let stamp_re = Regex::new(r"proposal-.+-(\d{14})\.pdf$")
            .map_err(|e| CoreError::InvalidInput(format!("bad artifact pattern: {}", e)))?;
        let mut ordered: Vec<(String, OffsetDateTime, &ObjectInfo)> = objects
            .iter()
            .map(|obj| {
                let stamp = stamp_re
                    .captures(&obj.name)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                (stamp, obj.created_at, obj)
            })
            .collect();
        // Newest first: path-stamped objects outrank unstamped ones, then
        // store creation time, then name for full determinism.
        ordered.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| b.2.name.cmp(&a.2.name))
        });

        if ordered.len() <= keep_latest {
            return Ok(Pruned {
                kept: ordered.len(),
                deleted: Vec::new(),
            });
        }

        let doomed: Vec<String> = ordered[keep_latest..]
            .iter()
            .map(|(_, _, obj)| obj.name.clone())
            .collect();
        self.store.remove(&self.bucket, &doomed)?;
        tracing::info!(
            proposal_id,
            kept = keep_latest,
            deleted = doomed.len(),
            "pruned proposal artifacts"
        );
        Ok(Pruned {
            kept: keep_latest,
            deleted: doomed,
        })
    }
}
