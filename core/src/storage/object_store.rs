use crate::error::CoreResult;
use time::{Duration, OffsetDateTime};
use url::Url;

/// One stored object as reported by a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    /// Path relative to the bucket root.
    pub name: String,
    pub created_at: OffsetDateTime,
}

/// Blob storage as seen from this core: a bucketed byte store with signed
/// read URLs. Production binds this to the hosted storage API; tests and
/// local development use [`FsObjectStore`](super::fs_store::FsObjectStore).
///
/// Implementations report failures through the distinct artifact error
/// variants (`UploadFailure`, `ListFailure`, `DeleteFailure`) so callers
/// can tell which half of a multi-step operation broke.
pub trait ObjectStore {
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> CoreResult<()>;

    /// Time-limited read URL for an existing object.
    fn create_signed_url(&self, bucket: &str, path: &str, ttl: Duration) -> CoreResult<Url>;

    /// Objects under `prefix`, in no particular order.
    fn list(&self, bucket: &str, prefix: &str) -> CoreResult<Vec<ObjectInfo>>;

    fn remove(&self, bucket: &str, paths: &[String]) -> CoreResult<()>;
}
