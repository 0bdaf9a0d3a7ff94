use super::object_store::{ObjectInfo, ObjectStore};
use crate::error::{CoreError, CoreResult};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime};
use url::Url;
use walkdir::WalkDir;

const KEY_FILE: &str = "signing_key";
const DEFAULT_ENDPOINT: &str = "https://storage.evergreen.local/";

/// Filesystem-backed object store for local development and tests.
///
/// Buckets are directories under the root; signed URLs carry an
/// HMAC-style token derived from a per-store key, so a URL minted by one
/// store instance verifies against a reopened instance on the same root.
pub struct FsObjectStore {
    root: PathBuf,
    endpoint: Url,
    signing_key: [u8; 32],
}

impl FsObjectStore {
    /// Create a store at `root`, generating and persisting a signing key.
    pub fn create(root: impl AsRef<Path>) -> CoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("meta"))?;
        let mut signing_key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut signing_key);
        fs::write(root.join("meta").join(KEY_FILE), hex::encode(signing_key))?;
        Self::with_key(root, signing_key)
    }

    /// Open a store previously created at `root`.
    pub fn open(root: impl AsRef<Path>) -> CoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        let key_hex = fs::read_to_string(root.join("meta").join(KEY_FILE))?;
        let key_bytes = hex::decode(key_hex.trim())
            .map_err(|e| CoreError::InvalidInput(format!("bad signing key: {}", e)))?;
        if key_bytes.len() != 32 {
            return Err(CoreError::InvalidInput(
                "signing key must be 32 bytes".to_string(),
            ));
        }
        let mut signing_key = [0u8; 32];
        signing_key.copy_from_slice(&key_bytes);
        Self::with_key(root, signing_key)
    }

    fn with_key(root: PathBuf, signing_key: [u8; 32]) -> CoreResult<Self> {
        let endpoint = Url::parse(DEFAULT_ENDPOINT)
            .map_err(|e| CoreError::InvalidInput(format!("bad endpoint: {}", e)))?;
        Ok(FsObjectStore {
            root,
            endpoint,
            signing_key,
        })
    }

    fn object_path(&self, bucket: &str, path: &str) -> CoreResult<PathBuf> {
        if bucket.is_empty() || path.is_empty() {
            return Err(CoreError::InvalidInput(
                "bucket and path must be non-empty".to_string(),
            ));
        }
        // Reject traversal; object paths are always bucket-relative.
        if path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(CoreError::InvalidInput(format!(
                "invalid object path: {}",
                path
            )));
        }
        Ok(self.root.join(bucket).join(path))
    }

    fn token(&self, bucket: &str, path: &str, expires_unix: i64) -> String {
        let mut h = Sha256::new();
        h.update(self.signing_key);
        h.update(bucket.as_bytes());
        h.update(b"/");
        h.update(path.as_bytes());
        h.update(expires_unix.to_be_bytes());
        hex::encode(h.finalize())
    }

    /// Check a URL minted by `create_signed_url`: token must match and the
    /// expiry must still be in the future at `now`.
    pub fn verify_signed_url(&self, url: &Url, now: OffsetDateTime) -> bool {
        let mut expires = None;
        let mut token = None;
        for (k, v) in url.query_pairs() {
            match k.as_ref() {
                "expires" => expires = v.parse::<i64>().ok(),
                "token" => token = Some(v.to_string()),
                _ => {}
            }
        }
        let (Some(expires), Some(token)) = (expires, token) else {
            return false;
        };
        if OffsetDateTime::from_unix_timestamp(expires)
            .map(|t| t < now)
            .unwrap_or(true)
        {
            return false;
        }
        let mut segments = match url.path_segments() {
            Some(s) => s,
            None => return false,
        };
        let Some(bucket) = segments.next() else {
            return false;
        };
        let path: Vec<&str> = segments.collect();
        token == self.token(bucket, &path.join("/"), expires)
    }
}

impl ObjectStore for FsObjectStore {
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> CoreResult<()> {
        let target = self
            .object_path(bucket, path)
            .map_err(|e| CoreError::UploadFailure(e.to_string()))?;
        let parent = target
            .parent()
            .ok_or_else(|| CoreError::UploadFailure("object path has no parent".to_string()))?;
        fs::create_dir_all(parent).map_err(|e| CoreError::UploadFailure(e.to_string()))?;
        fs::write(&target, bytes).map_err(|e| CoreError::UploadFailure(e.to_string()))
    }

    fn create_signed_url(&self, bucket: &str, path: &str, ttl: Duration) -> CoreResult<Url> {
        let target = self.object_path(bucket, path)?;
        if !target.is_file() {
            return Err(CoreError::InvalidInput(format!(
                "no such object: {}/{}",
                bucket, path
            )));
        }
        let expires = (OffsetDateTime::now_utc() + ttl).unix_timestamp();
        let token = self.token(bucket, path, expires);
        let mut url = self
            .endpoint
            .join(&format!("{}/{}", bucket, path))
            .map_err(|e| CoreError::InvalidInput(format!("bad object url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("token", &token);
        Ok(url)
    }

    fn list(&self, bucket: &str, prefix: &str) -> CoreResult<Vec<ObjectInfo>> {
        let bucket_root = self.root.join(bucket);
        if !bucket_root.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in WalkDir::new(&bucket_root) {
            let entry = entry.map_err(|e| CoreError::ListFailure(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&bucket_root)
                .map_err(|e| CoreError::ListFailure(e.to_string()))?;
            let name = rel.to_string_lossy().replace('\\', "/");
            if !name.starts_with(prefix) {
                continue;
            }
            let meta = entry
                .metadata()
                .map_err(|e| CoreError::ListFailure(e.to_string()))?;
            let modified = meta
                .modified()
                .map_err(|e| CoreError::ListFailure(e.to_string()))?;
            out.push(ObjectInfo {
                name,
                created_at: OffsetDateTime::from(modified),
            });
        }
        Ok(out)
    }

    fn remove(&self, bucket: &str, paths: &[String]) -> CoreResult<()> {
        for path in paths {
            let target = self
                .object_path(bucket, path)
                .map_err(|e| CoreError::DeleteFailure(e.to_string()))?;
            fs::remove_file(&target).map_err(|e| {
                CoreError::DeleteFailure(format!("{}/{}: {}", bucket, path, e))
            })?;
        }
        Ok(())
    }
}
