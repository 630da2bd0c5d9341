//! Filesystem stores for payloads and fetch timestamps
//!
//! Layout under the cache directory:
//!
//! ```text
//! content/<sha256(id)>.bin   response body
//! content/<sha256(id)>.json  identifier, status and headers
//! meta/<sha256(id)>.json     identifier and cachedAt
//! ```
//!
//! The body is written before its descriptor, so a descriptor on disk always
//! points at a complete body. Anything that cannot be read back in full is
//! reported as absent.

use super::store::{ContentStore, MetadataRecord, MetadataStore, Payload, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const CONTENT_DIR: &str = "content";
const METADATA_DIR: &str = "meta";

/// Returns the XDG cache directory for assetcache
///
/// Uses `~/.cache/assetcache/` on Linux, or the platform equivalent.
/// Returns `None` if no home directory can be determined.
pub fn default_cache_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "assetcache")?;
    Some(project_dirs.cache_dir().to_path_buf())
}

/// File stem for an identifier
fn file_stem(identifier: &str) -> String {
    hex::encode(Sha256::digest(identifier.as_bytes()))
}

/// Deletes a file, treating "not found" as nothing to delete
async fn remove_if_present(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Reads a file, treating "not found" as absent
async fn read_if_present(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Collects the identifiers recorded in every `*.json` file of a directory
async fn list_identifiers<T, F>(dir: &Path, identifier_of: F) -> Result<Vec<String>, StoreError>
where
    T: DeserializeOwned,
    F: Fn(T) -> String,
{
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut identifiers = Vec::new();
    while let Some(dir_entry) = read_dir.next_entry().await? {
        let path = dir_entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(bytes) = read_if_present(&path).await? else {
            continue;
        };
        match serde_json::from_slice::<T>(&bytes) {
            Ok(record) => identifiers.push(identifier_of(record)),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable cache file"),
        }
    }
    Ok(identifiers)
}

/// Descriptor stored next to each body file
#[derive(Debug, Serialize, Deserialize)]
struct ContentDescriptor {
    identifier: String,
    status: u16,
    headers: Vec<(String, String)>,
    /// Body length, used to detect a truncated body file
    size: u64,
}

/// Stores payloads as files in a cache directory
#[derive(Debug, Clone)]
pub struct DiskContentStore {
    dir: PathBuf,
}

impl DiskContentStore {
    /// Creates a store rooted at `<cache_dir>/content`
    pub fn with_dir(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: cache_dir.as_ref().join(CONTENT_DIR),
        }
    }

    fn body_path(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", file_stem(identifier)))
    }

    fn descriptor_path(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(identifier)))
    }
}

#[async_trait]
impl ContentStore for DiskContentStore {
    async fn get(&self, identifier: &str) -> Result<Option<Payload>, StoreError> {
        let Some(raw) = read_if_present(&self.descriptor_path(identifier)).await? else {
            return Ok(None);
        };
        let descriptor: ContentDescriptor = match serde_json::from_slice(&raw) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(identifier, error = %e, "Unparsable content descriptor, treating as absent");
                return Ok(None);
            }
        };
        if descriptor.identifier != identifier {
            warn!(identifier, stored = %descriptor.identifier, "Content descriptor belongs to another identifier");
            return Ok(None);
        }

        let Some(body) = read_if_present(&self.body_path(identifier)).await? else {
            debug!(identifier, "Content body missing, treating as absent");
            return Ok(None);
        };
        if body.len() as u64 != descriptor.size {
            warn!(
                identifier,
                expected = descriptor.size,
                actual = body.len(),
                "Truncated content body, treating as absent"
            );
            return Ok(None);
        }

        Ok(Some(Payload {
            status: descriptor.status,
            headers: descriptor.headers,
            body,
        }))
    }

    async fn put(&self, identifier: &str, payload: Payload) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;

        let descriptor = ContentDescriptor {
            identifier: identifier.to_string(),
            status: payload.status,
            headers: payload.headers,
            size: payload.body.len() as u64,
        };
        let json = serde_json::to_vec_pretty(&descriptor)?;

        fs::write(self.body_path(identifier), &payload.body).await?;
        fs::write(self.descriptor_path(identifier), json).await?;
        Ok(())
    }

    async fn delete(&self, identifier: &str) -> Result<bool, StoreError> {
        // Descriptor first: once it is gone the entry reads as absent.
        let had_descriptor = remove_if_present(&self.descriptor_path(identifier)).await?;
        let had_body = remove_if_present(&self.body_path(identifier)).await?;
        Ok(had_descriptor || had_body)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        list_identifiers(&self.dir, |descriptor: ContentDescriptor| {
            descriptor.identifier
        })
        .await
    }

    /// Deletes body files that have no descriptor. These are left when a
    /// write stops between the body and the descriptor; without a descriptor
    /// the identifier is unknown, so `keys` never reports them.
    async fn purge_incomplete(&self) -> Result<usize, StoreError> {
        let mut read_dir = match fs::read_dir(&self.dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut purged = 0;
        while let Some(dir_entry) = read_dir.next_entry().await? {
            let path = dir_entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("bin") {
                continue;
            }
            if fs::try_exists(path.with_extension("json")).await? {
                continue;
            }
            if remove_if_present(&path).await? {
                debug!(path = %path.display(), "Removed body without descriptor");
                purged += 1;
            }
        }
        Ok(purged)
    }
}

/// Metadata file contents: the record plus the identifier it belongs to
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataFile {
    identifier: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    cached_at: DateTime<Utc>,
}

/// Stores fetch timestamps as small JSON files
#[derive(Debug, Clone)]
pub struct DiskMetadataStore {
    dir: PathBuf,
}

impl DiskMetadataStore {
    /// Creates a store rooted at `<cache_dir>/meta`
    pub fn with_dir(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: cache_dir.as_ref().join(METADATA_DIR),
        }
    }

    fn record_path(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(identifier)))
    }
}

#[async_trait]
impl MetadataStore for DiskMetadataStore {
    async fn get(&self, identifier: &str) -> Result<Option<MetadataRecord>, StoreError> {
        let Some(raw) = read_if_present(&self.record_path(identifier)).await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<MetadataFile>(&raw) {
            Ok(file) if file.identifier == identifier => Ok(Some(MetadataRecord::new(file.cached_at))),
            Ok(file) => {
                warn!(identifier, stored = %file.identifier, "Metadata belongs to another identifier");
                Ok(None)
            }
            Err(e) => {
                warn!(identifier, error = %e, "Unparsable metadata, treating as absent");
                Ok(None)
            }
        }
    }

    async fn put(&self, identifier: &str, record: MetadataRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        let file = MetadataFile {
            identifier: identifier.to_string(),
            cached_at: record.cached_at,
        };
        fs::write(self.record_path(identifier), serde_json::to_vec(&file)?).await?;
        Ok(())
    }

    async fn delete(&self, identifier: &str) -> Result<bool, StoreError> {
        remove_if_present(&self.record_path(identifier)).await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        list_identifiers(&self.dir, |file: MetadataFile| file.identifier).await
    }
}
