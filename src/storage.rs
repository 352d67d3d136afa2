/*!
 * Object storage seam.
 *
 * The service reads input videos and WebVTT files from URLs and writes its
 * outputs to URLs. Uploading a corrected WebVTT file before creating an
 * iteration goes through a `BlobStore`; hosting applications plug in their
 * storage account client, tests use `MemoryBlobStore`.
 */

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;

use crate::errors::StorageError;

/// Location of a blob in a storage account
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobRef {
    pub account: String,
    pub container: String,
    pub blob_name: String,
}

impl BlobRef {
    /// Create a reference, rejecting empty or malformed parts
    pub fn new(
        account: impl Into<String>,
        container: impl Into<String>,
        blob_name: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let blob = Self {
            account: account.into(),
            container: container.into(),
            blob_name: blob_name.into(),
        };

        let account_ok = !blob.account.is_empty()
            && blob.account.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !account_ok {
            return Err(StorageError::InvalidReference(format!("invalid account name '{}'", blob.account)));
        }
        let container_ok = !blob.container.is_empty()
            && blob.container.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !container_ok {
            return Err(StorageError::InvalidReference(format!("invalid container name '{}'", blob.container)));
        }
        if blob.blob_name.trim().is_empty() || blob.blob_name.starts_with('/') {
            return Err(StorageError::InvalidReference(format!("invalid blob name '{}'", blob.blob_name)));
        }
        Ok(blob)
    }

    /// Public URL of the blob
    pub fn url(&self) -> String {
        format!(
            "https://{}.blob.core.windows.net/{}/{}",
            self.account, self.container, self.blob_name
        )
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Storage collaborator for the files a translation reads
#[async_trait]
pub trait BlobStore: Send + Sync + fmt::Debug {
    /// Store `content` at `blob`, replacing any existing blob; returns its URL
    async fn put_text(&self, blob: &BlobRef, content: Bytes) -> Result<String, StorageError>;

    /// Read the blob at `blob`
    async fn get_text(&self, blob: &BlobRef) -> Result<Bytes, StorageError>;
}

/// `BlobStore` backed by process memory
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobRef, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_text(&self, blob: &BlobRef, content: Bytes) -> Result<String, StorageError> {
        debug!("Storing {} bytes at {}", content.len(), blob);
        self.blobs.write().insert(blob.clone(), content);
        Ok(blob.url())
    }

    async fn get_text(&self, blob: &BlobRef) -> Result<Bytes, StorageError> {
        self.blobs
            .read()
            .get(blob)
            .cloned()
            .ok_or_else(|| StorageError::BlobNotFound {
                container: blob.container.clone(),
                blob: blob.blob_name.clone(),
            })
    }
}
