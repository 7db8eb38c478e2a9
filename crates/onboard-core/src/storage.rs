//! Object storage for uploaded files.
//!
//! Objects live in named buckets and are addressed by a relative path
//! (`<client_id>/<uuid>-<file name>` for client files). [`FsObjectStore`]
//! maps a bucket onto `<objects_dir>/<bucket>/` on local disk.

use crate::error::{OnboardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Bucket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    SowDocuments,
    KickoffMaterials,
    ClientDeliverables,
    UniversalDocuments,
}

impl Bucket {
    pub fn all() -> &'static [Bucket] {
        &[
            Bucket::SowDocuments,
            Bucket::KickoffMaterials,
            Bucket::ClientDeliverables,
            Bucket::UniversalDocuments,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::SowDocuments => "sow-documents",
            Bucket::KickoffMaterials => "kickoff-materials",
            Bucket::ClientDeliverables => "client-deliverables",
            Bucket::UniversalDocuments => "universal-documents",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Bucket {
    type Err = OnboardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Bucket::all()
            .iter()
            .copied()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| OnboardError::Storage(format!("unknown bucket '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

/// Blob storage backing documents and deliverables.
pub trait ObjectStore: Send + Sync {
    fn put(&self, bucket: Bucket, path: &str, data: &[u8]) -> Result<()>;

    fn read(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>>;

    /// Remove an object. Removing a missing object is not an error.
    fn delete(&self, bucket: Bucket, path: &str) -> Result<()>;

    fn exists(&self, bucket: Bucket, path: &str) -> bool;

    fn public_url(&self, bucket: Bucket, path: &str) -> String;
}

/// Build the object path for a new upload under `prefix`.
pub fn object_path(prefix: &str, file_name: &str) -> String {
    format!(
        "{prefix}/{}-{}",
        Uuid::new_v4(),
        crate::paths::sanitize_file_name(file_name)
    )
}

/// Reject absolute paths and any `..` component.
pub fn validate_object_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(OnboardError::Storage("empty object path".to_string()));
    }
    let ok = Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !ok {
        return Err(OnboardError::Storage(format!(
            "object path '{path}' escapes its bucket"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// FsObjectStore
// ---------------------------------------------------------------------------

pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, bucket: Bucket, path: &str) -> Result<PathBuf> {
        validate_object_path(path)?;
        Ok(self.root.join(bucket.as_str()).join(path))
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, bucket: Bucket, path: &str, data: &[u8]) -> Result<()> {
        let target = self.locate(bucket, path)?;
        crate::io::atomic_write(&target, data)?;
        tracing::debug!(%bucket, path, bytes = data.len(), "stored object");
        Ok(())
    }

    fn read(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>> {
        let target = self.locate(bucket, path)?;
        if !target.is_file() {
            return Err(OnboardError::Storage(format!(
                "object not found: {bucket}/{path}"
            )));
        }
        Ok(std::fs::read(target)?)
    }

    fn delete(&self, bucket: Bucket, path: &str) -> Result<()> {
        let target = self.locate(bucket, path)?;
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, bucket: Bucket, path: &str) -> bool {
        self.locate(bucket, path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            bucket.as_str(),
            path
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
