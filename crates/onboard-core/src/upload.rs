//! Upload-then-insert with a compensating delete.
//!
//! Object storage and the relational store are separate systems, so a file
//! upload is two writes. The object goes first; if the metadata insert then
//! fails, the object is deleted on a best-effort basis and the insert error
//! is returned. A failed cleanup is only logged, so callers must tolerate
//! the occasional orphaned object.

use crate::error::Result;
use crate::storage::{Bucket, ObjectStore};

/// A file received from a caller, borrowed for the duration of an upload.
#[derive(Debug, Clone, Copy)]
pub struct FileUpload<'a> {
    pub file_name: &'a str,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl FileUpload<'_> {
    /// Explicit content type, or one guessed from the file extension.
    pub fn content_type(&self) -> String {
        match self.content_type.map(str::trim).filter(|s| !s.is_empty()) {
            Some(ct) => ct.to_string(),
            None => mime_guess::from_path(self.file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }

    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }
}

/// Store `data` at `bucket/path`, then run `insert`. On insert failure the
/// object is removed again (best-effort) and the insert error returned.
pub fn upload_then_insert<T>(
    store: &dyn ObjectStore,
    bucket: Bucket,
    path: &str,
    data: &[u8],
    insert: impl FnOnce() -> Result<T>,
) -> Result<T> {
    store.put(bucket, path, data)?;
    match insert() {
        Ok(row) => Ok(row),
        Err(err) => {
            tracing::warn!(%bucket, path, error = %err, "metadata insert failed; removing uploaded object");
            remove_best_effort(store, bucket, path);
            Err(err)
        }
    }
}

/// Delete an object, logging instead of failing. Returns true on success.
pub fn remove_best_effort(store: &dyn ObjectStore, bucket: Bucket, path: &str) -> bool {
    match store.delete(bucket, path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(%bucket, path, error = %e, "failed to delete storage object");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::OnboardError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store whose deletes can be made to fail.
    #[derive(Default)]
    pub struct FlakyStore {
        pub objects: Mutex<HashMap<(Bucket, String), Vec<u8>>>,
        pub fail_deletes: bool,
    }

    impl ObjectStore for FlakyStore {
        fn put(&self, bucket: Bucket, path: &str, data: &[u8]) -> Result<()> {
            self.objects
                .lock()
                .unwrap()
                .insert((bucket, path.to_string()), data.to_vec());
            Ok(())
        }

        fn read(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>> {
            self.objects
                .lock()
                .unwrap()
                .get(&(bucket, path.to_string()))
                .cloned()
                .ok_or_else(|| OnboardError::Storage("missing".into()))
        }

        fn delete(&self, bucket: Bucket, path: &str) -> Result<()> {
            if self.fail_deletes {
                return Err(OnboardError::Storage("delete refused".into()));
            }
            self.objects
                .lock()
                .unwrap()
                .remove(&(bucket, path.to_string()));
            Ok(())
        }

        fn exists(&self, bucket: Bucket, path: &str) -> bool {
            self.objects
                .lock()
                .unwrap()
                .contains_key(&(bucket, path.to_string()))
        }

        fn public_url(&self, bucket: Bucket, path: &str) -> String {
            format!("mem://{bucket}/{path}")
        }
    }
}
