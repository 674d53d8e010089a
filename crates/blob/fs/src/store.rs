use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;

use galleria_blob::{BlobError, BlobStore, StoredNameGenerator};
use galleria_core::StoredName;

/// Attempts before giving up on finding an unused file name.
const MAX_NAME_ATTEMPTS: u32 = 8;

/// Filesystem [`BlobStore`] that keeps one file per blob in a flat directory.
///
/// Files are created with `create_new`, so an existing blob is never
/// overwritten even if two writers somehow generate the same name; the
/// loser simply retries with a fresh name. A write that fails midway removes
/// its partial file before returning.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    names: StoredNameGenerator,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    /// Stored names are prefixed with `field`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Backend`] if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>, field: &str) -> Result<Self, BlobError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| BlobError::Backend(format!("{}: {e}", root.display())))?;

        tracing::info!(path = %root.display(), "opened filesystem blob store");
        Ok(Self {
            root,
            names: StoredNameGenerator::new(field),
        })
    }

    /// Directory holding the blobs.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &StoredName) -> PathBuf {
        self.root.join(name.as_str())
    }

    async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(path).await {
                tracing::warn!(
                    path = %path.display(),
                    error = %cleanup,
                    "failed to remove partial blob"
                );
            }
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, data: Bytes, extension: Option<&str>) -> Result<StoredName, BlobError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = self.names.next_name(extension)?;
            let path = self.path_of(&name);

            match Self::write_new(&path, &data).await {
                Ok(()) => {
                    tracing::debug!(name = %name, "stored blob");
                    return Ok(name);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(name = %name, "stored name taken, regenerating");
                }
                Err(e) => {
                    return Err(BlobError::Write(format!("{}: {e}", path.display())));
                }
            }
        }
        Err(BlobError::NameExhausted {
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    async fn exists(&self, name: &StoredName) -> Result<bool, BlobError> {
        tokio::fs::try_exists(self.path_of(name))
            .await
            .map_err(|e| BlobError::Read(format!("{name}: {e}")))
    }

    async fn get(&self, name: &StoredName) -> Result<Option<Bytes>, BlobError> {
        match tokio::fs::read(self.path_of(name)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BlobError::Read(format!("{name}: {e}"))),
        }
    }

    async fn delete(&self, name: &StoredName) -> Result<bool, BlobError> {
        match tokio::fs::remove_file(self.path_of(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BlobError::Delete(format!("{name}: {e}"))),
        }
    }

    async fn list(&self) -> Result<Vec<StoredName>, BlobError> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| BlobError::Read(format!("{}: {e}", self.root.display())))?;

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| BlobError::Read(format!("{}: {e}", self.root.display())))?
        {
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if !is_file {
                continue;
            }
            // Foreign files (editor swap files, dotfiles) are not blobs.
            if let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|s| StoredName::parse(s).ok())
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn conformance() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path(), "image").await.unwrap();
        galleria_blob::testing::run_blob_store_conformance_tests(&store)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("uploads");
        let store = FsBlobStore::open(&root, "image").await.unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[tokio::test]
    async fn blob_lands_in_root_with_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path(), "image").await.unwrap();
        let name = store
            .put(Bytes::from_static(b"0123456789"), Some("png"))
            .await
            .unwrap();
        let on_disk = std::fs::read(dir.path().join(name.as_str())).unwrap();
        assert_eq!(on_disk, b"0123456789");
    }

    #[tokio::test]
    async fn list_skips_foreign_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path(), "image").await.unwrap();
        std::fs::write(dir.path().join(".DS_Store"), b"junk").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        let name = store.put(Bytes::from_static(b"x"), Some("png")).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed, vec![name]);
    }

    #[tokio::test]
    async fn write_into_unwritable_root_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("gone"), "image")
            .await
            .unwrap();
        std::fs::remove_dir(store.root()).unwrap();

        let err = store
            .put(Bytes::from_static(b"x"), Some("png"))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Write(_)), "got {err:?}");
    }
}
