//! Local filesystem storage for input and result artifacts.
//!
//! Inputs live at `{input_root}/{owner_id}/{stored_name}` and results at
//! `{output_root}/{owner_id}/{file}`. The input layout must match
//! [`compose_save_path`] so the envelope's `save_path` points at the file.

use std::io;
use std::path::{Path, PathBuf};

use cloudrender_core::envelope::compose_save_path;
use cloudrender_core::error::CoreError;
use cloudrender_core::naming::{stored_name, validate_path_segment, MAX_NAME_ATTEMPTS};
use cloudrender_core::types::OwnerId;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};

/// A freshly written input artifact.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub stored_name: String,
    pub path: PathBuf,
}

/// Owner-scoped artifact directories on local disk.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    input_root: PathBuf,
    output_root: PathBuf,
}

impl ArtifactStore {
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
        }
    }

    /// The `save_path` an envelope for this artifact carries.
    pub fn save_path(&self, owner_id: OwnerId, stored_name: &str) -> String {
        compose_save_path(&self.input_root, owner_id, stored_name)
    }

    /// Write a new input artifact under a fresh stored name.
    ///
    /// The name is `{unix_ts}.{ext}`; when that file already exists the
    /// suffixed forms `{unix_ts}-1.{ext}`, `{unix_ts}-2.{ext}`, ... are tried.
    /// An existing file is never overwritten. A partially written file is
    /// removed before the error is returned.
    pub async fn save_input<R>(
        &self,
        owner_id: OwnerId,
        unix_ts: i64,
        extension: &str,
        reader: &mut R,
    ) -> io::Result<StoredArtifact>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let owner_dir = self.input_root.join(owner_id.to_string());
        fs::create_dir_all(&owner_dir).await?;

        let (name, path, mut file) = create_unique(&owner_dir, unix_ts, extension).await?;

        if let Err(e) = write_all(&mut file, reader).await {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove partial upload");
            }
            return Err(e);
        }

        Ok(StoredArtifact {
            stored_name: name,
            path,
        })
    }

    /// Remove an input artifact. A missing file is not an error.
    pub async fn remove(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Write (or replace) a result artifact and return its path.
    pub async fn save_result<R>(
        &self,
        owner_id: OwnerId,
        file_name: &str,
        reader: &mut R,
    ) -> Result<PathBuf, StorageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let file_name = validate_path_segment(file_name)?;
        let owner_dir = self.output_root.join(owner_id.to_string());
        fs::create_dir_all(&owner_dir).await?;

        let path = owner_dir.join(file_name);
        let mut file = File::create(&path).await?;
        write_all(&mut file, reader).await?;
        Ok(path)
    }

    /// Path of an input artifact, for download.
    pub fn input_path(&self, owner_id: OwnerId, file_name: &str) -> Result<PathBuf, CoreError> {
        let file_name = validate_path_segment(file_name)?;
        Ok(self.input_root.join(owner_id.to_string()).join(file_name))
    }

    /// Path of a result artifact, for download.
    pub fn output_path(&self, owner_id: OwnerId, file_name: &str) -> Result<PathBuf, CoreError> {
        let file_name = validate_path_segment(file_name)?;
        Ok(self.output_root.join(owner_id.to_string()).join(file_name))
    }
}

/// Failure while persisting a result artifact.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    InvalidName(#[from] CoreError),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),
}

async fn create_unique(
    dir: &Path,
    unix_ts: i64,
    extension: &str,
) -> io::Result<(String, PathBuf, File)> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = stored_name(unix_ts, extension, attempt);
        let path = dir.join(&name);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((name, path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free stored name for timestamp {unix_ts} after {MAX_NAME_ATTEMPTS} attempts"),
    ))
}

async fn write_all<R>(file: &mut File, reader: &mut R) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let written = tokio::io::copy(reader, file).await?;
    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> ArtifactStore {
        ArtifactStore::new(dir.path().join("input"), dir.path().join("output"))
    }

    #[tokio::test]
    async fn save_input_writes_under_owner_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let artifact = store
            .save_input(7, 1_700_000_000, "blend", &mut &b"scene"[..])
            .await
            .unwrap();

        assert_eq!(artifact.stored_name, "1700000000.blend");
        assert_eq!(artifact.path, dir.path().join("input/7/1700000000.blend"));
        assert_eq!(fs::read(&artifact.path).await.unwrap(), b"scene");
        assert_eq!(
            store.save_path(7, &artifact.stored_name),
            artifact.path.to_string_lossy()
        );
    }

    #[tokio::test]
    async fn same_second_uploads_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let first = store.save_input(7, 100, "blend", &mut &b"a"[..]).await.unwrap();
        let second = store.save_input(7, 100, "blend", &mut &b"b"[..]).await.unwrap();
        let other_owner = store.save_input(8, 100, "blend", &mut &b"c"[..]).await.unwrap();

        assert_eq!(first.stored_name, "100.blend");
        assert_eq!(second.stored_name, "100-1.blend");
        assert_eq!(other_owner.stored_name, "100.blend");
        assert_eq!(fs::read(&first.path).await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn save_result_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let err = store
            .save_result(7, "../escape.png", &mut &b"x"[..])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidName(_)));

        let path = store.save_result(7, "100.png", &mut &b"x"[..]).await.unwrap();
        assert_eq!(path, dir.path().join("output/7/100.png"));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let artifact = store.save_input(7, 1, "blend", &mut &b"a"[..]).await.unwrap();

        store.remove(&artifact.path).await.unwrap();
        store.remove(&artifact.path).await.unwrap();
        assert!(!artifact.path.exists());
    }
}
