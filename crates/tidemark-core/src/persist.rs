//! Crash-safe document persistence
//!
//! Every document is written to a sibling temp file and renamed over the
//! target, so readers see either the previous or the new version.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{TidemarkError, TidemarkResult};

/// Outcome of reading a persisted document
#[derive(Debug)]
pub enum Loaded<T> {
    /// The document parsed
    Found(T),
    /// No document on disk
    Missing,
    /// The document exists but could not be parsed
    Corrupt(String),
}

impl<T> Loaded<T> {
    /// Convert to an option, discarding the corruption reason
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Missing | Self::Corrupt(_) => None,
        }
    }
}

/// Write `bytes` to `path` through a temp file and rename
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> TidemarkResult<()> {
    let parent = path.parent().ok_or_else(|| {
        TidemarkError::io_with_path("Path has no parent directory", path.display().to_string())
    })?;
    fs::create_dir_all(parent).await.map_err(|e| {
        TidemarkError::io_with_path(
            format!("Failed to create directory: {}", e),
            parent.display().to_string(),
        )
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));

    let result = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path).await;
        return Err(TidemarkError::io_with_path(
            format!("Failed to write file: {}", e),
            path.display().to_string(),
        ));
    }
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> TidemarkResult<()> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| TidemarkError::storage(format!("Failed to serialize document: {}", e)))?;
    write_atomic(path, &json).await
}

/// Read and parse a JSON document
///
/// Missing and unparseable documents are distinguished so callers can warn
/// about corruption and carry on with an empty value.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> TidemarkResult<Loaded<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) => {
            return Err(TidemarkError::io_with_path(
                format!("Failed to read file: {}", e),
                path.display().to_string(),
            ));
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Loaded::Found(value)),
        Err(e) => Ok(Loaded::Corrupt(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_atomic_creates_parents_and_leaves_no_temp() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a/b/doc.json");

        write_json(&target, &vec![1, 2, 3]).await.unwrap();

        let loaded: Loaded<Vec<i32>> = read_json(&target).await.unwrap();
        assert_eq!(loaded.found(), Some(vec![1, 2, 3]));

        let leftovers: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_read_json_distinguishes_missing_and_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let missing: Loaded<Vec<i32>> = read_json(&temp_dir.path().join("nope.json"))
            .await
            .unwrap();
        assert!(matches!(missing, Loaded::Missing));

        let corrupt_path = temp_dir.path().join("bad.json");
        std::fs::write(&corrupt_path, b"[1, 2").unwrap();
        let corrupt: Loaded<Vec<i32>> = read_json(&corrupt_path).await.unwrap();
        assert!(matches!(corrupt, Loaded::Corrupt(_)));
    }
}
