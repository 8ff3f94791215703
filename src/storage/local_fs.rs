use super::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores each image as `<id>` next to a `<id>.meta` JSON sidecar.
pub struct LocalFileStorage {
    storage_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileMeta {
    content_type: Option<String>,
    filename: Option<String>,
}

impl LocalFileStorage {
    pub fn new(storage_path: PathBuf) -> Result<Self, ApiError> {
        if !storage_path.exists() {
            std::fs::create_dir_all(&storage_path).map_err(|e| {
                tracing::error!(path = %storage_path.display(), error = %e, "cannot create storage dir");
                ApiError::Internal
            })?;
        }
        Ok(Self { storage_path })
    }

    fn blob_path(&self, id: &Uuid) -> PathBuf {
        self.storage_path.join(id.to_string())
    }

    fn meta_path(&self, id: &Uuid) -> PathBuf {
        self.storage_path.join(format!("{id}.meta"))
    }

    async fn read_meta(path: &Path) -> Result<FileMeta, ApiError> {
        let meta = fs::read_to_string(path)
            .await
            .map_err(|_| ApiError::NotFound)?;
        serde_json::from_str(&meta).map_err(|_| ApiError::Internal)
    }
}

#[async_trait]
impl Storage for LocalFileStorage {
    async fn save(&self, file_data: FileData) -> Result<String, ApiError> {
        let id = new_file_id();

        let meta = FileMeta {
            content_type: file_data.content_type.map(|m| m.to_string()),
            filename: file_data.filename,
        };
        let meta = serde_json::to_vec(&meta).map_err(|_| ApiError::Internal)?;

        fs::write(self.meta_path(&id), meta)
            .await
            .map_err(|_| ApiError::Internal)?;
        fs::write(self.blob_path(&id), &file_data.bytes)
            .await
            .map_err(|_| ApiError::Internal)?;

        Ok(id.to_string())
    }

    async fn get(&self, file_id: &str) -> Result<StoredFile, ApiError> {
        let id = parse_file_id(file_id)?;

        let meta = Self::read_meta(&self.meta_path(&id)).await?;
        let content_type = meta.content_type.and_then(|s| s.parse().ok());

        let bytes = fs::read(self.blob_path(&id))
            .await
            .map_err(|_| ApiError::NotFound)?;

        Ok(StoredFile {
            bytes: Bytes::from(bytes),
            content_type,
        })
    }

    async fn list(&self) -> Result<Vec<FileEntry>, ApiError> {
        let mut entries = fs::read_dir(&self.storage_path)
            .await
            .map_err(|_| ApiError::Internal)?;

        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(|_| ApiError::Internal)? {
            let file_name = entry.file_name();
            let Ok(id) = file_name.to_string_lossy().parse::<Uuid>() else {
                continue;
            };

            if let Ok(meta) = Self::read_meta(&self.meta_path(&id)).await {
                files.push(FileEntry {
                    id: id.to_string(),
                    filename: meta.filename,
                });
            }
        }

        Ok(files)
    }

    async fn delete(&self, file_id: &str) -> Result<(), ApiError> {
        let id = parse_file_id(file_id)?;

        fs::remove_file(self.blob_path(&id))
            .await
            .map_err(|_| ApiError::NotFound)?;

        let _ = fs::remove_file(self.meta_path(&id)).await;
        Ok(())
    }
}
