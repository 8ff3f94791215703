use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    files: Arc<RwLock<HashMap<Uuid, FileData>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn save(&self, file_data: FileData) -> Result<String, ApiError> {
        let id = new_file_id();
        self.files.write().await.insert(id, file_data);
        Ok(id.to_string())
    }

    async fn get(&self, file_id: &str) -> Result<StoredFile, ApiError> {
        let key = parse_file_id(file_id)?;
        self.files
            .read()
            .await
            .get(&key)
            .map(|data| StoredFile {
                bytes: data.bytes.clone(),
                content_type: data.content_type.clone(),
            })
            .ok_or(ApiError::NotFound)
    }

    async fn list(&self) -> Result<Vec<FileEntry>, ApiError> {
        Ok(self
            .files
            .read()
            .await
            .iter()
            .map(|(id, data)| FileEntry {
                id: id.to_string(),
                filename: data.filename.clone(),
            })
            .collect())
    }

    async fn delete(&self, file_id: &str) -> Result<(), ApiError> {
        let key = parse_file_id(file_id)?;
        self.files
            .write()
            .await
            .remove(&key)
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }
}
