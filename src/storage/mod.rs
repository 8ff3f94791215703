mod in_memory;
mod local_fs;

pub use in_memory::InMemoryStorage;
pub use local_fs::LocalFileStorage;

use crate::errors::ApiError;
use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use uuid::Uuid;

/// An uploaded image as received by the server.
#[derive(Debug, Clone)]
pub struct FileData {
    pub bytes: Bytes,
    pub content_type: Option<Mime>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub bytes: Bytes,
    pub content_type: Option<Mime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: String,
    pub filename: Option<String>,
}

/// Backing store for hosted product images. Ids are generated by the store.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn save(&self, file_data: FileData) -> Result<String, ApiError>;
    async fn get(&self, file_id: &str) -> Result<StoredFile, ApiError>;
    async fn list(&self) -> Result<Vec<FileEntry>, ApiError>;
    async fn delete(&self, file_id: &str) -> Result<(), ApiError>;
}

fn new_file_id() -> Uuid {
    Uuid::new_v4()
}

/// Only ids this module generated are ever looked up, which also keeps
/// arbitrary path segments away from the filesystem backend.
fn parse_file_id(file_id: &str) -> Result<Uuid, ApiError> {
    file_id.parse().map_err(|_| ApiError::NotFound)
}
