//! JSON bodies shared by the server routes and the HTTP clients.

use serde::{Deserialize, Serialize};

/// Multipart field every image of an upload batch is sent under.
pub const IMAGES_FIELD: &str = "images";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedFile {
    pub url: String,
    pub filename: Option<String>,
}

/// `{ success, data?, message? }` wrapper used by the product routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

impl Envelope<()> {
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
        }
    }
}
