use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Multipart, Path, multipart::MultipartError},
    response::{IntoResponse, Response},
};
use http::{HeaderValue, StatusCode, header};
use tracing::{info, warn};

use super::ServerSettings;
use crate::errors::ApiError;
use crate::storage::{FileData, Storage};
use crate::upload::validation;
use crate::wire::{Envelope, IMAGES_FIELD, ListedFile, UploadResponse};

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Accepts a batch of images under the `images` field. Every part is checked
/// before anything is stored, so a batch is either hosted whole or not at all.
pub(super) async fn upload_images(
    Extension(storage): Extension<Arc<dyn Storage>>,
    Extension(settings): Extension<Arc<ServerSettings>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut batch = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGES_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        validation::check(
            filename.as_deref().unwrap_or_default(),
            &content_type,
            bytes.len() as u64,
        )
        .inspect_err(|rejection| warn!(%rejection, "refusing upload"))?;

        batch.push(FileData {
            bytes,
            content_type: content_type.parse().ok(),
            filename,
        });
    }

    if batch.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "no files under the `{IMAGES_FIELD}` field"
        )));
    }

    let mut saved = Vec::with_capacity(batch.len());
    for file_data in batch {
        match storage.save(file_data).await {
            Ok(file_id) => saved.push(file_id),
            Err(err) => {
                discard(storage.as_ref(), &saved).await;
                return Err(err);
            }
        }
    }
    let files: Vec<String> = saved.iter().map(|id| settings.file_url(id)).collect();
    info!(count = files.len(), "hosted uploaded images");

    Ok(Json(UploadResponse {
        success: true,
        files,
    }))
}

/// Removes the part of a batch that was stored before a later part failed.
async fn discard(storage: &dyn Storage, saved: &[String]) {
    for file_id in saved {
        if let Err(err) = storage.delete(file_id).await {
            warn!(%file_id, error = %err, "could not remove partially stored upload");
        }
    }
    if !saved.is_empty() {
        warn!(discarded = saved.len(), "upload batch failed while storing, rolled back");
    }
}

pub(super) async fn get_file(
    Path(file_id): Path<String>,
    Extension(storage): Extension<Arc<dyn Storage>>,
) -> Result<Response, ApiError> {
    let stored = storage.get(&file_id).await?;

    let mut response = stored.bytes.into_response();

    if let Some(content_type) = stored.content_type {
        let value = HeaderValue::from_str(content_type.as_ref()).map_err(|_| ApiError::Internal)?;
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }

    Ok(response)
}

pub(super) async fn list_files(
    Extension(storage): Extension<Arc<dyn Storage>>,
    Extension(settings): Extension<Arc<ServerSettings>>,
) -> Result<Json<Vec<ListedFile>>, ApiError> {
    let files = storage.list().await?;
    let links = files
        .into_iter()
        .map(|entry| ListedFile {
            url: settings.file_url(&entry.id),
            filename: entry.filename,
        })
        .collect();
    Ok(Json(links))
}

pub(super) async fn delete_file(
    Path(file_id): Path<String>,
    Extension(storage): Extension<Arc<dyn Storage>>,
) -> Result<Json<Envelope<()>>, ApiError> {
    storage.delete(&file_id).await?;
    info!(%file_id, "deleted hosted image");
    Ok(Json(Envelope::done()))
}
