//! Image uploads to object storage.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use atelier_core::ItemType;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Folder for uploads not tied to an item type.
const MISC_FOLDER: &str = "misc";

const IMAGE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/avif",
];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/media",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        .route("/media/delete", post(delete))
}

/// A file read out of the multipart body.
struct Upload {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// POST /media
#[instrument(skip(state, _admin, multipart))]
async fn upload(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut folder = MISC_FOLDER.to_string();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "folder" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                folder = upload_folder(&value)?.to_string();
            }
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                upload = Some(Upload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("missing file".to_string()))?;
    check_upload(&upload)?;

    let key = state
        .storage()
        .object_key(&folder, &upload.filename, Utc::now());
    let url = state
        .storage()
        .put_object(&key, upload.bytes, &upload.content_type)
        .await?;

    tracing::info!(key = %key, "Media uploaded");
    Ok(Json(UploadResponse { key, url }))
}

/// POST /media/delete
#[instrument(skip(state, _admin))]
async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.storage().delete_object(&request.key).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}

/// Folder name for an upload: an item type or `misc`.
fn upload_folder(raw: &str) -> Result<&'static str, AppError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == MISC_FOLDER {
        return Ok(MISC_FOLDER);
    }
    raw.parse::<ItemType>()
        .map(|item_type| item_type.as_str())
        .map_err(|_| AppError::BadRequest(format!("unknown folder: {raw}")))
}

fn check_upload(upload: &Upload) -> Result<(), AppError> {
    if upload.bytes.is_empty() {
        return Err(AppError::BadRequest("empty file".to_string()));
    }
    if upload.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest("file is larger than 10 MB".to_string()));
    }
    if !IMAGE_TYPES.contains(&upload.content_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "unsupported file type: {}",
            upload.content_type
        )));
    }
    Ok(())
}
