use std::path::Path;

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request},
    http::{HeaderMap, header},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// 10 MB per uploaded file
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Upper bound for a whole request body; enough for a full post.
pub const MAX_BODY_SIZE: usize = 110 * 1024 * 1024;

/// Prefix under which uploads are served and stored in the database.
pub const PUBLIC_PREFIX: &str = "uploads";

/// A file written to the upload directory.
#[derive(Debug, Clone)]
pub struct SavedUpload {
    pub field: String,
    /// Relative path as stored in the database: `uploads/<file>`
    pub url: String,
    pub file_name: String,
}

/// Text fields plus any files saved from a form.
#[derive(Debug, Default)]
pub struct FormData {
    fields: Map<String, Value>,
    pub files: Vec<SavedUpload>,
}

impl FormData {
    /// Deserialize the text fields into a request type.
    pub fn parse<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| ApiError::BadRequest(format!("Invalid form: {e}")))
    }

    pub fn first_url(&self, field: &str) -> Option<String> {
        self.files
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.url.clone())
    }

    pub fn urls(&self, field: &str) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.field == field)
            .map(|f| f.url.clone())
            .collect()
    }

    /// Delete saved files after the operation that needed them was rejected.
    pub async fn discard(self, upload_dir: &Path) {
        remove_uploads(upload_dir, &self.files).await;
    }
}

/// Read a request that is either `multipart/form-data` or JSON.
///
/// Multipart file parts named in `file_fields` are written to `upload_dir`,
/// at most `max_files` of them; other file parts are rejected. JSON bodies
/// carry text fields only.
pub async fn read_form(
    request: Request,
    upload_dir: &Path,
    file_fields: &[&str],
    max_files: usize,
) -> ApiResult<FormData> {
    if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        save_multipart(multipart, upload_dir, file_fields, max_files).await
    } else if has_body(request.headers()) {
        let Json(value) = Json::<Value>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        match value {
            Value::Object(fields) => Ok(FormData {
                fields,
                files: Vec::new(),
            }),
            _ => Err(ApiError::BadRequest("Expected a JSON object".to_string())),
        }
    } else {
        Ok(FormData::default())
    }
}

async fn save_multipart(
    mut multipart: Multipart,
    upload_dir: &Path,
    file_fields: &[&str],
    max_files: usize,
) -> ApiResult<FormData> {
    let mut form = FormData::default();

    let result = async {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            let Some(original) = field.file_name().map(str::to_string) else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                form.fields.insert(name, Value::String(text));
                continue;
            };

            if !file_fields.contains(&name.as_str()) {
                return Err(ApiError::BadRequest(format!("Unexpected file field '{name}'")));
            }
            if form.files.len() >= max_files {
                return Err(ApiError::BadRequest(format!(
                    "At most {max_files} files are allowed"
                )));
            }

            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?
            {
                if bytes.len() + chunk.len() > MAX_FILE_SIZE {
                    return Err(ApiError::BadRequest(format!(
                        "File '{original}' exceeds {} MB",
                        MAX_FILE_SIZE / (1024 * 1024)
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            if bytes.is_empty() {
                continue;
            }

            let saved = save_file(upload_dir, &name, &original, &bytes).await?;
            form.files.push(saved);
        }
        Ok::<(), ApiError>(())
    }
    .await;

    match result {
        Ok(()) => Ok(form),
        Err(e) => {
            form.discard(upload_dir).await;
            Err(e)
        }
    }
}

async fn save_file(
    upload_dir: &Path,
    field: &str,
    original: &str,
    bytes: &[u8],
) -> ApiResult<SavedUpload> {
    tokio::fs::create_dir_all(upload_dir).await.map_err(|e| {
        error!("Failed to create upload directory {}: {}", upload_dir.display(), e);
        ApiError::Internal(e.into())
    })?;

    let file_name = stored_name(original);
    let path = upload_dir.join(&file_name);
    let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
        error!("Failed to create file {}: {}", path.display(), e);
        ApiError::Internal(e.into())
    })?;
    file.write_all(bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", path.display(), e);
        ApiError::Internal(e.into())
    })?;

    debug!("Saved upload {} ({} bytes)", file_name, bytes.len());
    Ok(SavedUpload {
        field: field.to_string(),
        url: format!("{PUBLIC_PREFIX}/{file_name}"),
        file_name,
    })
}

pub async fn remove_uploads(upload_dir: &Path, files: &[SavedUpload]) {
    for file in files {
        let path = upload_dir.join(&file.file_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove upload {}: {}", path.display(), e);
        }
    }
}

/// Delete a file by its stored `uploads/<file>` path. Paths outside the
/// upload directory are ignored.
pub async fn remove_stored(upload_dir: &Path, url: &str) {
    let Some(file_name) = url
        .strip_prefix(PUBLIC_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return;
    };
    if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
        return;
    }
    let path = upload_dir.join(file_name);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => debug!("Removed replaced upload {}", file_name),
        Err(e) => warn!("Failed to remove upload {}: {}", path.display(), e),
    }
}

/// `{uuid}-{name}` with the client's name reduced to a safe file name.
pub fn stored_name(original: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), sanitize(original))
}

fn sanitize(original: &str) -> String {
    // Drop any client-supplied directories
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

fn has_body(headers: &HeaderMap) -> bool {
    headers.contains_key(header::CONTENT_TYPE)
}
