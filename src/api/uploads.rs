use axum::extract::Multipart;

use crate::api::errors::ApiError;
use crate::core::state::AppState;

pub(crate) struct UploadedImage {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

/// Pulls the `file` field out of a multipart body, enforcing the configured
/// upload size cap while streaming.
pub(crate) async fn read_image_field(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<UploadedImage, ApiError> {
    let max_bytes = state.settings().storage().max_upload_size_mb * 1024 * 1024;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            content_type = field.content_type().map(|s| s.to_string());
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                let next_size = bytes.len() as u64 + chunk.len() as u64;
                if next_size > max_bytes {
                    return Err(ApiError::BadRequest(format!(
                        "File size exceeds {}MB limit",
                        state.settings().storage().max_upload_size_mb
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            file_bytes = Some(bytes);
        }
    }

    let bytes = file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }

    Ok(UploadedImage {
        filename: filename.unwrap_or_else(|| "image.jpg".to_string()),
        content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        bytes,
    })
}
