//! Image upload and download shared by user and product pictures.

use axum::{
    extract::Multipart,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::warn;

use crate::error::{AppError, AppResult};

pub const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

pub const USER_PICTURE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];
pub const PRODUCT_PICTURE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

pub struct Upload {
    pub content_type: String,
    pub data: Bytes,
}

/// Reads the `file` field of a multipart body.
pub async fn read_file_field(mut mp: Multipart) -> AppResult<(Option<String>, Bytes)> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Failed to read upload: {e}")))?;
        return Ok((content_type, data));
    }
    Err(AppError::validation("Multipart field 'file' is required"))
}

pub fn validate_upload(
    content_type: Option<String>,
    data: Bytes,
    allowed: &[&str],
) -> AppResult<Upload> {
    let content_type = content_type.unwrap_or_default().to_lowercase();
    if !allowed.contains(&content_type.as_str()) {
        warn!(%content_type, "rejected picture upload");
        return Err(AppError::validation(format!(
            "Unsupported image type. Allowed: {}",
            allowed.join(", ")
        )));
    }
    if data.is_empty() {
        return Err(AppError::validation("Uploaded file is empty"));
    }
    if data.len() > MAX_PICTURE_BYTES {
        return Err(AppError::validation("Uploaded file is too large"));
    }
    Ok(Upload { content_type, data })
}

pub fn image_response(content_type: &str, data: Vec<u8>) -> Response {
    let ct = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    ([(header::CONTENT_TYPE, ct)], data).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_listed_types_case_insensitively() {
        let up = validate_upload(
            Some("IMAGE/PNG".into()),
            Bytes::from_static(b"\x89PNG"),
            USER_PICTURE_TYPES,
        )
        .unwrap();
        assert_eq!(up.content_type, "image/png");
    }

    #[test]
    fn rejects_unlisted_missing_or_empty() {
        let png = Bytes::from_static(b"\x89PNG");
        assert!(validate_upload(Some("image/webp".into()), png.clone(), USER_PICTURE_TYPES).is_err());
        assert!(validate_upload(Some("image/webp".into()), png.clone(), PRODUCT_PICTURE_TYPES).is_ok());
        assert!(validate_upload(None, png, USER_PICTURE_TYPES).is_err());
        assert!(validate_upload(Some("image/gif".into()), Bytes::new(), USER_PICTURE_TYPES).is_err());
    }

    #[test]
    fn image_response_sets_content_type() {
        let resp = image_response("image/gif", vec![1, 2, 3]);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/gif");
    }
}
