use axum::{
    body::to_bytes,
    extract::{Multipart, Path, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::api::auth::AuthenticatedUser;
use crate::state::AppState;
use crate::storage::{self, StoredImage, MAX_IMAGE_BYTES};

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub filename: Option<String>,
    pub data_base64: String,
}

#[derive(Debug, serde::Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub url: String,
}

/// Accepts either multipart form data or a JSON body with a base64 payload,
/// whichever the client finds easier.
pub async fn upload_image(
    State(state): State<AppState>,
    AuthenticatedUser(_): AuthenticatedUser,
    req: Request,
) -> Result<Json<UploadResponse>, (StatusCode, String)> {
    let stored = if is_multipart(req.headers()) {
        upload_multipart(&state, req).await?
    } else {
        upload_json(&state, req).await?
    };

    Ok(Json(UploadResponse {
        url: stored.url,
        filename: stored.filename,
    }))
}

async fn upload_multipart(state: &AppState, req: Request) -> Result<StoredImage, (StatusCode, String)> {
    let mut multipart = <Multipart as axum::extract::FromRequest<AppState>>::from_request(req, state)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid multipart payload: {e}")))?;

    let mut stored: Option<StoredImage> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid multipart payload: {e}")))?
    {
        if stored.is_some() {
            return Err((
                StatusCode::BAD_REQUEST,
                "Only one image per request is supported".to_string(),
            ));
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read field: {e}")))?;

        if bytes.is_empty() {
            continue;
        }

        let saved = state
            .images
            .save(bytes.as_ref(), file_name.as_deref())
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        stored = Some(saved);
    }

    stored.ok_or((
        StatusCode::BAD_REQUEST,
        "No image found in multipart upload".to_string(),
    ))
}

async fn upload_json(state: &AppState, req: Request) -> Result<StoredImage, (StatusCode, String)> {
    let (_parts, body) = req.into_parts();
    let body = to_bytes(body, MAX_IMAGE_BYTES * 2)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read body: {e}")))?;

    let parsed: UploadRequest = serde_json::from_slice(&body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Expected JSON (or multipart) upload: {e}"),
        )
    })?;

    let bytes = decode_base64_payload(&parsed.data_base64)?;
    state
        .images
        .save(&bytes, parsed.filename.as_deref())
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err((StatusCode::BAD_REQUEST, "Invalid filename".to_string()));
    }

    let path = state.images.root().join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "Image not found".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(storage::content_type_for(&filename)),
    );

    Ok((headers, bytes))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

fn decode_base64_payload(raw: &str) -> Result<Vec<u8>, (StatusCode, String)> {
    if raw.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Empty base64 payload".to_string()));
    }

    // Tolerate data-URL prefixes ("data:image/png;base64,....").
    let cleaned = match raw.find(',') {
        Some(idx) if raw[..idx].contains("base64") => &raw[idx + 1..],
        _ => raw,
    };

    STANDARD
        .decode(cleaned.trim())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::decode_base64_payload;

    #[test]
    fn decodes_plain_and_data_url_payloads() {
        assert_eq!(decode_base64_payload("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_base64_payload("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(decode_base64_payload("").is_err());
        assert!(decode_base64_payload("not base64!!!").is_err());
    }
}
