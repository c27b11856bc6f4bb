use std::str::FromStr;
use std::sync::atomic::Ordering;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::ocr_result::{self, ImageResponse, OutputFormat};

use super::MockState;

/// Multipart field names accepted for the uploaded image.
pub const UPLOAD_FIELDS: [&str; 2] = ["image", "file"];

/// 1x1 transparent PNG returned as the overlay image.
const OVERLAY_PNG: [u8; 70] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64,
    0x60, 0xf8, 0x5f, 0x0f, 0x00, 0x02, 0x87, 0x01, 0x80, 0xeb, 0x47, 0xba, 0x92, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

#[derive(Debug, Default, Deserialize)]
pub(super) struct OcrQuery {
    format: Option<String>,
    overlay: Option<String>,
    language: Option<String>,
}

pub(super) async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

pub(super) async fn models() -> impl IntoResponse {
    Json(ocr_result::model_catalog())
}

pub(super) async fn ocr_image(
    State(state): State<MockState>,
    Query(query): Query<OcrQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let format = match query.format.as_deref().map(OutputFormat::from_str) {
        None => OutputFormat::Json,
        Some(Ok(format)) => format,
        Some(Err(_)) => return error(StatusCode::BAD_REQUEST, "unsupported format"),
    };

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Not a multipart upload: {}", rejection.body_text());
            return error(StatusCode::BAD_REQUEST, "invalid multipart body");
        }
    };

    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let is_upload = field.name().is_some_and(|n| UPLOAD_FIELDS.contains(&n));
                if !is_upload {
                    continue;
                }
                let filename = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((filename, bytes));
                        break;
                    }
                    Err(e) => {
                        debug!("Failed to read upload: {}", e);
                        return error(StatusCode::BAD_REQUEST, "invalid multipart body");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Malformed multipart body: {}", e);
                return error(StatusCode::BAD_REQUEST, "invalid multipart body");
            }
        }
    }

    let Some((filename, bytes)) = upload else {
        return error(StatusCode::BAD_REQUEST, "no file provided");
    };

    let lowered = filename.to_lowercase();
    if lowered.contains("invalid") || bytes.is_empty() {
        return error(StatusCode::BAD_REQUEST, "invalid format");
    }
    if lowered.contains("large") && bytes.len() > state.max_upload_bytes {
        return error(StatusCode::PAYLOAD_TOO_LARGE, "file too large");
    }

    let language = query.language.as_deref();
    let mut response = ImageResponse::new(&filename, vec![ocr_result::synthetic_region(language)]);
    if query
        .overlay
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        response.overlay = Some(STANDARD.encode(OVERLAY_PNG));
    }

    match response.render(format) {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, format.content_type())],
            body,
        )
            .into_response(),
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

pub(super) async fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "not found")
}

/// Counts every request, answers any `OPTIONS` preflight directly and
/// allows every origin on the way out.
pub(super) async fn track_and_allow_origin(
    State(state): State<MockState>,
    request: Request,
    next: Next,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let mut response = if request.method() == Method::OPTIONS {
        let mut preflight = StatusCode::OK.into_response();
        let headers = preflight.headers_mut();
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
        preflight
    } else {
        next.run(request).await
    };

    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
