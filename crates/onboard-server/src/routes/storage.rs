use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use onboard_core::storage::{validate_object_path, Bucket};

use crate::error::AppError;
use crate::state::AppState;

/// GET /storage/{bucket}/{*path}: the public URL of every stored object.
pub async fn serve_object(
    State(app): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let Ok(bucket) = bucket.parse::<Bucket>() else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    if validate_object_path(&path).is_err() {
        return Err(AppError::bad_request(format!("invalid object path '{path}'")));
    }
    let mime = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let data = app
        .blocking(move |_, store| {
            if !store.exists(bucket, &path) {
                return Ok(None);
            }
            store.read(bucket, &path).map(Some)
        })
        .await?;

    Ok(match data {
        Some(bytes) => ([(header::CONTENT_TYPE, mime)], bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}
