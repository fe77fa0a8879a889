//! Request handlers.

use std::time::Duration;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use glimpse_core::PipelineError;

use super::error::ApiError;
use super::AppState;

/// Multipart field carrying the image.
const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub caption: String,
    pub image_path: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub async fn index() -> &'static str {
    "Welcome to the Image Captioning API"
}

/// Caption an uploaded image.
///
/// The file is validated by name before anything is written, then saved,
/// decoded and captioned on the blocking pool.
pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let upload = read_file_field(multipart?)
        .await?
        .ok_or_else(|| ApiError::bad_request("No file part in the form!"))?;

    let stored_name = state.validator.validate(&upload.filename)?;
    let path = state.uploads.save(&stored_name, &upload.bytes).await?;

    if let Some(email) = state.sessions.current_user(&headers) {
        tracing::debug!(user = %email, "Prediction requested by signed-in user");
    }

    let decoded = state.decoder.decode_from_bytes(upload.bytes, &path).await?;
    tracing::debug!(
        "Decoded {} ({}x{}, {:?})",
        stored_name,
        decoded.width,
        decoded.height,
        decoded.format
    );

    let captioner = state.captioner.clone();
    let timeout_ms = state.limits.inference_timeout_ms;
    let task = tokio::task::spawn_blocking(move || captioner.caption(&decoded.image));
    let caption = match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => return Err(ApiError::Internal(format!("Inference task failed: {e}"))),
        Err(_) => {
            return Err(PipelineError::Timeout {
                path,
                stage: "caption".to_string(),
                timeout_ms,
            }
            .into())
        }
    };

    tracing::info!("Captioned {}: {:?}", stored_name, caption.text);
    Ok(Json(PredictResponse {
        caption: caption.text,
        image_path: stored_name,
    }))
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    state
        .accounts
        .create_account(&request.name, &request.email, &request.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully",
        }),
    ))
}

pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let account = state
        .accounts
        .verify_credentials(&request.email, &request.password)
        .await?;

    let cookie = state.sessions.sign_in(&account.email);
    tracing::info!(
        user_id = account.id,
        active_sessions = state.sessions.len(),
        "User signed in"
    );
    Ok((
        [(SET_COOKIE, cookie)],
        Json(MessageResponse {
            message: "User signed in successfully",
        }),
    ))
}

pub async fn signout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let (cookie, email) = state.sessions.sign_out(&headers);
    if let Some(email) = email {
        tracing::info!(user = %email, "User signed out");
    }
    (
        [(SET_COOKIE, cookie)],
        Json(MessageResponse {
            message: "User signed out successfully",
        }),
    )
}

/// The `file` part of a predict request.
struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

/// Pull the first `file` part out of the form.
async fn read_file_field(mut multipart: Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // Without a filename attribute this is a plain form value, not a file
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        return Ok(Some(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}
