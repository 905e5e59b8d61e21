//! Users service routes

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    avatar,
    error::{ApiError, ApiResult},
    extractors::{Authorized, RequireMultipart},
    models::ProfileUpdate,
    policy::UpdateOwnUser,
    state::AppState,
};

/// Create the router for the users service
pub fn create_router(state: AppState, avatar_max_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/users/profile",
            patch(update_profile).fallback(method_not_allowed),
        )
        .route(
            "/users/avatar",
            patch(update_avatar)
                .fallback(method_not_allowed)
                .layer(DefaultBodyLimit::max(avatar_max_bytes)),
        )
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "users-service"
    }))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Update the caller's own profile fields
///
/// Body: JSON with optional `name`, `gender` and `birthdate` (`yyyy-mm-dd`).
/// Responds with a plain-text confirmation.
pub async fn update_profile(
    State(state): State<AppState>,
    caller: Authorized<UpdateOwnUser>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let update: ProfileUpdate = serde_json::from_slice(&body).map_err(|e| {
        warn!("Failed to decode profile update: {}", e);
        ApiError::BadRequest("Failed to decode request body".to_string())
    })?;

    let changes = update.validate(&state.rules).map_err(|msg| {
        warn!("Rejected profile update for user {}: {}", caller.user_id, msg);
        ApiError::BadRequest(msg)
    })?;

    state
        .user_store
        .update_profile(caller.user_id, &changes)
        .await
        .map_err(|e| {
            error!("Failed to update profile for user {}: {}", caller.user_id, e);
            ApiError::Internal("Failed to update user account info".to_string())
        })?;

    info!("Updated profile for user {}", caller.user_id);

    Ok((StatusCode::OK, "User account info updated successfully"))
}

/// Replace the caller's avatar
///
/// Body: `multipart/form-data` with the image under the `avatar` field.
/// Responds with a JSON confirmation.
pub async fn update_avatar(
    State(state): State<AppState>,
    _multipart_body: RequireMultipart,
    caller: Authorized<UpdateOwnUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let multipart = multipart.map_err(|e| {
        warn!("Failed to parse avatar upload: {}", e);
        ApiError::BadRequest("Failed to upload avatar".to_string())
    })?;

    let staged = avatar::receive(multipart, &state.staging).await?;
    let staged = avatar::inspect(
        staged,
        state.sniffer.as_ref(),
        &state.rules.allowed_avatar_types,
    )
    .await?;
    avatar::promote(staged, caller.user_id, state.user_store.as_ref()).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Avatar updated successfully" })),
    ))
}
