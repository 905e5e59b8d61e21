//! Avatar upload stages: receive, stage, inspect, promote
//!
//! Every exit path after staging either hands the file to the store or
//! deletes it before the response is produced.

use axum::extract::Multipart;
use std::path::PathBuf;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    repositories::UserStore,
    sniff::{ContentSniffer, normalize_mime_type},
    upload::{StagedFile, StagingError, UploadStaging},
};

/// Multipart field that carries the avatar file
pub const AVATAR_FIELD: &str = "avatar";

/// Find the avatar file in the form and stream it into the staging area
pub async fn receive(mut multipart: Multipart, staging: &UploadStaging) -> ApiResult<StagedFile> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Failed to read multipart form: {}", e);
        ApiError::BadRequest("Failed to upload avatar".to_string())
    })? {
        if field.name() != Some(AVATAR_FIELD) || field.file_name().is_none_or(str::is_empty) {
            continue;
        }

        return staging.stage_field(field).await.map_err(|e| match &e {
            StagingError::Stream(cause) => {
                warn!("Avatar upload stream failed: {}", cause);
                ApiError::BadRequest("Failed to upload avatar".to_string())
            }
            StagingError::CreateDir(_) | StagingError::CreateFile(_) => {
                error!("{}", e);
                ApiError::Internal("Failed to save avatar".to_string())
            }
            StagingError::Write(_) => {
                error!("{}", e);
                ApiError::Internal("Error saving file".to_string())
            }
        });
    }

    Err(ApiError::BadRequest("No avatar uploaded".to_string()))
}

/// Sniff the staged bytes; anything outside `allowed` is deleted and rejected
pub async fn inspect(
    staged: StagedFile,
    sniffer: &dyn ContentSniffer,
    allowed: &[String],
) -> ApiResult<StagedFile> {
    let mut file = match staged.open().await {
        Ok(file) => file,
        Err(e) => {
            error!(
                "Failed to open saved avatar {}: {}",
                staged.path().display(),
                e
            );
            staged.discard().await;
            return Err(ApiError::Internal(
                "Failed to open saved avatar".to_string(),
            ));
        }
    };

    let sniffed = sniffer.sniff(&mut file).await;
    drop(file);

    match sniffed {
        Ok(mime) if allowed.contains(&normalize_mime_type(&mime)) => Ok(staged),
        Ok(mime) => {
            warn!("Rejected avatar upload with content type {}", mime);
            staged.discard().await;
            Err(ApiError::UnsupportedMediaType)
        }
        Err(e) => {
            warn!("Failed to sniff avatar content type: {}", e);
            staged.discard().await;
            Err(ApiError::UnsupportedMediaType)
        }
    }
}

/// Record the inspected file as the user's avatar.
///
/// If the store refuses, the file is deleted: nothing references it.
pub async fn promote(
    staged: StagedFile,
    user_id: Uuid,
    store: &dyn UserStore,
) -> ApiResult<PathBuf> {
    match store.update_avatar(user_id, staged.path()).await {
        Ok(()) => {
            let path = staged.keep();
            info!("Updated avatar for user {} to {}", user_id, path.display());
            Ok(path)
        }
        Err(e) => {
            error!("Failed to update avatar for user {}: {}", user_id, e);
            staged.discard().await;
            Err(ApiError::Internal("Failed to update avatar".to_string()))
        }
    }
}
