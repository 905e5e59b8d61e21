//! Request extractors for the mutation endpoints
//!
//! Argument order in a handler is stage order: axum runs extractors left to
//! right and stops at the first rejection.

use axum::{
    RequestPartsExt, async_trait,
    extract::FromRequestParts,
    http::{header::CONTENT_TYPE, request::Parts},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use std::marker::PhantomData;
use tracing::warn;
use uuid::Uuid;

use crate::{auth::authorize, error::ApiError, policy::Capability, state::AppState};

/// A caller holding capability `C`
pub struct Authorized<C> {
    pub user_id: Uuid,
    _capability: PhantomData<fn() -> C>,
}

#[async_trait]
impl<C> FromRequestParts<AppState> for Authorized<C>
where
    C: Capability,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                warn!("Missing or malformed bearer token: {}", e);
                ApiError::Unauthorized
            })?;

        let token = bearer.token().trim();
        if token.is_empty() {
            warn!("Empty bearer token");
            return Err(ApiError::Unauthorized);
        }

        let user_id = authorize(state, token, &C::QUERY).await?;

        Ok(Authorized {
            user_id,
            _capability: PhantomData,
        })
    }
}

/// Rejects requests whose body is not `multipart/form-data`
pub struct RequireMultipart;

#[async_trait]
impl<S> FromRequestParts<S> for RequireMultipart
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            Ok(RequireMultipart)
        } else {
            Err(ApiError::BadRequest(
                "Invalid content type, must be multipart/form-data".to_string(),
            ))
        }
    }
}
