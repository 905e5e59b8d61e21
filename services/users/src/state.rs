//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    auth::TokenDenylist, config::ValidationRules, jwt::JwtService, policy::PolicyEngine,
    repositories::UserStore, sniff::ContentSniffer, upload::UploadStaging,
};

/// Read-only handles to every collaborator a request may touch.
///
/// Nothing here is mutated after startup, so requests never contend on it.
#[derive(Clone)]
pub struct AppState {
    pub jwt_service: JwtService,
    pub policy: Arc<dyn PolicyEngine>,
    pub denylist: Arc<dyn TokenDenylist>,
    pub user_store: Arc<dyn UserStore>,
    pub sniffer: Arc<dyn ContentSniffer>,
    pub staging: UploadStaging,
    pub rules: Arc<ValidationRules>,
}
