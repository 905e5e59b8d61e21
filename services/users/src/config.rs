//! Service configuration

use anyhow::{Context, Result};
use std::{net::SocketAddr, path::PathBuf};

use crate::policy::PolicySource;

/// Values accepted for the profile `gender` field. Empty means "unset".
pub const DEFAULT_GENDERS: [&str; 4] = ["Male", "Female", "Others", ""];

/// Sniffed content types accepted as avatars
pub const DEFAULT_AVATAR_MIME_TYPES: [&str; 8] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/heic",
    "image/heif",
    "image/webp",
    "image/svg+xml",
];

/// Allow-lists consulted by the input validators.
///
/// Built once at startup and shared read-only; tests construct their own.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub allowed_genders: Vec<String>,
    pub allowed_avatar_types: Vec<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            allowed_genders: DEFAULT_GENDERS.iter().map(|g| g.to_string()).collect(),
            allowed_avatar_types: DEFAULT_AVATAR_MIME_TYPES
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Runtime settings for the users service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Staging directory for avatar uploads
    pub avatar_upload_dir: PathBuf,
    /// Largest accepted avatar request body, in bytes
    pub avatar_max_bytes: usize,
    /// Where permission decisions come from
    pub policy_source: PolicySource,
}

impl ServiceConfig {
    /// Create a new ServiceConfig from environment variables
    ///
    /// # Environment Variables
    /// - `USERS_BIND_ADDR`: listen address (default: 0.0.0.0:3002)
    /// - `AVATAR_UPLOAD_DIR`: staging directory (default: ./uploads/avatar/)
    /// - `AVATAR_MAX_BYTES`: request body limit for avatar uploads (default: 10 MiB)
    /// - `POLICY_SOURCE`: `roles` (default) or `claims`
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("USERS_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3002".to_string())
            .parse::<SocketAddr>()
            .context("USERS_BIND_ADDR is not a valid socket address")?;

        let avatar_upload_dir = std::env::var("AVATAR_UPLOAD_DIR")
            .unwrap_or_else(|_| "./uploads/avatar/".to_string())
            .into();

        let avatar_max_bytes = std::env::var("AVATAR_MAX_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10 * 1024 * 1024);

        let policy_source = std::env::var("POLICY_SOURCE")
            .unwrap_or_else(|_| "roles".to_string())
            .parse::<PolicySource>()
            .map_err(anyhow::Error::msg)?;

        Ok(ServiceConfig {
            bind_addr,
            avatar_upload_dir,
            avatar_max_bytes,
            policy_source,
        })
    }
}
