//! In-memory collaborators for unit tests

use async_trait::async_trait;
use common::error::CacheError;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tempfile::TempDir;
use tokio::fs::File;
use uuid::Uuid;

use crate::{
    auth::TokenDenylist,
    config::ValidationRules,
    jwt::{Claims, JwtConfig, JwtKey, JwtService},
    models::ProfileChanges,
    policy::{PermissionQuery, PolicyEngine, PolicyError},
    repositories::{StoreError, UserStore},
    sniff::{ContentSniffer, MagicSniffer},
    state::AppState,
    upload::UploadStaging,
};

const TEST_SECRET: &[u8] = b"users-service-test-secret";

#[derive(Default)]
pub struct FakePolicy {
    calls: AtomicUsize,
    deny: AtomicBool,
    fail: AtomicBool,
    queries: Mutex<Vec<PermissionQuery>>,
}

impl FakePolicy {
    pub fn deny(&self) {
        self.deny.store(true, Ordering::SeqCst);
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<PermissionQuery> {
        self.queries.lock().expect("lock").clone()
    }
}

#[async_trait]
impl PolicyEngine for FakePolicy {
    async fn evaluate(
        &self,
        _claims: &Claims,
        query: &PermissionQuery,
    ) -> Result<bool, PolicyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().expect("lock").push(*query);

        if self.fail.load(Ordering::SeqCst) {
            return Err(PolicyError::Lookup(sqlx::Error::PoolTimedOut));
        }
        Ok(!self.deny.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub struct FakeDenylist {
    fail: AtomicBool,
    revoked: Mutex<HashSet<String>>,
}

impl FakeDenylist {
    pub fn revoke(&self, token: &str) {
        self.revoked.lock().expect("lock").insert(token.to_string());
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenDenylist for FakeDenylist {
    async fn is_revoked(&self, token: &str) -> Result<bool, CacheError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CacheError::Connection(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "denylist unreachable",
            ))));
        }
        Ok(self.revoked.lock().expect("lock").contains(token))
    }
}

/// Store that records every call
#[derive(Default)]
pub struct RecordingStore {
    fail: AtomicBool,
    profiles: Mutex<Vec<(Uuid, ProfileChanges)>>,
    avatars: Mutex<Vec<(Uuid, PathBuf)>>,
}

impl RecordingStore {
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn profiles(&self) -> Vec<(Uuid, ProfileChanges)> {
        self.profiles.lock().expect("lock").clone()
    }

    pub fn avatars(&self) -> Vec<(Uuid, PathBuf)> {
        self.avatars.lock().expect("lock").clone()
    }
}

#[async_trait]
impl UserStore for RecordingStore {
    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::NotFound(user_id));
        }
        self.profiles
            .lock()
            .expect("lock")
            .push((user_id, changes.clone()));
        Ok(())
    }

    async fn update_avatar(&self, user_id: Uuid, path: &Path) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::NotFound(user_id));
        }
        self.avatars
            .lock()
            .expect("lock")
            .push((user_id, path.to_path_buf()));
        Ok(())
    }
}

/// Sniffer whose reads always fail
pub struct FailingSniffer;

#[async_trait]
impl ContentSniffer for FailingSniffer {
    async fn sniff(&self, _file: &mut File) -> io::Result<String> {
        Err(io::Error::other("sniffer unavailable"))
    }
}

/// Fakes plus a temporary upload directory, wired into an [`AppState`]
pub struct TestHarness {
    pub policy: Arc<FakePolicy>,
    pub denylist: Arc<FakeDenylist>,
    pub store: Arc<RecordingStore>,
    pub sniffer: Arc<dyn ContentSniffer>,
    pub upload_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            policy: Arc::new(FakePolicy::default()),
            denylist: Arc::new(FakeDenylist::default()),
            store: Arc::new(RecordingStore::default()),
            sniffer: Arc::new(MagicSniffer),
            upload_dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn state(&self) -> AppState {
        let jwt_service = JwtService::new(JwtConfig {
            key: JwtKey::Secret(TEST_SECRET.to_vec()),
        })
        .expect("jwt service");

        AppState {
            jwt_service,
            policy: self.policy.clone(),
            denylist: self.denylist.clone(),
            user_store: self.store.clone(),
            sniffer: self.sniffer.clone(),
            staging: UploadStaging::new(self.upload_dir.path()),
            rules: Arc::new(ValidationRules::default()),
        }
    }

    /// Signed access token with the given subject
    pub fn token_for(&self, sub: &str) -> String {
        let exp = chrono::Utc::now().timestamp() + 3600;
        encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "sub": sub, "exp": exp, "token_type": "Access" }),
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .expect("sign token")
    }

    pub fn upload_dir(&self) -> &Path {
        self.upload_dir.path()
    }

    pub fn staged_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.upload_dir())
            .expect("read upload dir")
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        files.sort();
        files
    }
}
