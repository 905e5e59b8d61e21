//! Bearer token decoding
//!
//! Tokens are issued elsewhere; this service only verifies them. RS256 with a
//! PEM public key is the production setup, HS256 with a shared secret is
//! accepted for local environments.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Failures while turning a raw token into claims
#[derive(Error, Debug)]
pub enum TokenError {
    /// Bad signature, expired, or not a JWT at all
    #[error("Token decode error: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    /// A refresh token was presented where an access token is required
    #[error("Token is not an access token")]
    NotAccessToken,

    /// The `sub` claim is not a user identifier
    #[error("Token subject is not a valid user id: {0}")]
    InvalidSubject(String),

    /// Key material could not be loaded
    #[error("JWT key error: {0}")]
    Key(String),
}

/// Key material used to verify signatures
#[derive(Debug, Clone)]
pub enum JwtKey {
    /// PEM encoded RSA public key, verified with RS256
    RsaPublicPem(String),
    /// Shared secret, verified with HS256
    Secret(Vec<u8>),
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub key: JwtKey,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_ALGORITHM`: `RS256` (default) or `HS256`
    /// - `JWT_PUBLIC_KEY`: Public key (PEM format) or path to public key file, for RS256
    /// - `JWT_SECRET`: Shared secret, for HS256
    pub fn from_env() -> Result<Self, TokenError> {
        let algorithm = std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "RS256".to_string());

        let key = match algorithm.to_ascii_uppercase().as_str() {
            "RS256" => {
                let public_key = std::env::var("JWT_PUBLIC_KEY").map_err(|_| {
                    TokenError::Key("JWT_PUBLIC_KEY environment variable not set".to_string())
                })?;
                JwtKey::RsaPublicPem(load_pem(&public_key)?)
            }
            "HS256" => {
                let secret = std::env::var("JWT_SECRET").map_err(|_| {
                    TokenError::Key("JWT_SECRET environment variable not set".to_string())
                })?;
                if secret.is_empty() {
                    return Err(TokenError::Key("JWT_SECRET must not be empty".to_string()));
                }
                JwtKey::Secret(secret.into_bytes())
            }
            other => {
                return Err(TokenError::Key(format!(
                    "Unsupported JWT_ALGORITHM: {}",
                    other
                )));
            }
        };

        Ok(JwtConfig { key })
    }
}

/// Accept either inline PEM or a path to a PEM file (CWD first, then the crate root)
fn load_pem(value: &str) -> Result<String, TokenError> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }

    std::fs::read_to_string(value)
        .or_else(|_| {
            let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            path.push(value);
            std::fs::read_to_string(path)
        })
        .map(|pem| pem.trim().to_string())
        .map_err(|e| TokenError::Key(format!("Failed to read public key file: {}", e)))
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// User permissions, as `resource:action:scope` keys
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Issued at time
    #[serde(default)]
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    #[serde(default = "default_token_type")]
    pub token_type: TokenType,
}

fn default_token_type() -> TokenType {
    TokenType::Access
}

impl Claims {
    /// The caller's user id, taken from `sub`
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::InvalidSubject(self.sub.clone()))
    }
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Verifies tokens and hands out their claims
#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self, TokenError> {
        let (decoding_key, algorithm) = match &config.key {
            JwtKey::RsaPublicPem(pem) => (
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| TokenError::Key(format!("Invalid RSA public key: {}", e)))?,
                Algorithm::RS256,
            ),
            JwtKey::Secret(secret) => (DecodingKey::from_secret(secret), Algorithm::HS256),
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;

        Ok(JwtService {
            decoding_key,
            validation,
        })
    }

    /// Verify a token and return its claims. Only access tokens are accepted.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.token_type != TokenType::Access {
            return Err(TokenError::NotAccessToken);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serial_test::serial;

    const SECRET: &[u8] = b"unit-test-secret";

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            key: JwtKey::Secret(SECRET.to_vec()),
        })
        .expect("service")
    }

    fn sign(claims: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(SECRET),
        )
        .expect("sign")
    }

    fn far_future() -> u64 {
        (chrono::Utc::now().timestamp() + 3600) as u64
    }

    #[test]
    fn test_decode_access_token() {
        let id = Uuid::new_v4();
        let token = sign(&serde_json::json!({
            "sub": id.to_string(),
            "exp": far_future(),
            "token_type": "Access",
        }));

        let claims = service().decode(&token).expect("decode");
        assert_eq!(claims.user_id().expect("user id"), id);
        assert!(claims.permissions.is_empty());
    }

    #[test]
    fn test_token_type_defaults_to_access() {
        let token = sign(&serde_json::json!({
            "sub": Uuid::new_v4().to_string(),
            "exp": far_future(),
        }));

        assert!(service().decode(&token).is_ok());
    }

    #[test]
    fn test_refresh_token_rejected() {
        let token = sign(&serde_json::json!({
            "sub": Uuid::new_v4().to_string(),
            "exp": far_future(),
            "token_type": "Refresh",
        }));

        assert!(matches!(
            service().decode(&token),
            Err(TokenError::NotAccessToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = sign(&serde_json::json!({
            "sub": Uuid::new_v4().to_string(),
            "exp": 1_000,
        }));

        assert!(matches!(
            service().decode(&token),
            Err(TokenError::Decode(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "sub": "x", "exp": far_future() }),
            &EncodingKey::from_secret(b"someone-else"),
        )
        .expect("sign");

        assert!(service().decode(&token).is_err());
        assert!(service().decode("not-a-jwt").is_err());
    }

    #[test]
    fn test_non_uuid_subject() {
        let token = sign(&serde_json::json!({ "sub": "admin", "exp": far_future() }));

        let claims = service().decode(&token).expect("decode");
        assert!(matches!(
            claims.user_id(),
            Err(TokenError::InvalidSubject(_))
        ));
    }

    #[test]
    #[serial]
    fn test_config_from_env_hs256() {
        unsafe {
            std::env::set_var("JWT_ALGORITHM", "HS256");
            std::env::set_var("JWT_SECRET", "env-secret");
        }

        let config = JwtConfig::from_env();

        unsafe {
            std::env::remove_var("JWT_ALGORITHM");
            std::env::remove_var("JWT_SECRET");
        }

        match config.expect("config").key {
            JwtKey::Secret(secret) => assert_eq!(secret, b"env-secret"),
            other => panic!("unexpected key: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_rejects_unknown_algorithm() {
        unsafe {
            std::env::set_var("JWT_ALGORITHM", "none");
        }

        let config = JwtConfig::from_env();

        unsafe {
            std::env::remove_var("JWT_ALGORITHM");
        }

        assert!(matches!(config, Err(TokenError::Key(_))));
    }
}
