//! API key verification
//!
//! The server keeps only a salted SHA-256 digest of the key. Presented keys
//! are hashed the same way and compared without early exit.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use safer_streets_core::API_KEY_HEADER;

use crate::error::ApiError;
use crate::ServerState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("stored credential is empty")]
    Empty,
    #[error("digest is not a hex-encoded SHA-256 value")]
    BadDigest,
    #[error("API key must not be empty")]
    EmptyKey,
}

/// A salted key digest, stored as `<salt>:<hex digest>`.
///
/// A bare hex digest with no `:` is read as unsalted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential {
    salt: String,
    digest: [u8; 32],
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("salt", &self.salt)
            .field("digest", &"<redacted>")
            .finish()
    }
}

impl ApiCredential {
    /// Hash a plaintext key under `salt`.
    pub fn from_secret(salt: impl Into<String>, key: &str) -> Result<Self, CredentialError> {
        if key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }
        let salt = salt.into();
        let digest = salted_digest(&salt, key);
        Ok(Self { salt, digest })
    }

    /// Parse the stored form produced by [`ApiCredential::encode`].
    pub fn parse(stored: &str) -> Result<Self, CredentialError> {
        let stored = stored.trim();
        if stored.is_empty() {
            return Err(CredentialError::Empty);
        }
        let (salt, hex_digest) = stored.rsplit_once(':').unwrap_or(("", stored));
        let bytes = hex::decode(hex_digest).map_err(|_| CredentialError::BadDigest)?;
        let digest: [u8; 32] = bytes.try_into().map_err(|_| CredentialError::BadDigest)?;
        Ok(Self {
            salt: salt.to_string(),
            digest,
        })
    }

    pub fn encode(&self) -> String {
        if self.salt.is_empty() {
            hex::encode(self.digest)
        } else {
            format!("{}:{}", self.salt, hex::encode(self.digest))
        }
    }

    pub fn verify(&self, presented: &str) -> bool {
        let candidate = salted_digest(&self.salt, presented);
        constant_time_eq(&candidate, &self.digest)
    }
}

fn salted_digest(salt: &str, key: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(key.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware rejecting any request without a valid `x-api-key` header.
pub async fn require_api_key(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let rejection = match request.headers().get(API_KEY_HEADER).map(|value| value.to_str()) {
        None => Some("no API key"),
        Some(Ok(key)) if state.credential.verify(key) => None,
        Some(_) => Some("invalid API key"),
    };
    if let Some(reason) = rejection {
        debug!("Rejected {} {}: {}", request.method(), request.uri().path(), reason);
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let credential = ApiCredential::from_secret("pepper", "abc123").unwrap();
        assert!(credential.verify("abc123"));
        assert!(!credential.verify("abc124"));
        assert!(!credential.verify(""));
        assert!(!credential.verify("pepperabc123"));
    }

    #[test]
    fn test_verify_rejects_truncations_and_extensions() {
        let credential = ApiCredential::from_secret("pepper", "abc123").unwrap();
        for near in ["a", "ab", "abc", "abc1", "abc12", "abc1234", " abc123", "abc123 ", "ABC123"] {
            assert!(!credential.verify(near), "{near:?} should not verify");
        }
        let unsalted = ApiCredential::parse(&ApiCredential::from_secret("", "abc123").unwrap().encode()).unwrap();
        for near in ["abc", "abc12", "abc1234"] {
            assert!(!unsalted.verify(near), "{near:?} should not verify");
        }
        assert!(unsalted.verify("abc123"));
    }

    #[test]
    fn test_encode_parse() {
        let credential = ApiCredential::from_secret("pepper", "abc123").unwrap();
        let stored = credential.encode();
        assert!(stored.starts_with("pepper:"));
        assert_eq!(ApiCredential::parse(&stored).unwrap(), credential);
    }

    #[test]
    fn test_unsalted_digest() {
        // sha256("abc")
        let credential =
            ApiCredential::parse("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad").unwrap();
        assert!(credential.verify("abc"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(ApiCredential::parse("  "), Err(CredentialError::Empty));
        assert_eq!(ApiCredential::parse("salt:zz"), Err(CredentialError::BadDigest));
        assert_eq!(ApiCredential::parse("salt:abcd"), Err(CredentialError::BadDigest));
        assert_eq!(ApiCredential::from_secret("s", ""), Err(CredentialError::EmptyKey));
    }

    #[test]
    fn test_debug_redacts_digest() {
        let credential = ApiCredential::from_secret("pepper", "abc123").unwrap();
        let shown = format!("{:?}", credential);
        assert!(shown.contains("redacted"));
        assert!(!shown.contains(&hex::encode(credential.digest)));
    }
}
