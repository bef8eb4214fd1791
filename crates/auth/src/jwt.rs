//! HS256 token codec.
//!
//! Tokens are compact JWS strings (`header.payload.signature`, base64url)
//! signed with one process-wide secret handed to [`Hs256JwtCodec::new`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{validate_claims, JwtClaims, TokenValidationError};

/// Minimum HMAC-SHA256 key length (256 bits).
pub const MIN_SECRET_LEN: usize = 32;

/// Verifies bearer tokens against a caller-supplied clock.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenIssueError {
    #[error("signing secret must be at least {MIN_SECRET_LEN} bytes, got {0}")]
    WeakSecret(usize),

    #[error("token subject must not be empty")]
    EmptySubject,

    #[error("token lifetime must be positive")]
    InvalidTtl,

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// Issues and verifies HS256 tokens.
///
/// The algorithm is pinned: a token whose header names anything other than
/// HS256 is rejected before its signature is even considered.
#[derive(Clone)]
pub struct Hs256JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl core::fmt::Debug for Hs256JwtCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtCodec").finish_non_exhaustive()
    }
}

impl Hs256JwtCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, TokenIssueError> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenIssueError::WeakSecret(secret.len()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `validate_claims` against the injected clock.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Sign a token for `subject` valid from `now` for `ttl`.
    pub fn issue(&self, subject: &str, now: DateTime<Utc>, ttl: Duration) -> Result<String, TokenIssueError> {
        let claims = JwtClaims::new(subject, now, ttl)?;
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenIssueError::Encoding(e.to_string()))
    }
}

impl JwtValidator for Hs256JwtCodec {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| map_decode_error(token, &e))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

fn map_decode_error(token: &str, err: &jsonwebtoken::errors::Error) -> TokenValidationError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            TokenValidationError::SignatureMismatch
        }
        ErrorKind::ExpiredSignature => TokenValidationError::Expired,
        // jsonwebtoken cannot parse headers naming algorithms it does not know ("none").
        _ if names_foreign_algorithm(token) => TokenValidationError::SignatureMismatch,
        _ => TokenValidationError::Malformed,
    }
}

/// The header segment decodes to JSON whose `alg` is anything but HS256.
fn names_foreign_algorithm(token: &str) -> bool {
    let Some((header, _)) = token.split_once('.') else {
        return false;
    };
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(header) else {
        return false;
    };
    let Ok(header) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return false;
    };
    header
        .get("alg")
        .is_some_and(|alg| alg.as_str() != Some("HS256"))
}
