use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jwt::TokenIssueError;

/// JWT claims carried by every access token.
///
/// On the wire the timestamps are `iat`/`exp` in epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the principal's login identifier.
    pub sub: String,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    /// Claims for `subject` valid from `now` for `ttl`.
    ///
    /// `now` is truncated to whole seconds, matching what survives encoding.
    pub fn new(subject: &str, now: DateTime<Utc>, ttl: Duration) -> Result<Self, TokenIssueError> {
        if subject.is_empty() {
            return Err(TokenIssueError::EmptySubject);
        }
        if ttl <= Duration::zero() {
            return Err(TokenIssueError::InvalidTtl);
        }
        let issued_at = now.trunc_subsecs(0);
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or(TokenIssueError::InvalidTtl)?;
        Ok(Self {
            sub: subject.to_string(),
            issued_at,
            expires_at,
        })
    }
}

/// Why a presented token was not accepted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidationError {
    /// Not three decodable segments, bad JSON, missing claims or an
    /// impossible validity window.
    #[error("malformed token")]
    Malformed,

    /// Signature does not match, or the header names another algorithm.
    #[error("token signature mismatch")]
    SignatureMismatch,

    #[error("token has expired")]
    Expired,
}

/// Validate already-authenticated claims against `now`.
///
/// Signature verification happens before this is called; see
/// [`crate::jwt::Hs256JwtCodec`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.sub.is_empty() || claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::Malformed);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
