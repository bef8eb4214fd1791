//! Request identity resolution.
//!
//! Runs before every handler. A request either carries no identity (bypassed
//! path, no bearer header) and proceeds without a [`PrincipalContext`], or
//! carries a bearer token that must verify and name an existing principal.
//! A bad token aborts the request with 401; the handler never runs.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use thiserror::Error;

use forumhub_auth::{JwtValidator, LookupError, PrincipalLookup, TokenValidationError};
use forumhub_infra::PrincipalStore;

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

/// Paths that never resolve an identity, whatever headers they carry.
pub const BYPASS_PATHS: [&str; 2] = ["/auth/login", "/auth/register"];

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub principals: Arc<dyn PrincipalStore>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("token rejected: {0}")]
    Token(#[from] TokenValidationError),

    #[error("token subject does not exist")]
    UnknownSubject,

    #[error("principal lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Rejection::Token(_) | Rejection::UnknownSubject => {
                json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid or expired token")
            }
            Rejection::Lookup(_) => json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "could not resolve principal",
            ),
        }
    }
}

/// The bearer token a request presents, if identity resolution applies to it.
///
/// `None` for bypassed paths, a missing header, a header that is not visible
/// ASCII, or one without the literal `Bearer ` prefix.
pub fn bearer_token<'a>(path: &str, headers: &'a HeaderMap) -> Option<&'a str> {
    if BYPASS_PATHS.contains(&path) {
        return None;
    }
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

/// Verify `token` and load the principal it names.
pub async fn resolve_principal<L>(
    token: &str,
    jwt: &dyn JwtValidator,
    principals: &L,
    now: DateTime<Utc>,
) -> Result<PrincipalContext, Rejection>
where
    L: PrincipalLookup + ?Sized,
{
    let claims = jwt.validate(token, now)?;
    let principal = principals
        .find_by_identifier(&claims.sub)
        .await?
        .ok_or(Rejection::UnknownSubject)?;
    Ok(PrincipalContext::new(principal))
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.uri().path(), req.headers()).map(str::to_owned) else {
        tracing::debug!(path = %req.uri().path(), "no bearer token; continuing without identity");
        return next.run(req).await;
    };

    match resolve_principal(&token, state.jwt.as_ref(), state.principals.as_ref(), Utc::now()).await {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(rejection) => {
            match &rejection {
                Rejection::Lookup(e) => tracing::error!(error = %e, "principal lookup failed"),
                other => tracing::warn!(reason = %other, path = %req.uri().path(), "rejecting request"),
            }
            rejection.into_response()
        }
    }
}
