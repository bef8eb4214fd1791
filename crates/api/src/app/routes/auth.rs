//! Login and registration. Both paths are skipped by identity resolution.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use forumhub_auth::{normalize_identifier, validate_identifier, AuthError};
use forumhub_core::{require_non_blank, DomainResult};
use forumhub_infra::StoreError;

use crate::app::{dto, errors};
use crate::app::services::{AppServices, LoginError};

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let identifier = normalize_identifier(&body.email);

    match services.login(&identifier, &body.password).await {
        Ok(token) => {
            tracing::info!(identifier = %identifier, "login succeeded");
            (
                StatusCode::OK,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                format!("Bearer {token}"),
            )
                .into_response()
        }
        Err(LoginError::Auth(AuthError::InvalidCredentials)) => {
            tracing::info!(identifier = %identifier, "login rejected");
            errors::json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid credentials")
        }
        Err(e) => {
            tracing::error!(error = %e, "login failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "login failed")
        }
    }
}

fn validate_registration(body: &dto::RegisterRequest, identifier: &str) -> DomainResult<()> {
    require_non_blank("name", &body.name)?;
    require_non_blank("password", &body.password)?;
    validate_identifier(identifier)
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::RegisterRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let identifier = normalize_identifier(&body.email);
    if let Err(e) = validate_registration(&body, &identifier) {
        return errors::domain_error_to_response(e);
    }

    let principal = match services.new_principal(&body.name, identifier, &body.password) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "failed to hash secret");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "registration failed");
        }
    };

    match services.principals.insert(principal.clone()).await {
        Ok(()) => {
            tracing::info!(identifier = %principal.identifier, "principal registered");
            (StatusCode::CREATED, Json(dto::principal_to_json(&principal))).into_response()
        }
        Err(StoreError::Conflict(_)) => errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            "a principal with this email already exists",
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}
