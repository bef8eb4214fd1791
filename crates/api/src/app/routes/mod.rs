use axum::{routing::get, Router};

use forumhub_auth::Role;

use crate::authz::{require_role, RequiredRole};

pub mod auth;
pub mod system;
pub mod topics;

/// Router for endpoints that require a signed-in `USER`.
pub fn protected() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/topics", topics::router())
        .route_layer(axum::middleware::from_fn_with_state(
            RequiredRole::new(Role::USER),
            require_role,
        ))
}
