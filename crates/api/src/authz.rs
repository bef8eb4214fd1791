//! API-side role gate.
//!
//! Each protected router declares its required role when it is built, via
//! [`require_role`]. The gate runs after identity resolution and before the
//! handler body.

use axum::{extract::State, middleware::Next, response::Response};

use forumhub_auth::{authorize, AuthzError, Role};

use crate::app::errors;
use crate::context::PrincipalContext;

/// The role a route needs; `None` admits everyone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequiredRole(pub Option<Role>);

impl RequiredRole {
    pub fn new(role: Role) -> Self {
        Self(Some(role))
    }
}

/// Check the request's bound principal, if any, against `required`.
pub fn check(principal: Option<&PrincipalContext>, required: &RequiredRole) -> Result<(), AuthzError> {
    authorize(principal.map(PrincipalContext::roles), required.0.as_ref())
}

/// Build a route layer enforcing `role`.
///
/// ```ignore
/// Router::new()
///     .route("/whoami", get(whoami))
///     .route_layer(axum::middleware::from_fn_with_state(
///         RequiredRole::new(Role::USER),
///         require_role,
///     ));
/// ```
pub async fn require_role(
    State(required): State<RequiredRole>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let outcome = check(req.extensions().get::<PrincipalContext>(), &required);
    match outcome {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::debug!(reason = %err, path = %req.uri().path(), "role gate denied request");
            errors::authz_error_to_response(err)
        }
    }
}
