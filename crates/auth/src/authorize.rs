use std::collections::BTreeSet;

use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The route needs a principal and none is bound to the request.
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: missing role '{0}'")]
    Forbidden(Role),
}

/// Check the roles granted to the request's principal against a route's
/// requirement.
///
/// `granted` is `None` when no principal is bound. A route without a
/// required role admits everyone.
///
/// - No IO
/// - No panics
pub fn authorize(granted: Option<&BTreeSet<Role>>, required: Option<&Role>) -> Result<(), AuthzError> {
    let Some(required) = required else {
        return Ok(());
    };
    let granted = granted.ok_or(AuthzError::Unauthenticated)?;

    if granted.contains(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.clone()))
    }
}
