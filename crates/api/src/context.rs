use std::collections::BTreeSet;

use forumhub_auth::{Principal, Role};
use forumhub_core::UserId;

/// Principal context for a request (authenticated identity + roles).
///
/// Lives only in the in-flight request's extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.id
    }

    pub fn identifier(&self) -> &str {
        &self.principal.identifier
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.principal.roles
    }
}
