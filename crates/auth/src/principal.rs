use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

use forumhub_core::{DomainError, DomainResult, Entity, UserId};

use crate::Role;

/// A registered identity with credentials and roles.
///
/// `secret_hash` is an Argon2 PHC string; the plaintext never reaches this type.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    /// Unique login identifier (normalized email).
    pub identifier: String,
    pub display_name: String,
    pub secret_hash: String,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    /// A freshly registered principal holding only [`Role::USER`].
    pub fn register(
        display_name: impl Into<String>,
        identifier: impl Into<String>,
        secret_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new(),
            identifier: identifier.into(),
            display_name: display_name.into(),
            secret_hash: secret_hash.into(),
            roles: BTreeSet::from([Role::USER]),
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }
}

impl Entity for Principal {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

impl core::fmt::Debug for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("display_name", &self.display_name)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("principal lookup failed: {0}")]
pub struct LookupError(pub String);

/// Read side of the principal store, as seen by authentication.
#[async_trait]
pub trait PrincipalLookup: Send + Sync {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, LookupError>;
}

/// Canonical form of a login identifier: trimmed, lowercase.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Basic email shape check for login identifiers.
pub fn validate_identifier(identifier: &str) -> DomainResult<()> {
    let invalid = || DomainError::validation("invalid email format");

    if identifier.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = identifier.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    match domain.split_once('.') {
        Some((host, rest)) if !host.is_empty() && !rest.is_empty() && !domain.ends_with('.') => Ok(()),
        _ => Err(invalid()),
    }
}
