use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use forumhub_auth::{LookupError, Principal, PrincipalLookup};

use super::{poisoned, StoreError};

/// Principal persistence: lookup plus registration.
#[async_trait]
pub trait PrincipalStore: PrincipalLookup {
    /// Insert a new principal; `Conflict` if its identifier is taken.
    async fn insert(&self, principal: Principal) -> Result<(), StoreError>;
}

/// In-memory principal store for tests/dev, keyed by identifier.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    inner: RwLock<HashMap<String, Principal>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalLookup for InMemoryPrincipalStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, LookupError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(identifier).cloned())
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn insert(&self, principal: Principal) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&principal.identifier) {
            return Err(StoreError::Conflict(format!(
                "identifier '{}' already registered",
                principal.identifier
            )));
        }
        map.insert(principal.identifier.clone(), principal);
        Ok(())
    }
}
