//! Store abstractions with in-memory (dev/test) and Postgres backends.

use thiserror::Error;

use forumhub_auth::LookupError;

pub mod pagination;
pub mod postgres;
pub mod principals;
pub mod topics;

pub use pagination::{Page, PageRequest};
pub use postgres::{ensure_schema, PostgresPrincipalStore, PostgresTopicStore};
pub use principals::{InMemoryPrincipalStore, PrincipalStore};
pub use topics::{InMemoryTopicStore, TopicStore};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness rule was violated (identifier taken, duplicate topic).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found")]
    NotFound,

    #[error("storage error: {0}")]
    Backend(String),
}

impl From<StoreError> for LookupError {
    fn from(value: StoreError) -> Self {
        LookupError(value.to_string())
    }
}

pub(crate) fn poisoned() -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}
