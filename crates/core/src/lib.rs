//! `forumhub-core`: shared identifiers and the domain error model.
//!
//! Nothing here knows about HTTP, tokens or storage.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{require_non_blank, DomainError, DomainResult};
pub use id::{TopicId, UserId};
