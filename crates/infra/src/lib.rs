//! Infrastructure layer: principal and topic persistence.

pub mod store;

pub use store::{
    InMemoryPrincipalStore, InMemoryTopicStore, Page, PageRequest, PostgresPrincipalStore,
    PostgresTopicStore, PrincipalStore, StoreError, TopicStore,
};
