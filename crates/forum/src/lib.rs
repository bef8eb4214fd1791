//! Forum domain module: topics and the courses they belong to.
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod topic;

pub use topic::{Course, Topic, TopicDraft};
