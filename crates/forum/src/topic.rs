use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use forumhub_core::error::require_non_blank;
use forumhub_core::{DomainResult, Entity, TopicId, UserId};

/// Course a topic is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub name: String,
    pub category: String,
}

impl Course {
    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("course.name", &self.name)?;
        require_non_blank("course.category", &self.category)
    }
}

/// User-supplied topic content, used for both creation and revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDraft {
    pub title: String,
    pub message: String,
    pub created_at: NaiveDateTime,
    pub status: String,
    pub course: Course,
}

impl TopicDraft {
    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("title", &self.title)?;
        require_non_blank("message", &self.message)?;
        require_non_blank("status", &self.status)?;
        self.course.validate()
    }
}

/// A discussion topic.
///
/// No two topics may share the same title and message; stores enforce that
/// on insert and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    title: String,
    message: String,
    created_at: NaiveDateTime,
    status: String,
    author: UserId,
    course: Course,
}

impl Topic {
    /// Open a new topic authored by `author`.
    pub fn create(draft: TopicDraft, author: UserId) -> DomainResult<Self> {
        draft.validate()?;
        Ok(Self {
            id: TopicId::new(),
            title: draft.title,
            message: draft.message,
            created_at: draft.created_at,
            status: draft.status,
            author,
            course: draft.course,
        })
    }

    /// Rebuild a topic from storage without re-validating it.
    pub fn restore(id: TopicId, draft: TopicDraft, author: UserId) -> Self {
        Self {
            id,
            title: draft.title,
            message: draft.message,
            created_at: draft.created_at,
            status: draft.status,
            author,
            course: draft.course,
        }
    }

    /// Replace the editable content. Id and authorship are kept.
    pub fn revise(&mut self, draft: TopicDraft) -> DomainResult<()> {
        draft.validate()?;
        self.title = draft.title;
        self.message = draft.message;
        self.created_at = draft.created_at;
        self.status = draft.status;
        self.course = draft.course;
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn author(&self) -> UserId {
        self.author
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    /// True when `other` would violate the title+message uniqueness rule.
    pub fn duplicates(&self, other: &Topic) -> bool {
        self.id != other.id && self.title == other.title && self.message == other.message
    }

    /// Filed under `course_name` and created during calendar `year`.
    pub fn is_in_course_year(&self, course_name: &str, year: i32) -> bool {
        self.course.name == course_name && self.created_at.year() == year
    }
}

impl Entity for Topic {
    type Id = TopicId;

    fn id(&self) -> TopicId {
        self.id
    }
}
