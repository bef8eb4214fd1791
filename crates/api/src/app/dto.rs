use chrono::NaiveDateTime;
use serde::Deserialize;

use forumhub_auth::Principal;
use forumhub_core::Entity;
use forumhub_forum::{Course, Topic, TopicDraft};
use forumhub_infra::Page;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CourseRequest {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct TopicRequest {
    pub title: String,
    pub message: String,
    /// Defaults to the time the request is handled.
    pub created_at: Option<NaiveDateTime>,
    pub status: String,
    pub course: CourseRequest,
}

impl TopicRequest {
    pub fn into_draft(self, now: NaiveDateTime) -> TopicDraft {
        TopicDraft {
            title: self.title,
            message: self.message,
            created_at: self.created_at.unwrap_or(now),
            status: self.status,
            course: Course {
                name: self.course.name,
                category: self.course.category,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CourseYearQuery {
    pub course_name: String,
    pub year: i32,
}

// -------------------------
// JSON mapping helpers
// -------------------------

/// Public view of a principal; the secret hash is never included.
pub fn principal_to_json(principal: &Principal) -> serde_json::Value {
    serde_json::json!({
        "id": principal.id.to_string(),
        "name": principal.display_name,
        "email": principal.identifier,
        "roles": principal.roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    })
}

pub fn topic_to_json(topic: &Topic) -> serde_json::Value {
    serde_json::json!({
        "id": topic.id().to_string(),
        "title": topic.title(),
        "message": topic.message(),
        "created_at": topic.created_at(),
        "status": topic.status(),
        "author_id": topic.author().to_string(),
        "course": {
            "name": topic.course().name,
            "category": topic.course().category,
        },
    })
}

pub fn topic_page_to_json(page: Page<Topic>) -> serde_json::Value {
    serde_json::json!(page.map(|topic| topic_to_json(&topic)))
}
