use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Local;

use forumhub_core::TopicId;
use forumhub_forum::Topic;
use forumhub_infra::PageRequest;

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_topics).post(create_topic))
        .route("/filter", get(filter_topics))
        .route("/:id", get(get_topic).put(update_topic).delete(delete_topic))
}

fn parse_topic_id(raw: &str) -> Result<TopicId, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub async fn list_topics(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    let request = PageRequest::new(query.page, query.size);
    match services.topics.list(request).await {
        Ok(page) => Json(dto::topic_page_to_json(page)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn filter_topics(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::CourseYearQuery>,
) -> axum::response::Response {
    match services
        .topics
        .find_by_course_and_year(&query.course_name, query.year)
        .await
    {
        Ok(topics) => {
            Json(topics.iter().map(dto::topic_to_json).collect::<Vec<_>>()).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_topic(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_topic_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.topics.get(id).await {
        Ok(Some(topic)) => Json(dto::topic_to_json(&topic)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "topic not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_topic(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::TopicRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let topic = match Topic::create(body.into_draft(Local::now().naive_local()), principal.user_id()) {
        Ok(t) => t,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.topics.insert(topic.clone()).await {
        Ok(()) => {
            tracing::info!(author = %principal.identifier(), "topic created");
            (StatusCode::CREATED, Json(dto::topic_to_json(&topic))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Replace a topic's content. The author stays the original one.
pub async fn update_topic(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::TopicRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_topic_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let mut topic = match services.topics.get(id).await {
        Ok(Some(topic)) => topic,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "topic not found"),
        Err(e) => return errors::store_error_to_response(e),
    };

    if let Err(e) = topic.revise(body.into_draft(Local::now().naive_local())) {
        return errors::domain_error_to_response(e);
    }

    match services.topics.update(topic.clone()).await {
        Ok(()) => Json(dto::topic_to_json(&topic)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_topic(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_topic_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.topics.delete(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "topic not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
