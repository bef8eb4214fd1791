//! Postgres-backed stores.
//!
//! Both stores share one `PgPool`. Uniqueness rules live in the schema
//! (unique identifier, unique title+message digest) so concurrent writers
//! cannot race past them; SQLSTATE 23505 surfaces as `StoreError::Conflict`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use forumhub_auth::{LookupError, Principal, PrincipalLookup, Role};
use forumhub_core::{Entity, TopicId, UserId};
use forumhub_forum::{Course, Topic, TopicDraft};

use super::{Page, PageRequest, PrincipalStore, StoreError, TopicStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS principals (
    id           UUID PRIMARY KEY,
    identifier   TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    secret_hash  TEXT NOT NULL,
    roles        TEXT[] NOT NULL
);

CREATE TABLE IF NOT EXISTS topics (
    id              UUID PRIMARY KEY,
    title           TEXT NOT NULL,
    message         TEXT NOT NULL,
    created_at      TIMESTAMP NOT NULL,
    status          TEXT NOT NULL,
    author_id       UUID NOT NULL REFERENCES principals (id),
    course_name     TEXT NOT NULL,
    course_category TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS topics_title_message_key
    ON topics (md5(title), md5(message));

CREATE INDEX IF NOT EXISTS topics_created_at_idx
    ON topics (created_at, id);

CREATE INDEX IF NOT EXISTS topics_course_name_idx
    ON topics (course_name);
"#;

/// Create tables and indexes if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    tracing::info!("database schema ready");
    Ok(())
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode_error(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row in {}: {}", operation, err))
}

pub struct PostgresPrincipalStore {
    pool: PgPool,
}

impl PostgresPrincipalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn principal_from_row(row: &PgRow) -> Result<Principal, sqlx::Error> {
    let roles: Vec<String> = row.try_get("roles")?;
    Ok(Principal {
        id: UserId::from_uuid(row.try_get("id")?),
        identifier: row.try_get("identifier")?,
        display_name: row.try_get("display_name")?,
        secret_hash: row.try_get("secret_hash")?,
        roles: roles.into_iter().map(Role::new).collect::<BTreeSet<_>>(),
    })
}

#[async_trait]
impl PrincipalLookup for PostgresPrincipalStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, LookupError> {
        let row = sqlx::query(
            r#"
            SELECT id, identifier, display_name, secret_hash, roles
            FROM principals
            WHERE identifier = $1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_principal", e))?;

        match row {
            Some(row) => Ok(Some(
                principal_from_row(&row).map_err(|e| decode_error("find_principal", e))?,
            )),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PrincipalStore for PostgresPrincipalStore {
    async fn insert(&self, principal: Principal) -> Result<(), StoreError> {
        let roles: Vec<String> = principal.roles.iter().map(|r| r.as_str().to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO principals (id, identifier, display_name, secret_hash, roles)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(principal.id.as_uuid())
        .bind(&principal.identifier)
        .bind(&principal.display_name)
        .bind(&principal.secret_hash)
        .bind(&roles)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_principal", e))?;

        Ok(())
    }
}

pub struct PostgresTopicStore {
    pool: PgPool,
}

impl PostgresTopicStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TOPIC_COLUMNS: &str =
    "id, title, message, created_at, status, author_id, course_name, course_category";

fn topic_from_row(row: &PgRow) -> Result<Topic, sqlx::Error> {
    let draft = TopicDraft {
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
        status: row.try_get("status")?,
        course: Course {
            name: row.try_get("course_name")?,
            category: row.try_get("course_category")?,
        },
    };
    Ok(Topic::restore(
        TopicId::from_uuid(row.try_get("id")?),
        draft,
        UserId::from_uuid(row.try_get("author_id")?),
    ))
}

fn topics_from_rows(operation: &str, rows: Vec<PgRow>) -> Result<Vec<Topic>, StoreError> {
    rows.iter()
        .map(|r| topic_from_row(r).map_err(|e| decode_error(operation, e)))
        .collect()
}

#[async_trait]
impl TopicStore for PostgresTopicStore {
    async fn insert(&self, topic: Topic) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO topics (id, title, message, created_at, status, author_id, course_name, course_category)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(topic.id().as_uuid())
        .bind(topic.title())
        .bind(topic.message())
        .bind(topic.created_at())
        .bind(topic.status())
        .bind(topic.author().as_uuid())
        .bind(&topic.course().name)
        .bind(&topic.course().category)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_topic", e))?;

        Ok(())
    }

    async fn get(&self, id: TopicId) -> Result<Option<Topic>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_topic", e))?;

        row.map(|r| topic_from_row(&r).map_err(|e| decode_error("get_topic", e)))
            .transpose()
    }

    async fn update(&self, topic: Topic) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE topics
            SET title = $2,
                message = $3,
                created_at = $4,
                status = $5,
                course_name = $6,
                course_category = $7
            WHERE id = $1
            "#,
        )
        .bind(topic.id().as_uuid())
        .bind(topic.title())
        .bind(topic.message())
        .bind(topic.created_at())
        .bind(topic.status())
        .bind(&topic.course().name)
        .bind(&topic.course().category)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_topic", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: TopicId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_topic", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Topic>, StoreError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM topics")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_topics", e))?
            .try_get("total")
            .map_err(|e| decode_error("count_topics", e))?;

        let rows = sqlx::query(&format!(
            "SELECT {TOPIC_COLUMNS} FROM topics ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.size))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_topics", e))?;

        let content = topics_from_rows("list_topics", rows)?;
        Ok(Page::new(content, page, u64::try_from(total).unwrap_or(0)))
    }

    async fn find_by_course_and_year(
        &self,
        course_name: &str,
        year: i32,
    ) -> Result<Vec<Topic>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TOPIC_COLUMNS} FROM topics \
             WHERE course_name = $1 AND date_part('year', created_at)::int = $2 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(course_name)
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("filter_topics", e))?;

        topics_from_rows("filter_topics", rows)
    }
}
