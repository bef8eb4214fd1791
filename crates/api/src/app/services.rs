use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use sqlx::PgPool;

use forumhub_auth::{AuthError, CredentialVerifier, Hs256JwtCodec, Principal, TokenIssueError};
use forumhub_infra::{
    store::ensure_schema, InMemoryPrincipalStore, InMemoryTopicStore, PostgresPrincipalStore,
    PostgresTopicStore, PrincipalStore, TopicStore,
};

use crate::config::{ApiConfig, StoreBackend};

/// Everything handlers need, shared behind an `Arc` for the life of the process.
pub struct AppServices {
    pub principals: Arc<dyn PrincipalStore>,
    pub topics: Arc<dyn TopicStore>,
    pub jwt: Arc<Hs256JwtCodec>,
    pub credentials: CredentialVerifier,
    pub token_ttl: chrono::Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenIssueError),
}

impl AppServices {
    /// Check credentials and mint a bearer token for the principal.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<String, LoginError> {
        let principal = self
            .credentials
            .authenticate(self.principals.as_ref(), identifier, secret)
            .await?;
        Ok(self.jwt.issue(&principal.identifier, Utc::now(), self.token_ttl)?)
    }

    pub fn new_principal(&self, name: &str, identifier: String, secret: &str) -> Result<Principal, AuthError> {
        let hash = self.credentials.hash_secret(secret)?;
        Ok(Principal::register(name.trim(), identifier, hash))
    }
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let jwt = Arc::new(Hs256JwtCodec::new(config.jwt_secret.as_bytes()).context("invalid JWT secret")?);
    let credentials = CredentialVerifier::new(config.hashing).context("invalid hashing cost")?;

    let (principals, topics): (Arc<dyn PrincipalStore>, Arc<dyn TopicStore>) = match &config.store {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory stores");
            let principals: Arc<dyn PrincipalStore> = Arc::new(InMemoryPrincipalStore::new());
            let topics: Arc<dyn TopicStore> = Arc::new(InMemoryTopicStore::new());
            (principals, topics)
        }
        StoreBackend::Postgres { database_url } => {
            let pool = PgPool::connect(database_url)
                .await
                .context("failed to connect to Postgres")?;
            ensure_schema(&pool).await.context("failed to create schema")?;
            tracing::info!("using Postgres stores");
            let principals: Arc<dyn PrincipalStore> = Arc::new(PostgresPrincipalStore::new(pool.clone()));
            let topics: Arc<dyn TopicStore> = Arc::new(PostgresTopicStore::new(pool));
            (principals, topics)
        }
    };

    Ok(AppServices {
        principals,
        topics,
        jwt,
        credentials,
        token_ttl: config.token_ttl,
    })
}
