use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use forumhub_api::app::{router, services::AppServices};
use forumhub_auth::{CredentialVerifier, HashingCost, Hs256JwtCodec, Principal, Role};
use forumhub_infra::{InMemoryPrincipalStore, InMemoryTopicStore};
use reqwest::StatusCode;
use serde_json::json;

const JWT_SECRET: &str = "black-box-test-secret-0123456789abcdef";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, cheap hashing, ephemeral port.
        let services = Arc::new(AppServices {
            principals: Arc::new(InMemoryPrincipalStore::new()),
            topics: Arc::new(InMemoryTopicStore::new()),
            jwt: Arc::new(Hs256JwtCodec::new(JWT_SECRET).unwrap()),
            credentials: CredentialVerifier::new(HashingCost {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            })
            .unwrap(),
            token_ttl: ChronoDuration::minutes(10),
        });
        let app = router(services.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn register(client: &reqwest::Client, srv: &TestServer, email: &str) -> reqwest::Response {
    client
        .post(srv.url("/auth/register"))
        .json(&json!({ "name": "Ana", "email": email, "password": "s3cret-pass" }))
        .send()
        .await
        .unwrap()
}

/// Register `email` and return the raw bearer header value from login.
async fn sign_in(client: &reqwest::Client, srv: &TestServer, email: &str) -> String {
    let res = register(client, srv, email).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": email, "password": "s3cret-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.text().await.unwrap()
}

fn topic_body(title: &str, message: &str) -> serde_json::Value {
    json!({
        "title": title,
        "message": message,
        "created_at": "2024-03-10T09:30:00",
        "status": "open",
        "course": { "name": "Rust", "category": "Programming" },
    })
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_returns_principal_without_hash() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv, "Ana@X.com").await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["email"], "ana@x.com");
    assert_eq!(body["name"], "Ana");
    assert_eq!(body["roles"], json!(["USER"]));
    assert!(body.get("secret_hash").is_none());
    assert!(!body.to_string().contains("argon2"));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    assert_eq!(register(&client, &srv, "ana@x.com").await.status(), StatusCode::CREATED);
    assert_eq!(register(&client, &srv, "ANA@x.com").await.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_registration_is_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    assert_eq!(register(&client, &srv, "not-an-email").await.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "name": "  ", "email": "ana@x.com", "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "ana@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_returns_bearer_token_as_plain_text() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let bearer = sign_in(&client, &srv, "ana@x.com").await;
    assert!(bearer.starts_with("Bearer "));
    assert_eq!(bearer.trim_start_matches("Bearer ").split('.').count(), 3);
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv, "ana@x.com").await;

    let wrong_password = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "ana@x.com", "password": "nope" }))
        .send()
        .await
        .unwrap();
    let unknown_user = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "bob@x.com", "password": "s3cret-pass" }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let a: serde_json::Value = wrong_password.json().await.unwrap();
    let b: serde_json::Value = unknown_user.json().await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn auth_paths_ignore_garbage_tokens() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/register"))
        .header("Authorization", "Bearer garbage")
        .json(&json!({ "name": "Ana", "email": "ana@x.com", "password": "s3cret-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/auth/login"))
        .header("Authorization", "Bearer garbage")
        .json(&json!({ "email": "ana@x.com", "password": "s3cret-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/whoami", "/topics"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthenticated");
    }
}

#[tokio::test]
async fn garbage_and_expired_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv, "ana@x.com").await;

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = srv
        .services
        .jwt
        .issue("ana@x.com", Utc::now() - ChronoDuration::hours(2), ChronoDuration::minutes(10))
        .unwrap();
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn whoami_reflects_the_token_subject() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let bearer = sign_in(&client, &srv, "ana@x.com").await;

    let res = client
        .get(srv.url("/whoami"))
        .header("Authorization", bearer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["email"], "ana@x.com");
}

#[tokio::test]
async fn principal_without_user_role_is_forbidden() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut admin = Principal::register("Root", "root@x.com", "unused");
    admin.roles = BTreeSet::from([Role::ADMIN]);
    srv.services.principals.insert(admin).await.unwrap();

    let token = srv
        .services
        .jwt
        .issue("root@x.com", Utc::now(), ChronoDuration::minutes(5))
        .unwrap();
    let res = client
        .get(srv.url("/topics"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn topic_crud_round_trip() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let bearer = sign_in(&client, &srv, "ana@x.com").await;

    let res = client
        .post(srv.url("/topics"))
        .header("Authorization", &bearer)
        .json(&topic_body("Lifetimes", "How do they work?"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["course"]["name"], "Rust");

    let duplicate = client
        .post(srv.url("/topics"))
        .header("Authorization", &bearer)
        .json(&topic_body("Lifetimes", "How do they work?"))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let res = client
        .get(srv.url(&format!("/topics/{id}")))
        .header("Authorization", &bearer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .put(srv.url(&format!("/topics/{id}")))
        .header("Authorization", &bearer)
        .json(&topic_body("Lifetimes", "Answered: read the book"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["message"], "Answered: read the book");
    assert_eq!(updated["author_id"], created["author_id"]);

    let res = client
        .get(srv.url("/topics/filter?course_name=Rust&year=2024"))
        .header("Authorization", &bearer)
        .send()
        .await
        .unwrap();
    let found: serde_json::Value = res.json().await.unwrap();
    assert_eq!(found.as_array().unwrap().len(), 1);

    let res = client
        .delete(srv.url(&format!("/topics/{id}")))
        .header("Authorization", &bearer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/topics/{id}")))
        .header("Authorization", &bearer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn topic_list_is_paged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let bearer = sign_in(&client, &srv, "ana@x.com").await;

    for i in 0..3 {
        let res = client
            .post(srv.url("/topics"))
            .header("Authorization", &bearer)
            .json(&topic_body(&format!("Topic {i}"), "body"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .get(srv.url("/topics?page=1&size=2"))
        .header("Authorization", &bearer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: serde_json::Value = res.json().await.unwrap();
    assert_eq!(page["total_elements"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["content"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_topic_id_is_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let bearer = sign_in(&client, &srv, "ana@x.com").await;

    let res = client
        .get(srv.url("/topics/not-a-uuid"))
        .header("Authorization", &bearer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
