use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use pantry_raider::auth::TokenGenerator;
use pantry_raider::config::ServerConfig;
use pantry_raider::server::{AppState, create_router};
use pantry_raider::store::{SqliteStore, Store};

/// The full router over a throwaway database, driven in-process.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<SqliteStore>,
    pub admin_token: String,
    _temp_dir: TempDir,
}

pub struct TestUser {
    pub id: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };

        let store = Arc::new(SqliteStore::new(config.db_path()).expect("open store"));
        store.initialize().expect("initialize store");

        let (_, admin_token) = TokenGenerator::new()
            .issue(store.as_ref(), None, None)
            .expect("issue admin token");

        let state = Arc::new(AppState::new(store.clone(), &config));

        Self {
            router: create_router(state),
            store,
            admin_token,
            _temp_dir: temp_dir,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    /// Creates a user through the admin API and issues them a token.
    pub async fn user(&self, email: &str) -> TestUser {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/admin/users",
                Some(&self.admin_token),
                Some(serde_json::json!({ "email": email })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user: {body}");
        let id = body["data"]["id"].as_str().expect("user id").to_string();

        let (status, body) = self
            .request(
                Method::POST,
                &format!("/api/v1/admin/users/{id}/tokens"),
                Some(&self.admin_token),
                Some(serde_json::json!({})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create token: {body}");
        let token = body["data"]["token"].as_str().expect("token").to_string();

        TestUser { id, token }
    }
}
