#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use bakery_catalog::{
    auth::ADMIN_ROLE,
    build_router,
    config::AppConfig,
    db,
    repositories::{InMemoryProductRepository, ProductRepository, SeaOrmProductRepository},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Helper harness wrapping the full application router.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    admin_token: String,
    customer_token: String,
}

impl TestApp {
    /// Application over the in-memory repository.
    pub async fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryProductRepository::new())).await
    }

    /// Application over a migrated in-memory SQLite database.
    pub async fn with_sqlite() -> Self {
        let pool = db::establish_connection("sqlite::memory:")
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        Self::with_repository(Arc::new(SeaOrmProductRepository::new(Arc::new(pool)))).await
    }

    pub async fn with_repository(repository: Arc<dyn ProductRepository>) -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:".to_string(), TEST_JWT_SECRET.to_string());
        cfg.environment = "test".to_string();

        let state = AppState::new(cfg, repository);
        let admin_token = state
            .auth
            .issue_token("admin-1", Some("admin@padaria.test".into()), vec![ADMIN_ROLE.into()])
            .expect("issue admin token");
        let customer_token = state
            .auth
            .issue_token("customer-1", Some("cliente@padaria.test".into()), vec![])
            .expect("issue customer token");

        Self {
            router: build_router(state.clone()),
            state,
            admin_token,
            customer_token,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn customer_token(&self) -> &str {
        &self.customer_token
    }

    /// Bearer token for an arbitrary caller.
    pub fn token_for(&self, user_id: &str, roles: Vec<String>) -> String {
        self.state
            .auth
            .issue_token(user_id, None, roles)
            .expect("issue token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.request(Method::GET, uri, None, None).await
    }

    /// Convenience helper for admin JSON requests.
    pub async fn admin(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.admin_token())).await
    }

    /// Create a product through the admin API and return its JSON body.
    pub async fn create_product(&self, payload: Value) -> Value {
        let response = self
            .admin(Method::POST, "/api/v1/admin/products", Some(payload))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await
    }

    /// Minimal valid nested payload.
    pub async fn create_named(&self, name: &str, category: &str) -> Value {
        self.create_product(json!({
            "name": name,
            "category": { "name": category },
            "price": { "amount": 5.0, "unit": "UN" },
            "image": { "href": "/img/x.png" }
        }))
        .await
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is JSON")
}
