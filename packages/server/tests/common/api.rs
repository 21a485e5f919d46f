//! In-process HTTP client for the axum router.
//!
//! Requests go through `tower::ServiceExt::oneshot`; no socket is opened.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use server_core::kernel::{ServerDeps, TestDependencies};
use server_core::server::auth::JwksVerifier;
use server_core::server::{build_app, AppState};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub deps: ServerDeps,
}

impl TestApp {
    pub fn new(deps: TestDependencies) -> Self {
        Self::with_jwks(deps, None)
    }

    pub fn with_jwks(deps: TestDependencies, jwks: Option<JwksVerifier>) -> Self {
        let deps = deps.into_deps().expect("test dependencies");
        let router = build_app(AppState::new(deps.clone(), jwks), &[]);
        Self { router, deps }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, None, &[]).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(body), &[]).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, None, &[]).await
    }
}
