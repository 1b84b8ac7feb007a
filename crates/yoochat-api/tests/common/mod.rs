#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use yoochat_api::{AppState, AppStateInner, router};
use yoochat_crypto::HillCipher;
use yoochat_db::Database;
use yoochat_gateway::Dispatcher;
use yoochat_social::Social;
use yoochat_types::models::SearchMode;

pub const PASSWORD: &str = "Secret1";
pub const BOUNDARY: &str = "yoochat-test-boundary";

/// Full router over an in-memory database and a temporary upload dir.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_search_mode(SearchMode::Strict)
    }

    pub fn with_search_mode(mode: SearchMode) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let cipher = Arc::new(HillCipher::from_key("GYBNQKURP").unwrap());
        let social = Arc::new(Social::new(db, cipher, mode, "integration-secret"));

        let state: AppState = Arc::new(AppStateInner {
            social,
            dispatcher: Dispatcher::new(),
            upload_dir: uploads.path().to_path_buf(),
        });

        Self {
            router: router(state.clone()),
            state,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(build(Method::GET, uri, token, Body::empty(), None))
            .await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, token, body).await
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let request = build(
            method,
            uri,
            token,
            Body::from(body.to_string()),
            Some("application/json"),
        );
        self.send(request).await
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        parts: &[Part],
    ) -> (StatusCode, Value) {
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        let request = build(
            method,
            uri,
            token,
            Body::from(multipart_body(parts)),
            Some(&content_type),
        );
        self.send(request).await
    }

    /// Register `name` with a valid password and return the new user id.
    pub async fn register(&self, name: &str) -> i64 {
        let (status, body) = self
            .post(
                "/register",
                None,
                json!({
                    "username": name,
                    "email": format!("{name}@example.com"),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {name}: {body}");
        body["user"]["user_id"].as_i64().unwrap()
    }

    pub async fn login(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/login",
                None,
                json!({ "email": format!("{name}@example.com"), "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login {name}: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Register and log in; returns (user_id, token).
    pub async fn user(&self, name: &str) -> (i64, String) {
        let id = self.register(name).await;
        (id, self.login(name).await)
    }

    pub async fn befriend(&self, a: (i64, &str), b: (i64, &str)) {
        let (status, _) = self
            .post("/friendship/sendRequest", Some(a.1), json!({ "receiver_id": b.0 }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = self
            .post("/friendship/acceptRequest", Some(b.1), json!({ "sender_id": a.0 }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    pub fn uploaded_files(&self) -> usize {
        std::fs::read_dir(self.uploads.path())
            .map(|dir| dir.count())
            .unwrap_or(0)
    }
}

/// One multipart section; `file_name` is set for file parts.
pub struct Part {
    name: String,
    file_name: Option<String>,
    data: Vec<u8>,
}

pub fn field(name: &str, text: &str) -> Part {
    Part {
        name: name.to_string(),
        file_name: None,
        data: text.as_bytes().to_vec(),
    }
}

pub fn file(name: &str, file_name: &str, data: &[u8]) -> Part {
    Part {
        name: name.to_string(),
        file_name: Some(file_name.to_string()),
        data: data.to_vec(),
    }
}

fn build(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Body,
    content_type: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap()
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for Part { name, file_name, data } in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
