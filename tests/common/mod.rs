#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use std::path::PathBuf;
use tower::ServiceExt;
use userhub::config::{Config, Environment};

pub const PASSWORD: &str = "Sup3r$ecret-Passw0rd!";

pub struct TestApp {
    pub router: Router,
    pub images: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.images).ok();
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.environment = Environment::Dev;
    config.server.secure_cookies = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.security.argon2_parallelism = 1;
    config.scheduler.enabled = false;
    config.uploads.images_path = std::env::temp_dir()
        .join(format!("userhub-test-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let images = PathBuf::from(&config.uploads.images_path);
    let state = userhub::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");

    TestApp {
        router: userhub::api::router(state).await,
        images,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(json_request("POST", uri, None, &body)).await
    }

    pub async fn get_authed(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_with_cookie(&self, uri: &str, cookie: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Registers an account and returns `(access_token, refresh_cookie)`.
    pub async fn register(&self, email: &str, remember_me: bool) -> (String, String) {
        let response = self
            .post_json(
                "/api/auth/register",
                serde_json::json!({
                    "email": email,
                    "password": PASSWORD,
                    "remember_me": remember_me,
                }),
            )
            .await;
        assert_eq!(response.status(), 201);

        let cookie = refresh_cookie(&response).expect("register sets the refresh cookie");
        let json = body_json(response).await;
        let token = json["data"]["access_token"].as_str().unwrap().to_string();
        (token, cookie)
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// The `name=value` pair of the refresh cookie, ready for a `Cookie` header.
pub fn refresh_cookie(response: &Response<Body>) -> Option<String> {
    set_cookie_header(response)
        .and_then(|value| value.split(';').next().map(str::to_string))
        .filter(|pair| pair != "REFRESH_TOKEN=")
}

pub fn set_cookie_header(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("REFRESH_TOKEN="))
        .map(str::to_string)
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
