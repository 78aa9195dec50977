use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, ImageStorageService, JwtService, ProfileService, UserService,
};
use crate::state::SharedState;

pub mod auth;
pub mod cookies;
mod error;
mod health;
mod observability;
mod profiles;
mod types;
mod users;
mod validation;

pub use auth::CurrentUser;
pub use cookies::RefreshCookie;
pub use error::ApiError;
pub use types::*;

/// Multipart framing on top of the raw image bytes.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub refresh_cookie: RefreshCookie,

    /// Prefix for image paths in responses.
    pub public_url: Option<String>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn jwt(&self) -> &JwtService {
        &self.shared.jwt
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn user_service(&self) -> &Arc<dyn UserService> {
        &self.shared.user_service
    }

    #[must_use]
    pub fn profile_service(&self) -> &Arc<dyn ProfileService> {
        &self.shared.profile_service
    }

    #[must_use]
    pub fn image_service(&self) -> &ImageStorageService {
        &self.shared.image_service
    }

    #[must_use]
    pub fn public_url(&self) -> Option<&str> {
        self.public_url.as_deref()
    }
}

pub async fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let config = shared.config().await;

    Arc::new(AppState {
        shared,
        refresh_cookie: RefreshCookie::new(&config.auth, &config.server),
        public_url: config
            .server
            .public_url
            .filter(|url| !url.trim().is_empty()),
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle).await)
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (images_path, cors_origins, max_upload_bytes, is_dev) = {
        let config = state.config().read().await;
        (
            config.uploads.images_path.clone(),
            config.server.cors_allowed_origins.clone(),
            config.uploads.max_upload_bytes,
            config.is_dev(),
        )
    };

    let protected_routes = create_protected_router(state.clone(), max_upload_bytes);

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/token/refresh", post(auth::refresh))
        .route(
            "/auth/token/terminate/current",
            post(auth::terminate_current),
        )
        .route("/auth/token/terminate/all", post(auth::terminate_all))
        .route("/users/register", post(users::register_user))
        .route("/health", get(health::health_check))
        .with_state(state);

    let mut app = Router::new()
        .nest("/api", api_router)
        .nest_service("/images", ServeDir::new(images_path))
        .fallback(error::route_not_found);

    if is_dev {
        app = app.layer(middleware::from_fn(error::expose_error_details));
    }

    app.layer(cors_layer(&cors_origins))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router<Arc<AppState>> {
    let picture_limit = DefaultBodyLimit::max(max_upload_bytes.saturating_add(MULTIPART_OVERHEAD));

    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/profile", get(users::get_user_profile))
        .route(
            "/profiles",
            post(profiles::upsert_profile).put(profiles::upsert_profile),
        )
        .route("/profiles/me", get(profiles::my_profile))
        .route("/profiles/search", get(profiles::search_profiles))
        .route(
            "/profiles/{id}",
            get(profiles::get_profile).put(profiles::update_profile),
        )
        .route(
            "/profiles/picture",
            post(profiles::upload_picture)
                .delete(profiles::delete_picture)
                .layer(picture_limit),
        )
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::require_auth))
}

/// Credentialed CORS needs explicit origins, methods and headers.
/// A `*` origin disables credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}
