pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod services;
pub mod state;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::public::auth as auth_handlers;
use crate::state::AppState;

/// Full application router: service info, health and the magic-link routes
/// under the configured prefix.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Magic link auth
        .merge(magic_link_routes(&state.config.magic_link.router_prefix))
        .with_state(state)
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn magic_link_routes(prefix: &str) -> Router<AppState> {
    let mut router = Router::new()
        .route(
            &format!("{}/request-magic-link", prefix),
            post(auth_handlers::request_magic_link),
        )
        .route(
            &format!("{}/verify-magic-link", prefix),
            get(auth_handlers::verify_magic_link),
        );

    // With an empty prefix the service root already answers "/".
    if !prefix.is_empty() {
        router = router
            .route(prefix, get(auth_handlers::magic_link_health))
            .route(&format!("{}/", prefix), get(auth_handlers::magic_link_health));
    }

    router
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "CloudOU magic-link auth",
            "version": version,
            "endpoints": {
                "health": "/health",
                "magic_auth": "<prefix>/request-magic-link, <prefix>/verify-magic-link"
            }
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "Application is healthy" }))
}
