//! Application setup and router configuration.

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    create_segment_handler, create_user_handler, delete_segment_handler, health_handler,
    history_report_handler, update_user_segments_handler, user_segments_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
    /// Present when storage is Postgres; used by the health check
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            deps: ServerDeps::postgres(pool.clone()),
            db_pool: Some(pool),
        }
    }

    pub fn with_deps(deps: ServerDeps) -> Self {
        Self {
            deps,
            db_pool: None,
        }
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/users/create", post(create_user_handler))
        .route("/users/update-segments", post(update_user_segments_handler))
        .route("/users/history-report", get(history_report_handler))
        .route("/segments/create", post(create_segment_handler))
        .route("/segments/delete", delete(delete_segment_handler))
        .route("/segments/user-segments", get(user_segments_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
