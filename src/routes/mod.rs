use axum::{
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

pub mod health;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: true,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn success_msg(message: impl Into<String>) -> Self {
        Self {
            code: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Organization routes
        .route("/organization/add", post(handlers::organization::add_organization))
        .route("/organization/update", post(handlers::organization::update_organization))
        .route("/organization/delete", post(handlers::organization::delete_organization))
        .route("/organization/move", post(handlers::organization::move_organization))
        .route("/organization/query", get(handlers::organization::get_organization))
        .route("/organization/code", get(handlers::organization::get_by_code))
        .route("/organization/tree", get(handlers::organization::get_tree))
        .route("/organization/roots", get(handlers::organization::get_roots))
        .route("/organization/children", get(handlers::organization::get_children))
        .route("/organization/subordinates", get(handlers::organization::get_subordinates))
        .route("/organization/path", get(handlers::organization::get_path))
        .route("/organization/statistics", get(handlers::organization::get_statistics))
        .route("/organization/common-ancestor", get(handlers::organization::get_common_ancestor))
        .route("/organization/search", get(handlers::organization::search))
        .route("/organization/manager", get(handlers::organization::get_by_manager))
        .route("/organization/level", get(handlers::organization::get_by_level))
        // Membership routes
        .route("/membership/join", post(handlers::membership::join))
        .route("/membership/update", post(handlers::membership::update_membership))
        .route("/membership/leave", post(handlers::membership::leave))
        .route("/membership/user", get(handlers::membership::get_by_user))
        .route("/membership/organization", get(handlers::membership::get_by_organization))
        .route("/membership/hierarchy", get(handlers::membership::get_in_hierarchy))
        .route("/membership/logs", get(handlers::membership::get_change_logs));

    Router::new()
        .nest("/api", api_routes)
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fallback handler for 404
pub async fn fallback() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("Not Found")))
}
