pub mod auth_routes;
pub mod booking_routes;

use axum::{middleware::from_fn_with_state, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_middleware, cors_layer};
use crate::state::AppState;

/// Router completo de la API bajo `/api`
pub fn create_app_router(state: AppState) -> Router {
    let bookings = booking_routes::create_booking_router()
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes::create_auth_router(state.clone()))
        .nest("/bookings", bookings);

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "healthy",
        "service": "autoaid-backend",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
