use super::handlers::{self, AppState};
use super::metrics_handler::{metrics_handler, track_http_metrics};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the Axum router with all endpoints
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(metrics_handler))
        // Routing inspection
        .route("/shard/{key}", get(handlers::shard_for_key))
        .route("/shards", get(handlers::list_shards))
        // User REST API endpoints
        .route(
            "/user",
            post(handlers::create_user).get(handlers::list_users),
        )
        .route(
            "/user/{email}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .fallback(handlers::route_not_found)
        // Add state and middleware
        .with_state(state)
        .layer(middleware::from_fn(track_http_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
