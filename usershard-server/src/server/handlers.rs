use super::extractor::JsonBody;
use crate::config::ServerConfig;
use crate::core::{NewUser, ShardError, ShardStats, UserUpdate, UserView};
use crate::sharding::{FanoutCoordinator, ShardRegistry, StorageBackend};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<FanoutCoordinator>,
}

impl AppState {
    pub fn new(coordinator: FanoutCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }

    /// Build the registry and coordinator described by `config`
    pub async fn from_config(config: &ServerConfig) -> Result<Self, ShardError> {
        let topology = config.to_topology()?;
        let backend = if config.storage.persist {
            info!("Persisting shards under {:?}", config.storage.data_dir);
            StorageBackend::Files(&config.storage.data_dir)
        } else {
            StorageBackend::Memory
        };

        let registry = ShardRegistry::open(
            topology,
            config.sharding.hash_strategy,
            config.sharding.invalid_shard_policy,
            backend,
        )
        .await?;

        Ok(Self::new(FanoutCoordinator::new(
            Arc::new(registry),
            config.to_fanout_options(),
        )))
    }
}

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data,
        })
    }

    fn with_message(message: &str, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.to_string()),
            data,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardsResponse {
    pub hash_strategy: String,
    pub invalid_shard_policy: crate::sharding::InvalidShardPolicy,
    pub shard_count: u32,
    pub shards: Vec<ShardStats>,
}

/// Liveness message at the root path
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "API is Live!" }))
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "usershard",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /shard/{key} - which shard a key routes to
pub async fn shard_for_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, ShardError> {
    let registry = state.coordinator.registry();
    let shard = registry.shard_for(&key)?;
    debug!("REST SHARD key={} shard={}", key, shard);

    Ok(Json(json!({
        "result": shard,
        "strategy": registry.strategy().name(),
    })))
}

/// POST /user - create a user (and its profile) on the owning shard
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<NewUser>,
) -> Result<(StatusCode, Json<ApiResponse<UserView>>), ShardError> {
    debug!("REST CREATE email={}", req.email);

    let user = state.coordinator.create_user(req).await?;
    info!("Created user {} on shard {}", user.email, user.shard_id);

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("User created successfully", user),
    ))
}

/// GET /user - every user across all shards
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserView>>>, ShardError> {
    debug!("REST LIST users");

    let users = state.coordinator.list_users().await?;
    Ok(ApiResponse::with_message(
        "Users fetched successfully from all shards",
        users,
    ))
}

/// GET /user/{email}
pub async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<ApiResponse<UserView>>, ShardError> {
    debug!("REST GET email={}", email);

    let user = state.coordinator.find_user(&email).await?;
    Ok(ApiResponse::ok(user))
}

/// PUT /user/{email}
pub async fn update_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
    JsonBody(req): JsonBody<UserUpdate>,
) -> Result<Json<ApiResponse<UserView>>, ShardError> {
    debug!("REST UPDATE email={}", email);

    let user = state.coordinator.update_user(&email, req).await?;
    Ok(ApiResponse::with_message("User updated successfully", user))
}

/// DELETE /user/{email}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<StatusCode, ShardError> {
    debug!("REST DELETE email={}", email);

    state.coordinator.delete_user(&email).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /shards - topology and per-shard counts
pub async fn list_shards(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ShardsResponse>>, ShardError> {
    let registry = state.coordinator.registry();
    let shards = state.coordinator.shard_stats().await?;

    Ok(ApiResponse::ok(ShardsResponse {
        hash_strategy: registry.strategy().name().to_string(),
        invalid_shard_policy: registry.policy(),
        shard_count: registry.shard_count(),
        shards,
    }))
}

/// Fallback for unknown routes
pub async fn route_not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "API route does not exist"
        })),
    )
}
