//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::errors::ApiResponse;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: String,
    pub redis: String,
}

/// GET /health/live
pub async fn live() -> &'static str {
    "OK"
}

fn describe<T, E: std::fmt::Display>(probe: &Result<T, E>) -> String {
    match probe {
        Ok(_) => "connected".to_string(),
        Err(e) => format!("error: {e}"),
    }
}

async fn probe_redis(url: &str) -> Result<(), redis::RedisError> {
    let client = redis::Client::open(url)?;
    client.get_multiplexed_async_connection().await?;
    Ok(())
}

/// GET /health/ready
///
/// 503 when the database is unreachable. Redis is reported but optional.
pub async fn ready(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthStatus>>) {
    let database = sqlx::query("SELECT 1").execute(&state.db).await;
    let redis = probe_redis(&state.config.redis_url).await;

    if let Err(ref e) = database {
        tracing::warn!(error = %e, "Database health check failed");
    }
    if let Err(ref e) = redis {
        tracing::warn!(error = %e, "Redis health check failed");
    }

    let (code, status) = if database.is_ok() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    let body = HealthStatus {
        status,
        database: describe(&database),
        redis: describe(&redis),
    };
    (code, ApiResponse::success(body))
}
