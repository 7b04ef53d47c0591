//! Health check handlers for service monitoring.
//!
//! `/health` checks database connectivity through the policy store and
//! answers 503 when it is down. `/live` only proves the process is serving.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use legalfooter_core::{storage::PolicyStore, Clock};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::server::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Individual component health checks
    pub checks: HealthChecks,
    /// Service version information
    pub version: String,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Database unreachable
    Unhealthy,
}

/// Individual component health check results.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Database connectivity
    pub database: ComponentHealth,
}

/// Health status for individual components.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    /// Component status
    pub status: ComponentStatus,
    /// Error message if unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response time in milliseconds
    pub response_time_ms: u64,
}

/// Component-level health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is healthy
    Up,
    /// Component is failing
    Down,
}

/// Runs health checks against an injected clock so timings are testable.
pub struct HealthService {
    clock: Arc<dyn Clock>,
}

impl HealthService {
    /// Creates a new health service with the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Checks every component and summarizes the result.
    pub async fn health_check(&self, store: &dyn PolicyStore) -> HealthResponse {
        debug!("Performing health check");

        let timestamp = DateTime::<Utc>::from(self.clock.now_system());
        let start_time = self.clock.now();

        let (status, message) = match store.health_check().await {
            Ok(()) => (ComponentStatus::Up, None),
            Err(e) => {
                error!("Database health check failed: {}", e);
                (ComponentStatus::Down, Some(format!("Database connection failed: {e}")))
            },
        };
        let elapsed = self.clock.now().saturating_duration_since(start_time);

        let overall = match status {
            ComponentStatus::Up => HealthStatus::Healthy,
            ComponentStatus::Down => HealthStatus::Unhealthy,
        };

        HealthResponse {
            status: overall,
            timestamp,
            checks: HealthChecks {
                database: ComponentHealth {
                    status,
                    message,
                    response_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                },
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health check endpoint handler.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let response = HealthService::new(Arc::clone(&state.clock)).health_check(&*state.store).await;

    let status_code = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    debug!(status = ?response.status, "Health check completed");

    (status_code, Json(response)).into_response()
}

/// Liveness endpoint. Does not touch external dependencies.
#[instrument(name = "liveness_check", skip(state))]
pub async fn liveness_check(State(state): State<AppState>) -> Response {
    let response = serde_json::json!({
        "status": "alive",
        "timestamp": DateTime::<Utc>::from(state.clock.now_system()),
        "service": "legalfooter",
    });

    (StatusCode::OK, Json(response)).into_response()
}
