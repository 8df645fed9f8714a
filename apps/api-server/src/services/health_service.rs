//! Health checks for monitoring.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServingStatus {
    Serving,
    NotServing,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: ServingStatus,
    pub database: ServingStatus,
    pub message: String,
    pub version: &'static str,
    pub server_time: DateTime<Utc>,
}

pub struct HealthService {
    state: Arc<AppState>,
}

impl HealthService {
    pub fn new(state: Arc<AppState>) -> Self {
        HealthService { state }
    }

    /// Checks overall system health. Only the database can take the server
    /// out of service.
    pub async fn check(&self) -> HealthReport {
        let database = self.check_database().await;
        let message = match database {
            ServingStatus::Serving => "All systems operational".to_string(),
            ServingStatus::NotServing => {
                warn!("Health check failed: database unreachable");
                "Database unhealthy".to_string()
            }
        };

        HealthReport {
            status: database,
            database,
            message,
            version: env!("CARGO_PKG_VERSION"),
            server_time: Utc::now(),
        }
    }

    async fn check_database(&self) -> ServingStatus {
        if self.state.db.health_check().await {
            ServingStatus::Serving
        } else {
            ServingStatus::NotServing
        }
    }
}
