//! # Shopkeep API
//!
//! JSON HTTP server behind the store dashboard.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Shopkeep API                                  │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  routes        │  │  services      │  │  shopkeep-db               ││
//! │  │                │  │                │  │                            ││
//! │  │ • extractors   │─►│ • Order        │─►│ • repositories             ││
//! │  │ • envelopes    │  │ • Inventory    │  │ • one tx per multi-row     ││
//! │  │ • /api/*       │  │ • Debt         │  │   write                    ││
//! │  │                │  │ • Notification │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │          ▲                                                              │
//! │          │ CurrentUser / AdminUser from the bearer token (auth)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]: defaults, then `shopkeep.toml`, then `SHOPKEEP__*`
//! environment variables.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::http::{HeaderValue, Uri};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use crate::config::AppConfig;
pub use crate::error::{ApiError, ApiResult, ErrorCode};
pub use crate::state::AppState;

/// Builds the application: routes, fallback, CORS, request tracing.
///
/// Used by the server and by router tests.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    routes::build_router()
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Not found - {}", uri))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(AllowOrigin::list(allowed))
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use shopkeep_core::Product;
    use shopkeep_db::{Database, DbConfig, NewProduct};

    use crate::auth::{CurrentUser, Role};
    use crate::config::AppConfig;
    use crate::state::AppState;

    pub async fn test_state() -> Arc<AppState> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config: AppConfig = AppConfig::defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        Arc::new(AppState::new(db, config))
    }

    pub fn staff_user() -> CurrentUser {
        CurrentUser {
            id: "staff-1".to_string(),
            name: "Lan".to_string(),
            role: Role::Staff,
        }
    }

    pub fn token(state: &AppState, role: Role) -> String {
        let (id, name) = match role {
            Role::Staff => ("staff-1", "Lan"),
            Role::Admin => ("admin-1", "Chủ tiệm"),
        };
        state.jwt.generate_access_token(id, name, role).unwrap()
    }

    pub async fn insert_product(state: &AppState, name: &str, stock: i64) -> Product {
        state
            .db
            .products()
            .insert(&NewProduct {
                name: name.to_string(),
                price: 10_000,
                cost: 7_000,
                stock,
                ..Default::default()
            })
            .await
            .unwrap()
    }

    /// Sends one request through the full app and returns status and JSON body.
    pub async fn send(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = crate::build_app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}
