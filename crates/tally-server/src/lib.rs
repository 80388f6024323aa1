//! Tally Web Server
//!
//! Axum-based REST API exposing the read-only analytics endpoints of the
//! Tally engine, one workspace per request.
//!
//! Security features:
//! - Restrictive CORS policy
//! - Input validation (period counts, horizons)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use tally_core::{AnalyticsConfig, Database, LedgerSource};

mod handlers;

/// Maximum number of periods a trend request may ask for
pub const MAX_TREND_PERIODS: u32 = 120;

/// Body returned whenever a ledger read fails
pub const UNAVAILABLE_MESSAGE: &str = "analytics temporarily unavailable";

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub ledger: Arc<dyn LedgerSource>,
    pub analytics: AnalyticsConfig,
    pub config: ServerConfig,
}

/// Build the router over any ledger source
pub fn create_router(
    ledger: Arc<dyn LedgerSource>,
    analytics: AnalyticsConfig,
    config: ServerConfig,
) -> Router {
    let state = Arc::new(AppState {
        ledger,
        analytics,
        config: config.clone(),
    });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/workspaces/:id/overview", get(handlers::get_overview))
        .route(
            "/workspaces/:id/analytics/spending",
            get(handlers::get_spending_analysis),
        )
        .route(
            "/workspaces/:id/analytics/income",
            get(handlers::get_income_analysis),
        )
        .route("/workspaces/:id/analytics/trends", get(handlers::get_trends))
        .route(
            "/workspaces/:id/analytics/cash-flow",
            get(handlers::get_cash_flow),
        );

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

/// Start the server over the SQLite store
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    analytics: AnalyticsConfig,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.allowed_origins.is_empty() {
        info!(origins = ?config.allowed_origins, "CORS origins allowed");
    }

    let app = create_router(Arc::new(db), analytics, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Application error type
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            if self.status == StatusCode::SERVICE_UNAVAILABLE {
                warn!(error = %err, "Ledger read failed");
            } else {
                error!(error = %err, "Internal error");
            }
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        use tally_core::Error as CoreError;

        let err = err.into();
        let (status, message) = match err.downcast_ref::<CoreError>() {
            Some(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            Some(e @ CoreError::NotFound(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            Some(CoreError::UpstreamRead(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                UNAVAILABLE_MESSAGE.to_string(),
            ),
            // Return generic message to client
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        };

        Self {
            status,
            message,
            // Keep full error for logging
            internal: status.is_server_error().then_some(err),
        }
    }
}

#[cfg(test)]
mod tests;
