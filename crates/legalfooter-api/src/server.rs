//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Timeout enforcement (health routes only)
//! 4. Handler execution
//!
//! The webhook route has no timeout: once a delivery is verified it must be
//! acknowledged with 200, however long the insert and email take.
//!
//! # Graceful Shutdown
//!
//! On SIGINT or SIGTERM the server stops accepting connections and waits for
//! in-flight requests before returning.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use legalfooter_core::{storage::PolicyStore, Clock};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{crypto::SignatureVerifier, handlers, pipeline::EventProcessor};

/// Path the processor delivers checkout events to.
pub const WEBHOOK_PATH: &str = "/api/stripe-webhook";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Persist-then-notify pipeline
    pub processor: Arc<EventProcessor>,
    /// Store probed by the health check
    pub store: Arc<dyn PolicyStore>,
    /// Signature verifier
    pub verifier: Arc<SignatureVerifier>,
    /// Time source for health timestamps
    pub clock: Arc<dyn Clock>,
    /// Return verification reasons in 400 bodies
    pub expose_verification_errors: bool,
    /// Timeout for health routes
    pub request_timeout: Duration,
}

impl AppState {
    /// Creates state with verification reasons exposed and a 30s timeout.
    pub fn new(processor: EventProcessor, verifier: SignatureVerifier, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: processor.store(),
            processor: Arc::new(processor),
            verifier: Arc::new(verifier),
            clock,
            expose_verification_errors: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Controls whether 400 bodies carry the verification reason.
    #[must_use]
    pub fn with_verification_errors_exposed(mut self, expose: bool) -> Self {
        self.expose_verification_errors = expose;
        self
    }

    /// Overrides the health route timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use legalfooter_api::{create_router, AppState, EventProcessor, SignatureVerifier};
/// use legalfooter_core::{storage::Storage, RealClock};
/// use legalfooter_mail::{ClientConfig, ResendClient};
/// use sqlx::PgPool;
///
/// fn build(db: PgPool) -> Result<axum::Router, Box<dyn std::error::Error>> {
///     let processor = EventProcessor::new(
///         Arc::new(Storage::new(db)),
///         Arc::new(ResendClient::new(ClientConfig::new("re_123"))?),
///     );
///     let verifier = SignatureVerifier::new("whsec_123", Arc::new(RealClock::new()))?;
///
///     Ok(create_router(AppState::new(processor, verifier, Arc::new(RealClock::new()))))
/// }
/// ```
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/live", get(handlers::liveness_check))
        .layer(TimeoutLayer::new(state.request_timeout));

    let webhook_routes = Router::new().route(
        WEBHOOK_PATH,
        post(handlers::stripe_webhook).fallback(handlers::method_not_allowed),
    );

    Router::new()
        .merge(health_routes)
        .merge(webhook_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Adds an `X-Request-Id` header to every response.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound or serving fails.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for CTRL+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}
