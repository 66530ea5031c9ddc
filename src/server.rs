/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{AuthnError, AuthnResult},
    metrics,
};
use axum::{http::StatusCode, routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(crate::api::routes())
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Prometheus exposition
async fn metrics_handler() -> Result<String, StatusCode> {
    metrics::render_metrics().map_err(|e| {
        tracing::error!("metrics rendering failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// 404 handler
async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> AuthnResult<()> {
    let addr = ctx.config.listen_addr();

    info!("authn listening on {}", addr);
    info!("   Issuer: {}", ctx.config.service.base_url);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AuthnError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AuthnError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
