/// Health probe endpoint
use crate::{context::AppContext, health::HealthReport};
use axum::{extract::State, response::Json, routing::get, Router};

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health))
}

/// Always 200; backend state is reported in the body
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthReport> {
    Json(ctx.health.check().await)
}
