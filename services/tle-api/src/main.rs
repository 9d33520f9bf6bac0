use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use tlerelay_core::logging;

mod config;
mod handlers;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init_with(config.log_format);

    let port = config.relay.server.port;
    let state = Arc::new(AppState::new(config)?);
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("TLE API listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/tle/:mission_id",
            // `get` alone would also answer HEAD.
            get(handlers::mission_tles)
                .head(handlers::method_not_allowed)
                .fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::unsupported)
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "tle-api",
        "call_budget": state.config.relay.budget.ceiling,
        "timestamp": Utc::now().to_rfc3339()
    }))
}
