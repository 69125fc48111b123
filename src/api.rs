//! Health HTTP server, spawned as a background task next to the
//! gateway loop.

use axum::{response::Json, routing::get, Router};
use javob_core::config::ServerConfig;
use javob_store::now_ms;
use serde_json::{json, Value};
use tracing::{error, info};

pub async fn serve(config: ServerConfig) {
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind health server on {addr}: {e}");
            return;
        }
    };
    info!("health server listening on http://{addr}");

    if let Err(e) = axum::serve(listener, app).await {
        error!("health server error: {e}");
    }
}

async fn root() -> &'static str {
    "Bot ishga tushgan. /health ni ping qiling."
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "ts": now_ms() }))
}
