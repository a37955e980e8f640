use axum::response::Json;
use serde_json::{Value, json};

/// Liveness of the callback server while a login is pending.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "authcallback",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn index() -> &'static str {
    "Nothing to see here"
}
