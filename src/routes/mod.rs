pub mod assets;
pub mod push;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

/// 构建应用路由（不含中间件）
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sw.js", get(assets::service_worker))
        .nest("/api/push", push::router())
        .with_state(app_state)
}

async fn health_check() -> &'static str {
    "League push service is running!"
}
