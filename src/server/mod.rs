//! HTTP 接口
//!
//! - `GET /` 存活检查
//! - `POST /solve` 校验密钥后在后台启动一条链

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::orchestrator::ChainDispatcher;

/// 路由共享状态
pub struct AppState {
    pub shared_secret: String,
    pub dispatcher: ChainDispatcher,
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/solve", post(handlers::solve))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
