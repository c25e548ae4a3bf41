use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::DispatchError;
use crate::models::SolveRequest;
use crate::server::AppState;

/// `/solve` 接受后的响应体
#[derive(Debug, Serialize)]
pub struct SolveAccepted {
    pub status: &'static str,
    pub chain_id: String,
    pub message: String,
}

/// 接口错误
#[derive(Debug)]
pub enum ApiError {
    Forbidden(String),
    Conflict(String),
    Unavailable(String),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::AlreadyRunning { .. } => ApiError::Conflict(err.to_string()),
            DispatchError::ShuttingDown => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// 存活检查
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Quiz chain solver is running. POST /solve with {email, secret, url}.",
    }))
}

/// 接收求解请求，后台启动链，立即返回
pub async fn solve(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SolveRequest>,
) -> Result<(StatusCode, Json<SolveAccepted>), ApiError> {
    info!("📥 收到求解请求: {} → {}", request.email, request.start_url);

    if request.secret != state.shared_secret {
        warn!("⚠️ 密钥不匹配，拒绝请求: {}", request.email);
        return Err(ApiError::Forbidden("Invalid secret".to_string()));
    }

    let chain_id = state.dispatcher.dispatch(request)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SolveAccepted {
            status: "accepted",
            message: format!("Quiz chain {} started in background", chain_id),
            chain_id,
        }),
    ))
}
