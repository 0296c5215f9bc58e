use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::{AppState, utils::success_to_api_response};

#[derive(Serialize)]
pub struct PingResponse {
    pub status: String,
    /// 服务器时间戳（秒）
    pub timestamp: i64,
}

/// 健康检查
pub async fn ping() -> impl IntoResponse {
    (
        StatusCode::OK,
        success_to_api_response(PingResponse {
            status: "ok".to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }),
    )
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/ping", get(ping))
}
