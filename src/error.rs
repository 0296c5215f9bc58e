use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("无权限访问")]
    Forbidden,

    #[error("资源不存在")]
    NotFound,

    #[error("{0}")]
    NotAcceptable(String),

    #[error("请求过于频繁，请在{0}秒后重试")]
    RateLimited(u64),

    #[error("微信接口调用失败: {0}")]
    Wechat(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn status_and_code(&self) -> (StatusCode, i32) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED),
            AppError::Forbidden => (StatusCode::FORBIDDEN, error_codes::PERMISSION_DENIED),
            AppError::NotFound => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::NotAcceptable(_) => (StatusCode::NOT_ACCEPTABLE, error_codes::NOT_ACCEPTABLE),
            AppError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, error_codes::RATE_LIMIT),
            AppError::Wechat(_) | AppError::Http(_) => {
                (StatusCode::BAD_GATEWAY, error_codes::UPSTREAM_ERROR)
            }
            AppError::Database(sqlx::Error::RowNotFound) => {
                (StatusCode::NOT_FOUND, error_codes::NOT_FOUND)
            }
            AppError::Database(e) if client_violation(e).is_some() => {
                (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR)
            }
            AppError::Database(_) | AppError::Redis(_) | AppError::Token(_) | AppError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
            }
        }
    }

    /// 面向客户端的提示信息，内部错误不暴露细节
    fn client_message(&self) -> String {
        match self {
            AppError::Database(sqlx::Error::RowNotFound) => "资源不存在".into(),
            AppError::Database(e) => match client_violation(e) {
                Some(msg) => msg.into(),
                None => "数据库错误".into(),
            },
            AppError::Redis(_) => "缓存服务错误".into(),
            AppError::Http(_) => "微信接口调用失败".into(),
            AppError::Token(_) => "生成令牌失败".into(),
            AppError::Io(_) => "内部服务器错误".into(),
            other => other.to_string(),
        }
    }
}

/// 由请求数据触发的约束错误，按 SQLSTATE 转成给客户端的提示
fn client_violation(e: &sqlx::Error) -> Option<&'static str> {
    let code = e.as_database_error()?.code()?;
    match code.as_ref() {
        "23505" => Some("记录已存在"),
        "23503" => Some("关联数据不存在"),
        "23502" => Some("缺少必填字段"),
        "22001" => Some("字段长度超出限制"),
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, error_to_api_response::<()>(code, self.client_message())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_business_errors_to_status() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::NotAcceptable("x".into()), StatusCode::NOT_ACCEPTABLE),
            (AppError::RateLimited(60), StatusCode::TOO_MANY_REQUESTS),
            (AppError::Wechat("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::Database(sqlx::Error::RowNotFound), StatusCode::NOT_FOUND),
            (AppError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn body_uses_api_envelope() {
        let response = AppError::Validation("昵称不能为空".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], error_codes::VALIDATION_ERROR);
        assert_eq!(json["msg"], "昵称不能为空");
        assert!(json.get("resp_data").is_none());
    }

    #[derive(Debug)]
    struct PgCode(&'static str);

    impl std::fmt::Display for PgCode {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "constraint failed ({})", self.0)
        }
    }

    impl std::error::Error for PgCode {}

    impl sqlx::error::DatabaseError for PgCode {
        fn message(&self) -> &str {
            "constraint failed"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(std::borrow::Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn db_error(code: &'static str) -> AppError {
        AppError::Database(sqlx::Error::Database(Box::new(PgCode(code))))
    }

    #[tokio::test]
    async fn constraint_violations_are_client_errors() {
        let cases = [
            ("23505", "记录已存在"),
            ("23503", "关联数据不存在"),
            ("23502", "缺少必填字段"),
            ("22001", "字段长度超出限制"),
        ];
        for (code, msg) in cases {
            let response = db_error(code).into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", code);
            let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["code"], error_codes::VALIDATION_ERROR);
            assert_eq!(json["msg"], msg);
        }
    }

    #[test]
    fn other_database_codes_stay_internal() {
        // 40P01: 死锁
        let response = db_error("40P01").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = AppError::Database(sqlx::Error::PoolTimedOut).into_response();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["msg"], "数据库错误");
    }
}
