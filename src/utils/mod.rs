use std::sync::LazyLock;

use axum::Json;
use chrono::{DateTime, FixedOffset, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

/// 通用的API响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 错误码，0表示成功，非0表示失败
    pub code: i32,
    /// 错误消息，成功时为"success"
    pub msg: String,
    /// 响应数据，错误时为None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_data: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64, // 微信用户ID
    pub exp: i64,     // 过期时间
    pub iat: i64,     // 签发时间
    pub jti: String,
}

pub fn generate_token(
    user_id: i64,
    config: &Config,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let expiration = now + config.jwt_expiration().as_secs() as i64;

    let claims = Claims {
        user_id,
        exp: expiration,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const NOT_ACCEPTABLE: i32 = 1006;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const UPSTREAM_ERROR: i32 = 5002;
}

// 北京时间
pub fn china_offset() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("valid offset")
}

/// 2023年08月14日 09:30
pub fn format_datetime_cn(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&china_offset())
        .format("%Y年%m月%d日 %H:%M")
        .to_string()
}

/// 2023年08月14日
pub fn format_date_cn(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&china_offset())
        .format("%Y年%m月%d日")
        .to_string()
}

/// 序列化为中文日期时间，配合 `#[serde(serialize_with = ...)]` 使用
pub fn serialize_datetime_cn<S: serde::Serializer>(
    dt: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_datetime_cn(dt))
}

pub fn serialize_date_cn<S: serde::Serializer>(
    dt: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_date_cn(dt))
}

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d{1,3}[-.\s]?\d{1,14}$").expect("valid phone regex"));

pub fn is_valid_phone(phone: &str) -> bool {
    phone.chars().count() <= 15 && PHONE_REGEX.is_match(phone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use chrono::TimeZone;

    #[test]
    fn token_round_trip_keeps_user_id() {
        let config = test_config();
        let (token, exp) = generate_token(42, &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.exp, exp);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = test_config();
        let (token, _) = generate_token(7, &config).unwrap();
        let mut other = test_config();
        other.jwt_secret = "another-secret".into();
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let claims = Claims {
            user_id: 1,
            exp: Utc::now().timestamp() - 3600,
            iat: Utc::now().timestamp() - 7200,
            jti: "x".into(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn dates_render_in_beijing_time() {
        let dt = Utc.with_ymd_and_hms(2023, 8, 14, 17, 5, 0).unwrap();
        assert_eq!(format_datetime_cn(&dt), "2023年08月15日 01:05");
        assert_eq!(format_date_cn(&dt), "2023年08月15日");
    }

    #[test]
    fn phone_validation() {
        assert!(is_valid_phone("13800138000"));
        assert!(is_valid_phone("+86 13800138000"));
        assert!(is_valid_phone("010-12345678"));
        assert!(!is_valid_phone("phone"));
        assert!(!is_valid_phone("1380013800012345678"));
    }
}
