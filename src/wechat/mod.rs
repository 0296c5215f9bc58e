//! 微信小程序服务端接口
//!
//! 包含 code 换取 OpenID、access_token 获取（Redis 缓存）、手机号解析和订阅消息推送。

use std::sync::Arc;

use redis::{AsyncCommands, Client as RedisClient};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::Config;
use crate::error::{AppError, AppResult};

const ACCESS_TOKEN_CACHE_KEY: &str = "wechat:access_token";

#[derive(Debug, Deserialize)]
struct SessionResponse {
    openid: Option<String>,
    session_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhoneInfo {
    #[serde(rename = "phoneNumber")]
    phone_number: String,
}

#[derive(Debug, Deserialize)]
struct PhoneResponse {
    errmsg: Option<String>,
    phone_info: Option<PhoneInfo>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    errcode: Option<i64>,
}

#[derive(Clone)]
pub struct WechatClient {
    http: reqwest::Client,
    redis: Arc<RedisClient>,
    app_id: String,
    app_secret: String,
    api_base: String,
    token_ttl_secs: u64,
}

impl WechatClient {
    pub fn new(config: &Config, redis: Arc<RedisClient>) -> Self {
        Self {
            http: reqwest::Client::new(),
            redis,
            app_id: config.wx_app_id.clone(),
            app_secret: config.wx_app_secret.clone(),
            api_base: config.wx_api_base.trim_end_matches('/').to_string(),
            token_ttl_secs: config.access_token_ttl().as_secs(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// 用小程序登录 code 换取 OpenID，openid 或 session_key 缺失时返回 None
    pub async fn code_to_openid(&self, js_code: &str) -> AppResult<Option<String>> {
        tracing::info!("开始获取OpenID");
        let resp = self
            .http
            .get(self.url("/sns/jscode2session"))
            .query(&[
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
                ("js_code", js_code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let data: SessionResponse = resp.json().await?;
        match (data.openid, data.session_key) {
            (Some(openid), Some(_)) => Ok(Some(openid)),
            _ => Ok(None),
        }
    }

    async fn cached_access_token(&self) -> Option<String> {
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Redis unavailable, skip access_token cache: {}", e);
                return None;
            }
        };
        let cached: redis::RedisResult<Option<String>> = conn.get(ACCESS_TOKEN_CACHE_KEY).await;
        match cached {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Failed to read cached access_token: {}", e);
                None
            }
        }
    }

    async fn cache_access_token(&self, token: &str) {
        if let Ok(mut conn) = self.redis.get_multiplexed_async_connection().await {
            let result: Result<(), redis::RedisError> = conn
                .set_ex(ACCESS_TOKEN_CACHE_KEY, token, self.token_ttl_secs)
                .await;
            if let Err(e) = result {
                tracing::warn!("Failed to cache access_token: {}", e);
            }
        }
    }

    /// 获取接口调用凭证，优先使用缓存；请求失败时返回 None
    pub async fn access_token(&self) -> Option<String> {
        if let Some(token) = self.cached_access_token().await {
            tracing::debug!("从缓存获取access_token");
            return Some(token);
        }

        let result = async {
            let resp = self
                .http
                .post(self.url("/cgi-bin/token"))
                .form(&[
                    ("appid", self.app_id.as_str()),
                    ("secret", self.app_secret.as_str()),
                    ("grant_type", "client_credential"),
                ])
                .send()
                .await?
                .error_for_status()?;
            resp.json::<AccessTokenResponse>().await
        }
        .await;

        match result {
            Ok(AccessTokenResponse {
                access_token: Some(token),
            }) => {
                self.cache_access_token(&token).await;
                Some(token)
            }
            Ok(_) => {
                tracing::warn!("access_token missing in WeChat response");
                None
            }
            Err(e) => {
                tracing::warn!("Failed to fetch access_token: {}", e);
                None
            }
        }
    }

    /// 通过手机号授权 code 获取用户手机号
    pub async fn phone_number(&self, phone_code: &str) -> AppResult<Option<String>> {
        let access_token = self
            .access_token()
            .await
            .ok_or_else(|| AppError::Wechat("获取access_token失败".into()))?;

        let resp = self
            .http
            .post(self.url("/wxa/business/getuserphonenumber"))
            .query(&[("access_token", access_token.as_str())])
            .json(&json!({ "code": phone_code }))
            .send()
            .await?
            .error_for_status()?;

        let data: PhoneResponse = resp.json().await?;
        if data.errmsg.as_deref() == Some("ok") {
            return Ok(data.phone_info.map(|info| info.phone_number));
        }
        Ok(None)
    }

    /// 推送订阅消息。失败只记录日志，不重试
    pub async fn send_subscription_message(
        &self,
        openid: &str,
        template_id: &str,
        data: Value,
        page: &str,
    ) -> bool {
        let Some(access_token) = self.access_token().await else {
            tracing::warn!("订阅消息发送失败: 无法获取access_token");
            return false;
        };

        let payload = json!({
            "touser": openid,
            "template_id": template_id,
            "data": data,
            "page": page,
        });

        let resp = match self
            .http
            .post(self.url("/cgi-bin/message/subscribe/send"))
            .query(&[("access_token", access_token.as_str())])
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!("订阅消息发送失败: {}", e);
                return false;
            }
        };

        if !resp.status().is_success() {
            tracing::error!("订阅消息发送失败，HTTP错误代码：{}", resp.status());
            return false;
        }

        match resp.json::<SendResponse>().await {
            Ok(SendResponse { errcode: Some(0) }) => {
                tracing::info!("订阅消息发送成功");
                true
            }
            Ok(SendResponse { errcode }) => {
                tracing::warn!("订阅消息发送失败，错误代码：{:?}", errcode);
                false
            }
            Err(e) => {
                tracing::error!("订阅消息响应解析失败: {}", e);
                false
            }
        }
    }
}

/// 状态变更订阅消息的模板数据
pub fn status_template_data(kind: &str, status_label: &str, time: &str) -> Value {
    json!({
        "thing1": { "value": kind },
        "phrase2": { "value": status_label },
        "time3": { "value": time },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use axum::{
        Json, Router,
        extract::Query,
        routing::{get, post},
    };
    use std::collections::HashMap;

    async fn spawn_mock() -> String {
        async fn session(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
            match q.get("js_code").map(String::as_str) {
                Some("good") => Json(json!({"openid": "o-123", "session_key": "sk"})),
                Some("no-session") => Json(json!({"openid": "o-123"})),
                _ => Json(json!({"errcode": 40029, "errmsg": "invalid code"})),
            }
        }
        async fn token() -> Json<Value> {
            Json(json!({"access_token": "at-1", "expires_in": 7200}))
        }
        async fn phone(Json(body): Json<Value>) -> Json<Value> {
            if body["code"] == "p-ok" {
                Json(json!({"errcode": 0, "errmsg": "ok", "phone_info": {"phoneNumber": "13800138000"}}))
            } else {
                Json(json!({"errcode": 40001, "errmsg": "invalid code"}))
            }
        }
        async fn send(Json(body): Json<Value>) -> Json<Value> {
            if body["touser"] == "o-123" {
                Json(json!({"errcode": 0, "errmsg": "ok"}))
            } else {
                Json(json!({"errcode": 43101, "errmsg": "user refuse to accept the msg"}))
            }
        }

        let app = Router::new()
            .route("/sns/jscode2session", get(session))
            .route("/cgi-bin/token", post(token))
            .route("/wxa/business/getuserphonenumber", post(phone))
            .route("/cgi-bin/message/subscribe/send", post(send));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn client() -> WechatClient {
        let mut config = test_config();
        config.wx_api_base = spawn_mock().await;
        // 指向未监听的端口，缓存读写失败后回退到直接请求
        let redis = Arc::new(RedisClient::open(config.redis_url.clone()).unwrap());
        WechatClient::new(&config, redis)
    }

    #[tokio::test]
    async fn exchanges_code_for_openid() {
        let client = client().await;
        assert_eq!(client.code_to_openid("good").await.unwrap(), Some("o-123".into()));
        assert_eq!(client.code_to_openid("no-session").await.unwrap(), None);
        assert_eq!(client.code_to_openid("bad").await.unwrap(), None);
    }

    #[tokio::test]
    async fn fetches_access_token_without_cache() {
        let client = client().await;
        assert_eq!(client.access_token().await, Some("at-1".into()));
    }

    #[tokio::test]
    async fn resolves_phone_number() {
        let client = client().await;
        assert_eq!(client.phone_number("p-ok").await.unwrap(), Some("13800138000".into()));
        assert_eq!(client.phone_number("p-bad").await.unwrap(), None);
    }

    #[tokio::test]
    async fn subscription_result_follows_errcode() {
        let client = client().await;
        let data = status_template_data("居民服务", "处理中", "2023年08月14日 09:30");
        assert!(client.send_subscription_message("o-123", "tpl", data.clone(), "pages/index/index").await);
        assert!(!client.send_subscription_message("o-999", "tpl", data, "pages/index/index").await);
    }

    #[tokio::test]
    async fn unreachable_api_reports_failure() {
        let config = test_config();
        let redis = Arc::new(RedisClient::open(config.redis_url.clone()).unwrap());
        let client = WechatClient::new(&config, redis);
        assert!(client.code_to_openid("good").await.is_err());
        assert_eq!(client.access_token().await, None);
        assert!(!client.send_subscription_message("o-123", "tpl", json!({}), "p").await);
    }
}
