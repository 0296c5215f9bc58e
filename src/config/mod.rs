use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub wx_app_id: String,
    pub wx_app_secret: String,
    pub wx_api_base: String,
    pub wx_access_token_ttl_secs: u64,
    pub wx_ticket_template_id: Option<String>,
    pub wx_appointment_template_id: Option<String>,
    pub wx_message_page: String,
    pub media_root: String,
    pub public_base_url: String,
    pub upload_max_bytes: usize,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// 小时数，兼容 "24h" 写法
fn parse_hours(raw: &str) -> Option<u64> {
    raw.trim().trim_end_matches('h').parse::<u64>().ok()
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let jwt_expiration = optional("JWT_EXPIRATION")
            .and_then(|v| parse_hours(&v))
            .unwrap_or(24);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            wx_app_id: env::var("WX_APP_ID")?,
            wx_app_secret: env::var("WX_APP_SECRET")?,
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: optional("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            api_base_uri: optional("API_BASE_URI").unwrap_or_else(|| "/api/v1".into()),
            jwt_expiration_secs: jwt_expiration * 3600,
            rate_limit_window_secs: optional("RATE_LIMIT_WINDOW")
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            rate_limit_requests: optional("RATE_LIMIT_REQUESTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            wx_api_base: optional("WX_API_BASE")
                .unwrap_or_else(|| "https://api.weixin.qq.com".into()),
            wx_access_token_ttl_secs: optional("WX_ACCESS_TOKEN_TTL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5400),
            wx_ticket_template_id: optional("WX_TICKET_TEMPLATE_ID"),
            wx_appointment_template_id: optional("WX_APPOINTMENT_TEMPLATE_ID"),
            wx_message_page: optional("WX_MESSAGE_PAGE")
                .unwrap_or_else(|| "pages/index/index".into()),
            media_root: optional("MEDIA_ROOT").unwrap_or_else(|| "./media".into()),
            public_base_url: optional("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8000".into()),
            upload_max_bytes: optional("UPLOAD_MAX_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.wx_access_token_ttl_secs)
    }

    /// 把相对的媒体路径转换成客户端可以直接访问的地址
    pub fn media_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/community_test".into(),
        redis_url: "redis://127.0.0.1:1/".into(),
        jwt_secret: "test-secret".into(),
        jwt_expiration_secs: 3600,
        rate_limit_window_secs: 60,
        rate_limit_requests: 100,
        server_host: "127.0.0.1".into(),
        server_port: 0,
        api_base_uri: "/api/v1".into(),
        wx_app_id: "wx-test-app".into(),
        wx_app_secret: "wx-test-secret".into(),
        wx_api_base: "http://127.0.0.1:1".into(),
        wx_access_token_ttl_secs: 5400,
        wx_ticket_template_id: None,
        wx_appointment_template_id: None,
        wx_message_page: "pages/index/index".into(),
        media_root: std::env::temp_dir()
            .join("community-media")
            .to_string_lossy()
            .into_owned(),
        public_base_url: "https://example.com/".into(),
        upload_max_bytes: 1024,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_accept_suffix() {
        assert_eq!(parse_hours("24h"), Some(24));
        assert_eq!(parse_hours(" 12 "), Some(12));
        assert_eq!(parse_hours("abc"), None);
    }

    #[test]
    fn media_url_joins_base_and_path() {
        let config = test_config();
        assert_eq!(
            config.media_url("/upload/2023/08/01/a.png"),
            "https://example.com/upload/2023/08/01/a.png"
        );
        assert_eq!(config.media_url("upload/x.png"), "https://example.com/upload/x.png");
        assert_eq!(
            config.media_url("https://cdn.example.com/x.png"),
            "https://cdn.example.com/x.png"
        );
    }

    #[test]
    fn durations_follow_seconds() {
        let config = test_config();
        assert_eq!(config.jwt_expiration(), Duration::from_secs(3600));
        assert_eq!(config.access_token_ttl(), Duration::from_secs(5400));
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
    }
}
