use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::common::{optional_text, require_text};
use crate::error::AppError;

pub const ROLE_WORKER: i16 = 1;
pub const ROLE_ADMIN: i16 = 2;

const USER_COLUMNS: &str = "id, open_id, nickname, name, avatar, phone, address, gender, role, \
     created_at, updated_at, is_active, is_deleted";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeChatUser {
    pub id: i64,
    #[serde(skip_serializing)]
    pub open_id: String,
    pub nickname: String,
    pub name: String,
    pub avatar: String,
    pub phone: String,
    pub address: String,
    pub gender: i16,
    pub role: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub code: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: WeChatUser,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub nickname: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub gender: Option<i16>,
}

#[derive(Debug, Deserialize)]
pub struct BindPhoneRequest {
    pub code: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text(&self.code, "code", 255)?;
        if let Some(nickname) = &self.nickname {
            require_text(nickname, "昵称", 64)?;
        }
        optional_text(self.avatar.as_deref(), "头像", 255)
    }
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(gender) = self.gender {
            if !(0..=2).contains(&gender) {
                return Err(AppError::Validation("性别取值无效".into()));
            }
        }
        if let Some(nickname) = &self.nickname {
            require_text(nickname, "昵称", 64)?;
        }
        optional_text(self.name.as_deref(), "姓名", 100)?;
        optional_text(self.avatar.as_deref(), "头像", 255)?;
        optional_text(self.address.as_deref(), "地址", 255)
    }
}

impl WeChatUser {
    pub fn is_staff(&self) -> bool {
        self.role >= ROLE_WORKER
    }

    pub fn is_admin(&self) -> bool {
        self.role >= ROLE_ADMIN
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM wechat_users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, WeChatUser>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// 按 OpenID 查找用户，不存在时注册
    pub async fn get_or_create(
        pool: &PgPool,
        open_id: &str,
        nickname: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<(Self, bool), sqlx::Error> {
        let sql = format!("SELECT {} FROM wechat_users WHERE open_id = $1", USER_COLUMNS);
        if let Some(user) = sqlx::query_as::<_, WeChatUser>(&sql)
            .bind(open_id)
            .fetch_optional(pool)
            .await?
        {
            return Ok((user, false));
        }

        let nickname = nickname
            .map(str::to_string)
            .unwrap_or_else(|| default_nickname(open_id));

        // 并发登录时由唯一索引兜底，冲突后重新读取
        let sql = format!(
            r#"
            INSERT INTO wechat_users (open_id, nickname, avatar)
            VALUES ($1, $2, $3)
            ON CONFLICT (open_id) DO UPDATE SET open_id = EXCLUDED.open_id
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, WeChatUser>(&sql)
            .bind(open_id)
            .bind(nickname)
            .bind(avatar.unwrap_or_default())
            .fetch_one(pool)
            .await?;

        tracing::info!("Registered wechat user: {}", user.id);
        Ok((user, true))
    }

    pub async fn update_profile(
        pool: &PgPool,
        id: i64,
        req: UpdateProfileRequest,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE wechat_users
            SET nickname = COALESCE($2, nickname),
                name = COALESCE($3, name),
                avatar = COALESCE($4, avatar),
                address = COALESCE($5, address),
                gender = COALESCE($6, gender),
                updated_at = NOW()
            WHERE id = $1 AND NOT is_deleted
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, WeChatUser>(&sql)
            .bind(id)
            .bind(req.nickname)
            .bind(req.name)
            .bind(req.avatar)
            .bind(req.address)
            .bind(req.gender)
            .fetch_one(pool)
            .await
    }

    pub async fn update_phone(pool: &PgPool, id: i64, phone: &str) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "UPDATE wechat_users SET phone = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, WeChatUser>(&sql)
            .bind(id)
            .bind(phone)
            .fetch_one(pool)
            .await
    }

    pub async fn open_id_of(pool: &PgPool, id: i64) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT open_id FROM wechat_users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

pub fn default_nickname(open_id: &str) -> String {
    let suffix: String = open_id.chars().rev().take(6).collect::<Vec<_>>().into_iter().rev().collect();
    format!("微信用户{}", suffix)
}
