use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::routes::catalog::Catalog;
use crate::utils::{serialize_date_cn, serialize_datetime_cn};

#[derive(Debug, Serialize, FromRow)]
pub struct TelephoneDirectory {
    pub id: i64,
    pub title: String,
    pub number: String,
    pub address: Option<String>,
}

impl Catalog for TelephoneDirectory {
    const TABLE: &'static str = "telephone_directories";
    const COLUMNS: &'static str = "id, title, number, address";
}

#[derive(Debug, Serialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub image: Option<String>,
    #[serde(serialize_with = "serialize_date_cn")]
    pub created_at: DateTime<Utc>,
}

impl Catalog for Activity {
    const TABLE: &'static str = "activities";
    const COLUMNS: &'static str = "id, title, summary, content, category, image, created_at";
    const ORDER_BY: &'static str = "created_at DESC, id DESC";
}

#[derive(Debug, Serialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub attachment: Option<String>,
    #[serde(serialize_with = "serialize_datetime_cn")]
    pub created_at: DateTime<Utc>,
}

impl Catalog for Notification {
    const TABLE: &'static str = "notifications";
    const COLUMNS: &'static str = "id, title, summary, content, attachment, created_at";
    const ORDER_BY: &'static str = "created_at DESC, id DESC";
}

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub attachment: Option<String>,
    #[serde(default)]
    pub receivers: Vec<i64>,
}

impl CreateNotificationRequest {
    pub fn validate(&self) -> Result<(), String> {
        let title_len = self.title.trim().chars().count();
        if title_len == 0 || title_len > 100 {
            return Err("通知标题长度必须在1到100个字符之间".into());
        }
        if self.content.trim().is_empty() {
            return Err("通知内容不能为空".into());
        }
        if self.summary.as_ref().is_some_and(|s| s.chars().count() > 100) {
            return Err("通知摘要不能超过100个字符".into());
        }
        Ok(())
    }
}

impl Notification {
    pub async fn received_by(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT n.id, n.title, n.summary, n.content, n.attachment, n.created_at
            FROM notifications n
            JOIN notification_receivers r ON r.notification_id = n.id
            WHERE r.user_id = $1 AND n.is_active AND NOT n.is_deleted
            ORDER BY n.created_at DESC, n.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// 创建通知并写入接收人，返回实际存在的接收人ID
    pub async fn create<'c>(
        tx: &mut sqlx::Transaction<'c, sqlx::Postgres>,
        sender_id: i64,
        req: &CreateNotificationRequest,
    ) -> Result<(Self, Vec<i64>), sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (sender_id, title, summary, content, attachment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, summary, content, attachment, created_at
            "#,
        )
        .bind(sender_id)
        .bind(req.title.trim())
        .bind(&req.summary)
        .bind(&req.content)
        .bind(&req.attachment)
        .fetch_one(&mut **tx)
        .await?;

        let receivers = Self::add_receivers(&mut **tx, notification.id, &req.receivers).await?;
        Ok((notification, receivers))
    }

    async fn add_receivers<'e, E: PgExecutor<'e>>(
        executor: E,
        notification_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO notification_receivers (notification_id, user_id)
            SELECT $1, u.id FROM wechat_users u
            WHERE u.id = ANY($2) AND NOT u.is_deleted
            ON CONFLICT DO NOTHING
            RETURNING user_id
            "#,
        )
        .bind(notification_id)
        .bind(user_ids)
        .fetch_all(executor)
        .await
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NewsTag {
    pub name: String,
    pub color: String,
}

#[derive(Debug, FromRow)]
struct NewsTagLink {
    news_id: i64,
    #[sqlx(flatten)]
    tag: NewsTag,
}

#[derive(Debug, FromRow)]
struct NewsRow {
    id: i64,
    title: String,
    summary: Option<String>,
    content: String,
    image: Option<String>,
    category: Option<i64>,
    category_name: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub image: Option<String>,
    pub category: Option<i64>,
    pub category_name: Option<String>,
    pub tags: Vec<NewsTag>,
    #[serde(serialize_with = "serialize_date_cn")]
    pub created_at: DateTime<Utc>,
}

const NEWS_SELECT: &str = r#"
    SELECT n.id, n.title, n.summary, n.content, n.image,
           n.category_id AS category, c.name AS category_name, n.created_at
    FROM news n
    LEFT JOIN news_categories c ON c.id = n.category_id
    WHERE n.is_active AND NOT n.is_deleted
"#;

impl News {
    async fn attach_tags(pool: &PgPool, rows: Vec<NewsRow>) -> Result<Vec<Self>, sqlx::Error> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, NewsTagLink>(
            r#"
            SELECT l.news_id, t.name, t.color
            FROM news_tag_links l
            JOIN news_tags t ON t.id = l.tag_id
            WHERE l.news_id = ANY($1) AND t.is_active AND NOT t.is_deleted
            ORDER BY t.id
            "#,
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut tags: HashMap<i64, Vec<NewsTag>> = HashMap::new();
        for link in links {
            tags.entry(link.news_id).or_default().push(link.tag);
        }

        Ok(rows
            .into_iter()
            .map(|row| News {
                tags: tags.remove(&row.id).unwrap_or_default(),
                id: row.id,
                title: row.title,
                summary: row.summary,
                content: row.content,
                image: row.image,
                category: row.category,
                category_name: row.category_name,
                created_at: row.created_at,
            })
            .collect())
    }

    pub async fn list(pool: &PgPool, category: Option<i64>) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "{} AND ($1::BIGINT IS NULL OR n.category_id = $1) ORDER BY n.created_at DESC, n.id DESC",
            NEWS_SELECT
        );
        let rows = sqlx::query_as::<_, NewsRow>(&sql)
            .bind(category)
            .fetch_all(pool)
            .await?;
        Self::attach_tags(pool, rows).await
    }

    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("{} AND n.id = $1", NEWS_SELECT);
        let rows = sqlx::query_as::<_, NewsRow>(&sql)
            .bind(id)
            .fetch_all(pool)
            .await?;
        Ok(Self::attach_tags(pool, rows).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, content: &str) -> CreateNotificationRequest {
        CreateNotificationRequest {
            title: title.into(),
            summary: None,
            content: content.into(),
            attachment: None,
            receivers: vec![1, 2],
        }
    }

    #[test]
    fn notification_requires_title_and_content() {
        assert!(request("停水通知", "明日9点停水").validate().is_ok());
        assert!(request("  ", "明日9点停水").validate().is_err());
        assert!(request("停水通知", "").validate().is_err());
        assert!(request(&"长".repeat(101), "x").validate().is_err());
    }

    #[test]
    fn news_serializes_date_and_tags() {
        use chrono::TimeZone;
        let news = News {
            id: 1,
            title: "社区新闻".into(),
            summary: None,
            content: "内容".into(),
            image: None,
            category: Some(2),
            category_name: Some("社区动态".into()),
            tags: vec![NewsTag {
                name: "热点".into(),
                color: "red".into(),
            }],
            created_at: Utc.with_ymd_and_hms(2023, 8, 1, 2, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&news).unwrap();
        assert_eq!(json["created_at"], "2023年08月01日");
        assert_eq!(json["tags"][0]["name"], "热点");
        assert_eq!(json["category_name"], "社区动态");
    }
}
