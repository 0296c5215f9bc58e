use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::utils::serialize_datetime_cn;

const MESSAGE_COLUMNS: &str = "id, type, content, receiver_id, is_read, created_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub content: String,
    pub receiver_id: i64,
    pub is_read: bool,
    #[serde(serialize_with = "serialize_datetime_cn")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// 给用户发一条站内消息；可以传入连接池或进行中的事务
    pub async fn send<'e, E: PgExecutor<'e>>(
        executor: E,
        receiver_id: i64,
        kind: &str,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO messages (type, content, receiver_id) VALUES ($1, $2, $3) RETURNING {}",
            MESSAGE_COLUMNS
        );
        sqlx::query_as::<_, Message>(&sql)
            .bind(kind)
            .bind(content)
            .bind(receiver_id)
            .fetch_one(executor)
            .await
    }

    pub async fn list_for(pool: &PgPool, receiver_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM messages WHERE receiver_id = $1 AND is_active AND NOT is_deleted \
             ORDER BY created_at DESC, id DESC",
            MESSAGE_COLUMNS
        );
        sqlx::query_as::<_, Message>(&sql)
            .bind(receiver_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_for(
        pool: &PgPool,
        id: i64,
        receiver_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM messages WHERE id = $1 AND receiver_id = $2 AND NOT is_deleted",
            MESSAGE_COLUMNS
        );
        sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .bind(receiver_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_as_read(
        pool: &PgPool,
        id: i64,
        receiver_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE messages SET is_read = TRUE, updated_at = NOW() \
             WHERE id = $1 AND receiver_id = $2 AND NOT is_deleted RETURNING {}",
            MESSAGE_COLUMNS
        );
        sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .bind(receiver_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: i64, receiver_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE messages SET is_deleted = TRUE, updated_at = NOW() \
             WHERE id = $1 AND receiver_id = $2 AND NOT is_deleted",
        )
        .bind(id)
        .bind(receiver_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
