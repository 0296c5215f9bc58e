use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::common::{optional_text, require_text};
use crate::error::AppError;
use crate::routes::catalog::Catalog;
use crate::utils::serialize_datetime_cn;

// ---- 只读目录 ----

#[derive(Debug, Serialize, FromRow)]
pub struct ConsultPhone {
    pub id: i64,
    pub title: String,
    pub phone: String,
    pub content: String,
}

impl Catalog for ConsultPhone {
    const TABLE: &'static str = "consult_phones";
    const COLUMNS: &'static str = "id, title, phone, content";
}

#[derive(Debug, Serialize, FromRow)]
pub struct ConsultTime {
    pub id: i64,
    pub time: String,
}

impl Catalog for ConsultTime {
    const TABLE: &'static str = "consult_times";
    const COLUMNS: &'static str = "id, time";
}

/// 公共服务清单
#[derive(Debug, Serialize, FromRow)]
pub struct ServiceList {
    pub id: i64,
    pub sxmc: String,
    pub blfs: String,
    pub fwsj: String,
    pub bjsx: String,
    pub fwdx: String,
    pub sxyj: String,
}

impl Catalog for ServiceList {
    const TABLE: &'static str = "service_lists";
    const COLUMNS: &'static str = "id, sxmc, blfs, fwsj, bjsx, fwdx, sxyj";
}

// ---- 评价 ----

#[derive(Debug, Serialize, FromRow)]
pub struct Evaluation {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub address: String,
}

impl Catalog for Evaluation {
    const TABLE: &'static str = "evaluations";
    const COLUMNS: &'static str = "id, title, description, address";
}

#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
}

impl EvaluationRequest {
    pub fn validate(&self, creating: bool) -> Result<(), AppError> {
        match (&self.title, creating) {
            (Some(title), _) => require_text(title, "评价标题", 100)?,
            (None, true) => return Err(AppError::Validation("评价标题不能为空".into())),
            _ => {}
        }
        match (&self.description, creating) {
            (Some(d), _) => require_text(d, "评价内容", 100)?,
            (None, true) => return Err(AppError::Validation("评价内容不能为空".into())),
            _ => {}
        }
        optional_text(self.address.as_deref(), "地址", 100)
    }
}

impl Evaluation {
    pub async fn create(pool: &PgPool, req: EvaluationRequest) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Evaluation>(
            "INSERT INTO evaluations (title, description, address) VALUES ($1, $2, $3) \
             RETURNING id, title, description, address",
        )
        .bind(req.title.unwrap_or_default())
        .bind(req.description.unwrap_or_default())
        .bind(req.address.unwrap_or_default())
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        req: EvaluationRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Evaluation>(
            r#"
            UPDATE evaluations
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                address = COALESCE($4, address),
                updated_at = NOW()
            WHERE id = $1 AND NOT is_deleted
            RETURNING id, title, description, address
            "#,
        )
        .bind(id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.address)
        .fetch_optional(pool)
        .await
    }
}

// ---- 意见反馈 ----

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FeedbackImage {
    pub id: i64,
    pub image: Option<String>,
    #[sqlx(rename = "feedback_id")]
    pub feedback: i64,
}

#[derive(Debug, FromRow)]
struct FeedbackRow {
    id: i64,
    user_id: i64,
    content: String,
    replay: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Feedback {
    pub id: i64,
    pub user: i64,
    pub content: String,
    pub replay: Option<String>,
    #[serde(serialize_with = "serialize_datetime_cn")]
    pub created_at: DateTime<Utc>,
    pub feedback_images: Vec<FeedbackImage>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackImageRequest {
    pub image: String,
    pub feedback: i64,
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub feedback: Option<i64>,
    pub report: Option<i64>,
}

const FEEDBACK_COLUMNS: &str = "id, user_id, content, replay, created_at";

impl Feedback {
    async fn attach_images(pool: &PgPool, rows: Vec<FeedbackRow>) -> Result<Vec<Self>, sqlx::Error> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let images = sqlx::query_as::<_, FeedbackImage>(
            "SELECT id, image, feedback_id FROM feedback_images \
             WHERE feedback_id = ANY($1) AND NOT is_deleted ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<FeedbackImage>> = HashMap::new();
        for image in images {
            grouped.entry(image.feedback).or_default().push(image);
        }

        Ok(rows
            .into_iter()
            .map(|row| Feedback {
                feedback_images: grouped.remove(&row.id).unwrap_or_default(),
                id: row.id,
                user: row.user_id,
                content: row.content,
                replay: row.replay,
                created_at: row.created_at,
            })
            .collect())
    }

    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM feedbacks WHERE user_id = $1 AND NOT is_deleted \
             ORDER BY created_at DESC, id DESC",
            FEEDBACK_COLUMNS
        );
        let rows = sqlx::query_as::<_, FeedbackRow>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Self::attach_images(pool, rows).await
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM feedbacks WHERE id = $1 AND user_id = $2 AND NOT is_deleted",
            FEEDBACK_COLUMNS
        );
        let rows = sqlx::query_as::<_, FeedbackRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Ok(Self::attach_images(pool, rows).await?.into_iter().next())
    }

    pub async fn create(pool: &PgPool, user_id: i64, content: &str) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO feedbacks (user_id, content) VALUES ($1, $2) RETURNING {}",
            FEEDBACK_COLUMNS
        );
        let row = sqlx::query_as::<_, FeedbackRow>(&sql)
            .bind(user_id)
            .bind(content)
            .fetch_one(pool)
            .await?;
        Self::attach_images(pool, vec![row])
            .await?
            .into_iter()
            .next()
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update_content(
        pool: &PgPool,
        id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE feedbacks SET content = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted RETURNING {}",
            FEEDBACK_COLUMNS
        );
        let rows = sqlx::query_as::<_, FeedbackRow>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(content)
            .fetch_all(pool)
            .await?;
        Ok(Self::attach_images(pool, rows).await?.into_iter().next())
    }

    /// 工作人员回复
    pub async fn reply(pool: &PgPool, id: i64, replay: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE feedbacks SET replay = $2, updated_at = NOW() \
             WHERE id = $1 AND NOT is_deleted RETURNING {}",
            FEEDBACK_COLUMNS
        );
        let rows = sqlx::query_as::<_, FeedbackRow>(&sql)
            .bind(id)
            .bind(replay)
            .fetch_all(pool)
            .await?;
        Ok(Self::attach_images(pool, rows).await?.into_iter().next())
    }
}

impl FeedbackImage {
    pub async fn list_owned(
        pool: &PgPool,
        user_id: i64,
        feedback_id: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FeedbackImage>(
            r#"
            SELECT i.id, i.image, i.feedback_id
            FROM feedback_images i
            JOIN feedbacks f ON f.id = i.feedback_id
            WHERE f.user_id = $1 AND ($2::BIGINT IS NULL OR i.feedback_id = $2)
              AND NOT i.is_deleted AND NOT f.is_deleted
            ORDER BY i.id
            "#,
        )
        .bind(user_id)
        .bind(feedback_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FeedbackImage>(
            r#"
            SELECT i.id, i.image, i.feedback_id
            FROM feedback_images i
            JOIN feedbacks f ON f.id = i.feedback_id
            WHERE i.id = $1 AND f.user_id = $2 AND NOT i.is_deleted AND NOT f.is_deleted
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 父反馈不属于当前用户时返回 None
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        feedback_id: i64,
        image: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FeedbackImage>(
            r#"
            INSERT INTO feedback_images (feedback_id, image)
            SELECT f.id, $3 FROM feedbacks f
            WHERE f.id = $1 AND f.user_id = $2 AND NOT f.is_deleted
            RETURNING id, image, feedback_id
            "#,
        )
        .bind(feedback_id)
        .bind(user_id)
        .bind(image)
        .fetch_optional(pool)
        .await
    }
}

// ---- 问题上报 ----

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReportImage {
    pub id: i64,
    pub image: Option<String>,
    #[sqlx(rename = "report_id")]
    pub report: i64,
}

#[derive(Debug, FromRow)]
struct ReportRow {
    id: i64,
    user_id: i64,
    name: String,
    phone: String,
    address: Option<String>,
    content: String,
    reply: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub id: i64,
    pub user: i64,
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub content: String,
    pub reply: Option<String>,
    #[serde(serialize_with = "serialize_datetime_cn")]
    pub created_at: DateTime<Utc>,
    pub report_images: Vec<ReportImage>,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub content: Option<String>,
}

impl ReportRequest {
    pub fn validate(&self, creating: bool) -> Result<(), AppError> {
        for (value, field, max) in [
            (&self.name, "联系人", 100),
            (&self.phone, "联系电话", 100),
            (&self.content, "反馈内容", 10_000),
        ] {
            match value {
                Some(v) => require_text(v, field, max)?,
                None if creating => {
                    return Err(AppError::Validation(format!("{}不能为空", field)));
                }
                None => {}
            }
        }
        optional_text(self.address.as_deref(), "地址", 255)
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportImageRequest {
    pub image: String,
    pub report: i64,
}

const REPORT_COLUMNS: &str = "id, user_id, name, phone, address, content, reply, created_at";

impl Report {
    async fn attach_images(pool: &PgPool, rows: Vec<ReportRow>) -> Result<Vec<Self>, sqlx::Error> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let images = sqlx::query_as::<_, ReportImage>(
            "SELECT id, image, report_id FROM report_images \
             WHERE report_id = ANY($1) AND NOT is_deleted ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<ReportImage>> = HashMap::new();
        for image in images {
            grouped.entry(image.report).or_default().push(image);
        }

        Ok(rows
            .into_iter()
            .map(|row| Report {
                report_images: grouped.remove(&row.id).unwrap_or_default(),
                id: row.id,
                user: row.user_id,
                name: row.name,
                phone: row.phone,
                address: row.address,
                content: row.content,
                reply: row.reply,
                created_at: row.created_at,
            })
            .collect())
    }

    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM reports WHERE user_id = $1 AND NOT is_deleted \
             ORDER BY created_at DESC, id DESC",
            REPORT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Self::attach_images(pool, rows).await
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM reports WHERE id = $1 AND user_id = $2 AND NOT is_deleted",
            REPORT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Ok(Self::attach_images(pool, rows).await?.into_iter().next())
    }

    pub async fn create(pool: &PgPool, user_id: i64, req: ReportRequest) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO reports (user_id, name, phone, address, content) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            REPORT_COLUMNS
        );
        let row = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(user_id)
            .bind(req.name.unwrap_or_default())
            .bind(req.phone.unwrap_or_default())
            .bind(req.address)
            .bind(req.content.unwrap_or_default())
            .fetch_one(pool)
            .await?;
        Self::attach_images(pool, vec![row])
            .await?
            .into_iter()
            .next()
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        user_id: i64,
        req: ReportRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE reports
            SET name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                address = COALESCE($5, address),
                content = COALESCE($6, content),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND NOT is_deleted
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(req.name)
            .bind(req.phone)
            .bind(req.address)
            .bind(req.content)
            .fetch_all(pool)
            .await?;
        Ok(Self::attach_images(pool, rows).await?.into_iter().next())
    }

    pub async fn reply(pool: &PgPool, id: i64, reply: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE reports SET reply = $2, updated_at = NOW() \
             WHERE id = $1 AND NOT is_deleted RETURNING {}",
            REPORT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(id)
            .bind(reply)
            .fetch_all(pool)
            .await?;
        Ok(Self::attach_images(pool, rows).await?.into_iter().next())
    }
}

impl ReportImage {
    pub async fn list_owned(
        pool: &PgPool,
        user_id: i64,
        report_id: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReportImage>(
            r#"
            SELECT i.id, i.image, i.report_id
            FROM report_images i
            JOIN reports r ON r.id = i.report_id
            WHERE r.user_id = $1 AND ($2::BIGINT IS NULL OR i.report_id = $2)
              AND NOT i.is_deleted AND NOT r.is_deleted
            ORDER BY i.id
            "#,
        )
        .bind(user_id)
        .bind(report_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReportImage>(
            r#"
            SELECT i.id, i.image, i.report_id
            FROM report_images i
            JOIN reports r ON r.id = i.report_id
            WHERE i.id = $1 AND r.user_id = $2 AND NOT i.is_deleted AND NOT r.is_deleted
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        report_id: i64,
        image: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReportImage>(
            r#"
            INSERT INTO report_images (report_id, image)
            SELECT r.id, $3 FROM reports r
            WHERE r.id = $1 AND r.user_id = $2 AND NOT r.is_deleted
            RETURNING id, image, report_id
            "#,
        )
        .bind(report_id)
        .bind(user_id)
        .bind(image)
        .fetch_optional(pool)
        .await
    }
}

// ---- 收藏 ----

#[derive(Debug, Serialize, FromRow)]
pub struct Favorite {
    pub id: i64,
    #[sqlx(rename = "user_id")]
    pub user: i64,
    pub item: String,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub item: String,
}

impl Favorite {
    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Favorite>(
            "SELECT id, user_id, item FROM favorites WHERE user_id = $1 AND NOT is_deleted \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Favorite>(
            "SELECT id, user_id, item FROM favorites WHERE id = $1 AND user_id = $2 AND NOT is_deleted",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &PgPool, user_id: i64, item: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Favorite>(
            "INSERT INTO favorites (user_id, item) VALUES ($1, $2) RETURNING id, user_id, item",
        )
        .bind(user_id)
        .bind(item)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        user_id: i64,
        item: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Favorite>(
            "UPDATE favorites SET item = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted RETURNING id, user_id, item",
        )
        .bind(id)
        .bind(user_id)
        .bind(item)
        .fetch_optional(pool)
        .await
    }
}

// ---- 预约咨询 ----

#[derive(Debug, Serialize, FromRow)]
pub struct Consult {
    pub id: i64,
    #[sqlx(rename = "user_id")]
    pub user: i64,
    pub phone: String,
    pub content: String,
    pub address: String,
    pub date: NaiveDate,
    #[sqlx(rename = "time_id")]
    pub time: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ConsultRequest {
    pub phone: Option<String>,
    pub content: Option<String>,
    pub address: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<i64>,
}

impl ConsultRequest {
    pub fn validate(&self, creating: bool) -> Result<(), AppError> {
        match &self.phone {
            Some(phone) => require_text(phone, "联系电话", 100)?,
            None if creating => return Err(AppError::Validation("联系电话不能为空".into())),
            None => {}
        }
        match &self.content {
            Some(content) => require_text(content, "咨询内容", 10_000)?,
            None if creating => return Err(AppError::Validation("咨询内容不能为空".into())),
            None => {}
        }
        if creating && self.date.is_none() {
            return Err(AppError::Validation("预约咨询日期不能为空".into()));
        }
        optional_text(self.address.as_deref(), "地址", 100)
    }
}

const CONSULT_COLUMNS: &str = "id, user_id, phone, content, address, date, time_id";

impl Consult {
    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM consults WHERE user_id = $1 AND NOT is_deleted \
             ORDER BY created_at DESC, id DESC",
            CONSULT_COLUMNS
        );
        sqlx::query_as::<_, Consult>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM consults WHERE id = $1 AND user_id = $2 AND NOT is_deleted",
            CONSULT_COLUMNS
        );
        sqlx::query_as::<_, Consult>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
        executor: E,
        user_id: i64,
        req: ConsultRequest,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO consults (user_id, phone, content, address, date, time_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            CONSULT_COLUMNS
        );
        sqlx::query_as::<_, Consult>(&sql)
            .bind(user_id)
            .bind(req.phone.unwrap_or_default())
            .bind(req.content.unwrap_or_default())
            .bind(req.address.unwrap_or_default())
            .bind(req.date)
            .bind(req.time)
            .fetch_one(executor)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        user_id: i64,
        req: ConsultRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE consults
            SET phone = COALESCE($3, phone),
                content = COALESCE($4, content),
                address = COALESCE($5, address),
                date = COALESCE($6, date),
                time_id = COALESCE($7, time_id),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND NOT is_deleted
            RETURNING {}
            "#,
            CONSULT_COLUMNS
        );
        sqlx::query_as::<_, Consult>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(req.phone)
            .bind(req.content)
            .bind(req.address)
            .bind(req.date)
            .bind(req.time)
            .fetch_optional(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_create_needs_contact_and_content() {
        let req = ReportRequest {
            name: Some("张三".into()),
            phone: Some("13800138000".into()),
            address: None,
            content: Some("路灯不亮".into()),
        };
        assert!(req.validate(true).is_ok());

        let req = ReportRequest {
            name: None,
            phone: Some("13800138000".into()),
            address: None,
            content: Some("路灯不亮".into()),
        };
        assert!(req.validate(true).is_err());
        assert!(req.validate(false).is_ok());
    }

    #[test]
    fn consult_create_needs_date() {
        let req = ConsultRequest {
            phone: Some("13800138000".into()),
            content: Some("咨询社保".into()),
            address: None,
            date: None,
            time: None,
        };
        assert!(req.validate(true).is_err());
        assert!(req.validate(false).is_ok());
    }

    #[test]
    fn evaluation_partial_update_skips_missing_fields() {
        let req = EvaluationRequest {
            title: None,
            description: Some("服务很好".into()),
            address: None,
        };
        assert!(req.validate(false).is_ok());
        assert!(req.validate(true).is_err());
    }

    #[test]
    fn feedback_serializes_user_and_images() {
        use chrono::TimeZone;
        let feedback = Feedback {
            id: 3,
            user: 9,
            content: "建议增加路灯".into(),
            replay: None,
            created_at: Utc.with_ymd_and_hms(2023, 8, 14, 1, 30, 0).unwrap(),
            feedback_images: vec![FeedbackImage {
                id: 1,
                image: Some("upload/feedback/a.png".into()),
                feedback: 3,
            }],
        };
        let json = serde_json::to_value(&feedback).unwrap();
        assert_eq!(json["user"], 9);
        assert_eq!(json["created_at"], "2023年08月14日 09:30");
        assert_eq!(json["feedback_images"][0]["feedback"], 3);
    }
}
