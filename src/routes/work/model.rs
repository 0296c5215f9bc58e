use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::common::{optional_text, require_text};
use crate::config::Config;
use crate::error::AppError;
use crate::routes::catalog::Catalog;
use crate::routes::message::Message;
use crate::routes::user::ROLE_WORKER;
use crate::utils::{is_valid_phone, serialize_datetime_cn};

pub const APPOINTMENT_CREATED_TYPE: &str = "服务预约";
pub const APPOINTMENT_CREATED_CONTENT: &str = "您已提交预约服务。请耐心等待工作人员的回复";
pub const APPOINTMENT_STATUS_TYPE: &str = "预约管理";
pub const TICKET_MESSAGE_TYPE: &str = "居民服务";
pub const TICKET_CREATED_CONTENT: &str = "你已提交居民服务，请等待工作人员的处理";

/// 带中文标签的状态码
pub trait WorkStatus: Copy + PartialEq + Send + 'static {
    fn from_code(code: i32) -> Option<Self>;
    fn code(self) -> i32;
    fn label(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl WorkStatus for AppointmentStatus {
    fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Approved),
            2 => Some(Self::Rejected),
            3 => Some(Self::Completed),
            _ => None,
        }
    }

    fn code(self) -> i32 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Rejected => 2,
            Self::Completed => 3,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Pending => "待审核",
            Self::Approved => "已通过",
            Self::Rejected => "已驳回",
            Self::Completed => "已完成",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Pending,
    Processing,
    Done,
}

impl WorkStatus for TicketStatus {
    fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Processing),
            2 => Some(Self::Done),
            _ => None,
        }
    }

    fn code(self) -> i32 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Done => 2,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Pending => "待处理",
            Self::Processing => "处理中",
            Self::Done => "已完成",
        }
    }
}

/// 把请求里的状态码转换成枚举，非法值返回 400
pub fn parse_status<S: WorkStatus>(code: Option<i32>) -> Result<Option<S>, AppError> {
    match code {
        None => Ok(None),
        Some(code) => S::from_code(code)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("无效的状态值: {}", code))),
    }
}

pub fn appointment_status_message(status: AppointmentStatus) -> String {
    format!("您提交的服务预约 {}。", status.label())
}

pub fn ticket_status_message(status: TicketStatus) -> String {
    format!("您提交的居民服务 {}。", status.label())
}

/// 工作人员更新后的结果；`changed` 为 Some 表示状态确实发生了变化
#[derive(Debug)]
pub struct StatusUpdate<T, S> {
    pub record: T,
    pub owner_id: i64,
    pub changed: Option<S>,
}

// 状态只有和库里不同时才算变更
fn status_change<S: WorkStatus>(requested: Option<S>, stored: i32) -> Option<S> {
    requested.filter(|s| s.code() != stored)
}

// ---- 只读目录 ----

#[derive(Debug, Serialize, FromRow)]
pub struct AppointmentType {
    pub id: i64,
    pub name: String,
    #[serde(serialize_with = "serialize_datetime_cn")]
    pub created_at: DateTime<Utc>,
}

impl Catalog for AppointmentType {
    const TABLE: &'static str = "appointment_types";
    const COLUMNS: &'static str = "id, name, created_at";
}

#[derive(Debug, Serialize, FromRow)]
pub struct AppointmentTime {
    pub id: i64,
    pub time: String,
}

impl Catalog for AppointmentTime {
    const TABLE: &'static str = "appointment_times";
    const COLUMNS: &'static str = "id, time";
}

#[derive(Debug, Serialize, FromRow)]
pub struct TicketType {
    pub id: i64,
    pub name: String,
}

impl Catalog for TicketType {
    const TABLE: &'static str = "ticket_types";
    const COLUMNS: &'static str = "id, name";
}

// ---- 服务预约 ----

#[derive(Debug, Serialize, FromRow)]
pub struct Appointment {
    pub id: i64,
    #[sqlx(rename = "user_id")]
    pub user: i64,
    pub name: String,
    pub phone: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type_id")]
    pub appointment_type: Option<i64>,
    pub date: Option<NaiveDate>,
    #[sqlx(rename = "time_id")]
    pub time: Option<i64>,
    pub remark: Option<String>,
    pub status: i32,
    pub reply: Option<String>,
    #[serde(serialize_with = "serialize_datetime_cn")]
    pub created_at: DateTime<Utc>,
    pub type_name: Option<String>,
    pub type_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "type")]
    pub appointment_type: Option<i64>,
    pub date: Option<NaiveDate>,
    pub time: Option<i64>,
    pub remark: Option<String>,
}

impl AppointmentRequest {
    pub fn validate(&self, creating: bool) -> Result<(), AppError> {
        for (value, field) in [(&self.name, "预约人姓名"), (&self.phone, "联系电话")] {
            match value {
                Some(v) => require_text(v, field, 100)?,
                None if creating => {
                    return Err(AppError::Validation(format!("{}不能为空", field)));
                }
                None => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct StaffAppointmentUpdate {
    pub status: Option<i32>,
    pub reply: Option<String>,
}

const APPOINTMENT_SELECT: &str = r#"
    SELECT a.id, a.user_id, a.name, a.phone, a.type_id, a.date, a.time_id, a.remark,
           a.status, a.reply, a.created_at, t.name AS type_name, tm.time AS type_time
    FROM appointments a
    LEFT JOIN appointment_types t ON t.id = a.type_id
    LEFT JOIN appointment_times tm ON tm.id = a.time_id
    WHERE NOT a.is_deleted
"#;

impl Appointment {
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("{} AND a.id = $1", APPOINTMENT_SELECT);
        sqlx::query_as::<_, Appointment>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("{} AND a.id = $1 AND a.user_id = $2", APPOINTMENT_SELECT);
        sqlx::query_as::<_, Appointment>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "{} AND a.user_id = $1 ORDER BY a.created_at DESC, a.id DESC",
            APPOINTMENT_SELECT
        );
        sqlx::query_as::<_, Appointment>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// 工作人员查看全部预约，可按状态过滤
    pub async fn list_all(pool: &PgPool, status: Option<i32>) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "{} AND ($1::INT IS NULL OR a.status = $1) ORDER BY a.created_at DESC, a.id DESC",
            APPOINTMENT_SELECT
        );
        sqlx::query_as::<_, Appointment>(&sql)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    /// 新建预约并通知提交人
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        req: AppointmentRequest,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO appointments (user_id, name, phone, type_id, date, time_id, remark)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(req.name.unwrap_or_default())
        .bind(req.phone.unwrap_or_default())
        .bind(req.appointment_type)
        .bind(req.date)
        .bind(req.time)
        .bind(req.remark)
        .fetch_one(&mut *tx)
        .await?;

        Message::send(
            &mut *tx,
            user_id,
            APPOINTMENT_CREATED_TYPE,
            APPOINTMENT_CREATED_CONTENT,
        )
        .await?;

        let appointment = Self::find(&mut *tx, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;
        Ok(appointment)
    }

    /// 居民只能修改描述性字段，状态和回复由工作人员处理
    pub async fn update_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
        req: AppointmentRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE appointments
            SET name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                type_id = COALESCE($5, type_id),
                date = COALESCE($6, date),
                time_id = COALESCE($7, time_id),
                remark = COALESCE($8, remark),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(req.name)
        .bind(req.phone)
        .bind(req.appointment_type)
        .bind(req.date)
        .bind(req.time)
        .bind(req.remark)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find(pool, id).await
    }

    /// 工作人员更新状态/回复。锁行后比较状态，变化时在同一事务里先写站内消息
    pub async fn staff_update(
        pool: &PgPool,
        id: i64,
        status: Option<AppointmentStatus>,
        reply: Option<String>,
    ) -> Result<Option<StatusUpdate<Self, AppointmentStatus>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked = sqlx::query_as::<_, (i64, i32)>(
            "SELECT user_id, status FROM appointments WHERE id = $1 AND NOT is_deleted FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((owner_id, stored)) = locked else {
            return Ok(None);
        };

        let changed = status_change(status, stored);
        if let Some(new_status) = changed {
            Message::send(
                &mut *tx,
                owner_id,
                APPOINTMENT_STATUS_TYPE,
                &appointment_status_message(new_status),
            )
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE appointments
            SET status = COALESCE($2, status),
                reply = COALESCE($3, reply),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.map(WorkStatus::code))
        .bind(reply)
        .execute(&mut *tx)
        .await?;

        let record = Self::find(&mut *tx, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;

        Ok(Some(StatusUpdate {
            record,
            owner_id,
            changed,
        }))
    }
}

// ---- 居民服务工单 ----

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TicketImage {
    pub id: i64,
    pub image: String,
    #[sqlx(rename = "ticket_id")]
    pub ticket: i64,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TicketReview {
    pub id: i64,
    #[sqlx(rename = "ticket_id")]
    pub ticket: i64,
    pub comment: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, FromRow)]
struct TicketRow {
    id: i64,
    user_id: i64,
    worker_id: Option<i64>,
    admin_id: Option<i64>,
    name: String,
    phone: String,
    address: Option<String>,
    ticket_type_id: Option<i64>,
    ticket_type_name: Option<String>,
    description: Option<String>,
    status: i32,
    replay: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Ticket {
    pub id: i64,
    pub user: i64,
    pub worker: Option<i64>,
    pub admin: Option<i64>,
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub ticket_type: Option<i64>,
    pub ticket_type_name: Option<String>,
    pub description: Option<String>,
    pub status: i32,
    pub replay: Option<String>,
    #[serde(serialize_with = "serialize_datetime_cn")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_datetime_cn")]
    pub updated_at: DateTime<Utc>,
    pub ticket_images: Vec<TicketImage>,
    pub ticket_reviews: Vec<TicketReview>,
}

#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub ticket_type: Option<i64>,
    pub description: Option<String>,
}

impl TicketRequest {
    pub fn validate(&self, creating: bool) -> Result<(), AppError> {
        match &self.name {
            Some(name) => require_text(name, "姓名", 30)?,
            None if creating => return Err(AppError::Validation("姓名不能为空".into())),
            None => {}
        }
        match &self.phone {
            Some(phone) if !is_valid_phone(phone) => {
                return Err(AppError::Validation("请输入有效的电话号码。".into()));
            }
            None if creating => return Err(AppError::Validation("联系电话不能为空".into())),
            _ => {}
        }
        optional_text(self.address.as_deref(), "地址", 100)
    }
}

#[derive(Debug, Deserialize)]
pub struct StaffTicketUpdate {
    pub status: Option<i32>,
    pub replay: Option<String>,
    pub worker: Option<i64>,
}

const TICKET_SELECT: &str = r#"
    SELECT k.id, k.user_id, k.worker_id, k.admin_id, k.name, k.phone, k.address,
           k.ticket_type_id, t.name AS ticket_type_name, k.description, k.status,
           k.replay, k.created_at, k.updated_at
    FROM tickets k
    LEFT JOIN ticket_types t ON t.id = k.ticket_type_id
    WHERE NOT k.is_deleted
"#;

impl Ticket {
    /// 补上图片（带完整地址）和评价
    async fn attach(
        pool: &PgPool,
        config: &Config,
        rows: Vec<TicketRow>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let images = sqlx::query_as::<_, TicketImage>(
            "SELECT id, image, ticket_id FROM ticket_images \
             WHERE ticket_id = ANY($1) AND NOT is_deleted ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;
        let reviews = sqlx::query_as::<_, TicketReview>(
            "SELECT id, ticket_id, comment, rating FROM ticket_reviews \
             WHERE ticket_id = ANY($1) AND NOT is_deleted ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut grouped_images: HashMap<i64, Vec<TicketImage>> = HashMap::new();
        for image in images {
            let image = image.with_url(config);
            grouped_images.entry(image.ticket).or_default().push(image);
        }
        let mut grouped_reviews: HashMap<i64, Vec<TicketReview>> = HashMap::new();
        for review in reviews {
            grouped_reviews.entry(review.ticket).or_default().push(review);
        }

        Ok(rows
            .into_iter()
            .map(|row| Ticket {
                ticket_images: grouped_images.remove(&row.id).unwrap_or_default(),
                ticket_reviews: grouped_reviews.remove(&row.id).unwrap_or_default(),
                id: row.id,
                user: row.user_id,
                worker: row.worker_id,
                admin: row.admin_id,
                name: row.name,
                phone: row.phone,
                address: row.address,
                ticket_type: row.ticket_type_id,
                ticket_type_name: row.ticket_type_name,
                description: row.description,
                status: row.status,
                replay: row.replay,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    pub async fn find(pool: &PgPool, config: &Config, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("{} AND k.id = $1", TICKET_SELECT);
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id)
            .fetch_all(pool)
            .await?;
        Ok(Self::attach(pool, config, rows).await?.into_iter().next())
    }

    pub async fn find_owned(
        pool: &PgPool,
        config: &Config,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("{} AND k.id = $1 AND k.user_id = $2", TICKET_SELECT);
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Ok(Self::attach(pool, config, rows).await?.into_iter().next())
    }

    pub async fn list_by_user(
        pool: &PgPool,
        config: &Config,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "{} AND k.user_id = $1 ORDER BY k.created_at DESC, k.id DESC",
            TICKET_SELECT
        );
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Self::attach(pool, config, rows).await
    }

    pub async fn list_all(
        pool: &PgPool,
        config: &Config,
        status: Option<i32>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "{} AND ($1::INT IS NULL OR k.status = $1) ORDER BY k.created_at DESC, k.id DESC",
            TICKET_SELECT
        );
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(status)
            .fetch_all(pool)
            .await?;
        Self::attach(pool, config, rows).await
    }

    /// 新建工单并通知提交人
    pub async fn create(
        pool: &PgPool,
        config: &Config,
        user_id: i64,
        req: TicketRequest,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO tickets (user_id, name, phone, address, ticket_type_id, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(req.name.unwrap_or_default())
        .bind(req.phone.unwrap_or_default())
        .bind(req.address)
        .bind(req.ticket_type)
        .bind(req.description)
        .fetch_one(&mut *tx)
        .await?;

        Message::send(&mut *tx, user_id, TICKET_MESSAGE_TYPE, TICKET_CREATED_CONTENT).await?;
        tx.commit().await?;

        Self::find(pool, config, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update_owned(
        pool: &PgPool,
        config: &Config,
        id: i64,
        user_id: i64,
        req: TicketRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE tickets
            SET name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                address = COALESCE($5, address),
                ticket_type_id = COALESCE($6, ticket_type_id),
                description = COALESCE($7, description),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(req.name)
        .bind(req.phone)
        .bind(req.address)
        .bind(req.ticket_type)
        .bind(req.description)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find(pool, config, id).await
    }

    /// 工作人员处理工单：状态、回复、指派。比较的是工单自身的当前状态
    pub async fn staff_update(
        pool: &PgPool,
        config: &Config,
        id: i64,
        status: Option<TicketStatus>,
        replay: Option<String>,
        assignment: Option<(i64, i64)>,
    ) -> Result<Option<StatusUpdate<Self, TicketStatus>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked = sqlx::query_as::<_, (i64, i32)>(
            "SELECT user_id, status FROM tickets WHERE id = $1 AND NOT is_deleted FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((owner_id, stored)) = locked else {
            return Ok(None);
        };

        let changed = status_change(status, stored);
        if let Some(new_status) = changed {
            Message::send(
                &mut *tx,
                owner_id,
                TICKET_MESSAGE_TYPE,
                &ticket_status_message(new_status),
            )
            .await?;
        }

        let (worker_id, admin_id) = assignment.unzip();
        sqlx::query(
            r#"
            UPDATE tickets
            SET status = COALESCE($2, status),
                replay = COALESCE($3, replay),
                worker_id = COALESCE($4, worker_id),
                admin_id = COALESCE($5, admin_id),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.map(WorkStatus::code))
        .bind(replay)
        .bind(worker_id)
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let record = Self::find(pool, config, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(Some(StatusUpdate {
            record,
            owner_id,
            changed,
        }))
    }
}

/// 指派对象必须是未删除的工作人员或管理员
pub async fn is_assignable_worker(pool: &PgPool, user_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM wechat_users WHERE id = $1 AND role >= $2 AND NOT is_deleted)",
    )
    .bind(user_id)
    .bind(ROLE_WORKER)
    .fetch_one(pool)
    .await
}

#[derive(Debug, Deserialize)]
pub struct TicketImageRequest {
    pub image: String,
    pub ticket: i64,
}

impl TicketImage {
    /// 填上可直接访问的完整地址
    pub fn with_url(mut self, config: &Config) -> Self {
        if !self.image.is_empty() {
            self.image_url = Some(config.media_url(&self.image));
        }
        self
    }

    pub async fn list_owned(
        pool: &PgPool,
        user_id: i64,
        ticket_id: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TicketImage>(
            r#"
            SELECT i.id, i.image, i.ticket_id
            FROM ticket_images i
            JOIN tickets k ON k.id = i.ticket_id
            WHERE k.user_id = $1 AND ($2::BIGINT IS NULL OR i.ticket_id = $2)
              AND NOT i.is_deleted AND NOT k.is_deleted
            ORDER BY i.id
            "#,
        )
        .bind(user_id)
        .bind(ticket_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TicketImage>(
            r#"
            SELECT i.id, i.image, i.ticket_id
            FROM ticket_images i
            JOIN tickets k ON k.id = i.ticket_id
            WHERE i.id = $1 AND k.user_id = $2 AND NOT i.is_deleted AND NOT k.is_deleted
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 工单不属于当前用户时返回 None
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        ticket_id: i64,
        image: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TicketImage>(
            r#"
            INSERT INTO ticket_images (ticket_id, image)
            SELECT k.id, $3 FROM tickets k
            WHERE k.id = $1 AND k.user_id = $2 AND NOT k.is_deleted
            RETURNING id, image, ticket_id
            "#,
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(image)
        .fetch_optional(pool)
        .await
    }
}

#[derive(Debug, Deserialize)]
pub struct TicketReviewRequest {
    pub ticket: Option<i64>,
    pub comment: Option<String>,
    pub rating: Option<i32>,
}

impl TicketReviewRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        match self.rating {
            Some(rating) if !(1..=5).contains(&rating) => {
                Err(AppError::Validation("评分必须在1到5之间".into()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub ticket: Option<i64>,
}

impl TicketReview {
    pub async fn list_owned(
        pool: &PgPool,
        user_id: i64,
        ticket_id: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TicketReview>(
            r#"
            SELECT r.id, r.ticket_id, r.comment, r.rating
            FROM ticket_reviews r
            JOIN tickets k ON k.id = r.ticket_id
            WHERE k.user_id = $1 AND ($2::BIGINT IS NULL OR r.ticket_id = $2)
              AND NOT r.is_deleted AND NOT k.is_deleted
            ORDER BY r.id
            "#,
        )
        .bind(user_id)
        .bind(ticket_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TicketReview>(
            r#"
            SELECT r.id, r.ticket_id, r.comment, r.rating
            FROM ticket_reviews r
            JOIN tickets k ON k.id = r.ticket_id
            WHERE r.id = $1 AND k.user_id = $2 AND NOT r.is_deleted AND NOT k.is_deleted
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 每张工单只有一条评价：已存在则覆盖，否则新建
    pub async fn upsert(
        pool: &PgPool,
        user_id: i64,
        ticket_id: i64,
        comment: Option<String>,
        rating: Option<i32>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TicketReview>(
            r#"
            INSERT INTO ticket_reviews (ticket_id, comment, rating)
            SELECT k.id, $3, $4 FROM tickets k
            WHERE k.id = $1 AND k.user_id = $2 AND NOT k.is_deleted
            ON CONFLICT (ticket_id) DO UPDATE
            SET comment = EXCLUDED.comment,
                rating = EXCLUDED.rating,
                is_deleted = FALSE,
                updated_at = NOW()
            RETURNING id, ticket_id, comment, rating
            "#,
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(comment)
        .bind(rating)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
        comment: Option<String>,
        rating: Option<i32>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TicketReview>(
            r#"
            UPDATE ticket_reviews r
            SET comment = COALESCE($3, r.comment),
                rating = COALESCE($4, r.rating),
                updated_at = NOW()
            FROM tickets k
            WHERE r.id = $1 AND r.ticket_id = k.id AND k.user_id = $2
              AND NOT r.is_deleted AND NOT k.is_deleted
            RETURNING r.id, r.ticket_id, r.comment, r.rating
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(comment)
        .bind(rating)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip_with_labels() {
        assert_eq!(AppointmentStatus::from_code(2), Some(AppointmentStatus::Rejected));
        assert_eq!(AppointmentStatus::Rejected.label(), "已驳回");
        assert_eq!(TicketStatus::from_code(1).map(WorkStatus::label), Some("处理中"));
        assert_eq!(TicketStatus::from_code(3), None);
        assert_eq!(AppointmentStatus::from_code(-1), None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(matches!(
            parse_status::<TicketStatus>(Some(7)),
            Err(AppError::Validation(_))
        ));
        assert_eq!(parse_status::<TicketStatus>(None).unwrap(), None);
        assert_eq!(
            parse_status::<AppointmentStatus>(Some(3)).unwrap(),
            Some(AppointmentStatus::Completed)
        );
    }

    #[test]
    fn status_messages_use_labels() {
        assert_eq!(
            ticket_status_message(TicketStatus::Done),
            "您提交的居民服务 已完成。"
        );
        assert_eq!(
            appointment_status_message(AppointmentStatus::Approved),
            "您提交的服务预约 已通过。"
        );
    }

    #[test]
    fn only_a_different_status_counts_as_change() {
        assert_eq!(status_change(Some(TicketStatus::Processing), 0), Some(TicketStatus::Processing));
        assert_eq!(status_change(Some(TicketStatus::Processing), 1), None);
        assert_eq!(status_change::<TicketStatus>(None, 1), None);
    }

    #[test]
    fn ticket_phone_and_name_are_checked() {
        let mut req = TicketRequest {
            name: Some("李四".into()),
            phone: Some("13800138000".into()),
            address: None,
            ticket_type: Some(1),
            description: Some("水管漏水".into()),
        };
        assert!(req.validate(true).is_ok());

        req.phone = Some("call me".into());
        match req.validate(true) {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "请输入有效的电话号码。"),
            other => panic!("unexpected: {:?}", other),
        }

        req.phone = Some("1234567890123456".into());
        assert!(req.validate(true).is_err());

        req.phone = Some("13800138000".into());
        req.name = Some("名".repeat(31));
        assert!(req.validate(true).is_err());
    }

    #[test]
    fn ticket_partial_update_may_omit_fields() {
        let req = TicketRequest {
            name: None,
            phone: None,
            address: Some("幸福小区3栋".into()),
            ticket_type: None,
            description: None,
        };
        assert!(req.validate(false).is_ok());
        assert!(req.validate(true).is_err());
    }

    #[test]
    fn review_rating_must_be_one_to_five() {
        let review = |rating| TicketReviewRequest {
            ticket: Some(1),
            comment: None,
            rating,
        };
        assert!(review(Some(1)).validate().is_ok());
        assert!(review(Some(5)).validate().is_ok());
        assert!(review(None).validate().is_ok());
        assert!(review(Some(0)).validate().is_err());
        assert!(review(Some(6)).validate().is_err());
    }

    #[test]
    fn ticket_image_gets_absolute_url() {
        let config = crate::config::test_config();
        let image = TicketImage {
            id: 1,
            image: "/upload/2023/08/01/a.png".into(),
            ticket: 9,
            image_url: None,
        }
        .with_url(&config);
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["image_url"], "https://example.com/upload/2023/08/01/a.png");
        assert_eq!(json["ticket"], 9);

        let empty = TicketImage {
            id: 2,
            image: String::new(),
            ticket: 9,
            image_url: None,
        }
        .with_url(&config);
        assert!(serde_json::to_value(&empty).unwrap().get("image_url").is_none());
    }

    #[test]
    fn appointment_serializes_type_field() {
        use chrono::TimeZone;
        let appointment = Appointment {
            id: 1,
            user: 2,
            name: "王五".into(),
            phone: "13800138000".into(),
            appointment_type: Some(4),
            date: NaiveDate::from_ymd_opt(2023, 8, 20),
            time: Some(1),
            remark: None,
            status: 0,
            reply: None,
            created_at: Utc.with_ymd_and_hms(2023, 8, 14, 1, 30, 0).unwrap(),
            type_name: Some("法律咨询".into()),
            type_time: Some("上午".into()),
        };
        let json = serde_json::to_value(&appointment).unwrap();
        assert_eq!(json["type"], 4);
        assert_eq!(json["user"], 2);
        assert_eq!(json["date"], "2023-08-20");
        assert_eq!(json["type_name"], "法律咨询");
        assert_eq!(json["created_at"], "2023年08月14日 09:30");
    }
}
