use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    common::require_text,
    error::{AppError, AppResult},
    routes::{
        community::{Feedback, Report},
        info::{CreateNotificationRequest, Notification},
        message::Message,
        user::WeChatUser,
        work::{
            Appointment, AppointmentStatus, StaffAppointmentUpdate, StaffTicketUpdate, Ticket,
            TicketStatus, WorkStatus, is_assignable_worker, parse_status,
        },
    },
    utils::{format_datetime_cn, success_to_api_response},
    wechat::status_template_data,
};

const NOTIFICATION_MESSAGE_TYPE: &str = "通知公告";

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<i32>,
}

/// 提交后推送订阅消息，不阻塞响应，失败只记日志
fn push_status_change<S: WorkStatus>(
    state: &AppState,
    template_id: Option<&String>,
    owner_id: i64,
    kind: &'static str,
    status: S,
) {
    let Some(template_id) = template_id.cloned() else {
        return;
    };
    let pool = state.pool.clone();
    let wechat = state.wechat.clone();
    let page = state.config.wx_message_page.clone();

    tokio::spawn(async move {
        let open_id = match WeChatUser::open_id_of(&pool, owner_id).await {
            Ok(Some(open_id)) => open_id,
            Ok(None) => {
                tracing::warn!("User {} not found, skip subscription message", owner_id);
                return;
            }
            Err(e) => {
                tracing::error!("Failed to load openid for user {}: {}", owner_id, e);
                return;
            }
        };
        let data = status_template_data(kind, status.label(), &format_datetime_cn(&Utc::now()));
        if !wechat
            .send_subscription_message(&open_id, &template_id, data, &page)
            .await
        {
            tracing::warn!("Subscription message to user {} was not delivered", owner_id);
        }
    });
}

#[axum::debug_handler]
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> AppResult<impl IntoResponse> {
    let tickets = Ticket::list_all(&state.pool, &state.config, query.status).await?;
    Ok(success_to_api_response(tickets))
}

#[axum::debug_handler]
pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(staff): Extension<WeChatUser>,
    Path(id): Path<i64>,
    Json(req): Json<StaffTicketUpdate>,
) -> AppResult<impl IntoResponse> {
    let status = parse_status::<TicketStatus>(req.status)?;

    let assignment = match req.worker {
        Some(_) if !staff.is_admin() => return Err(AppError::Forbidden),
        Some(worker_id) => {
            if !is_assignable_worker(&state.pool, worker_id).await? {
                return Err(AppError::Validation("指派的工作人员不存在".into()));
            }
            Some((worker_id, staff.id))
        }
        None => None,
    };

    let update = Ticket::staff_update(
        &state.pool,
        &state.config,
        id,
        status,
        req.replay,
        assignment,
    )
    .await?
    .ok_or(AppError::NotFound)?;

    if let Some(new_status) = update.changed {
        tracing::info!(
            "Staff {} moved ticket {} to {}",
            staff.id,
            id,
            new_status.label()
        );
        push_status_change(
            &state,
            state.config.wx_ticket_template_id.as_ref(),
            update.owner_id,
            "居民服务",
            new_status,
        );
    }

    Ok(success_to_api_response(update.record))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> AppResult<impl IntoResponse> {
    let appointments = Appointment::list_all(&state.pool, query.status).await?;
    Ok(success_to_api_response(appointments))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(staff): Extension<WeChatUser>,
    Path(id): Path<i64>,
    Json(req): Json<StaffAppointmentUpdate>,
) -> AppResult<impl IntoResponse> {
    let status = parse_status::<AppointmentStatus>(req.status)?;

    let update = Appointment::staff_update(&state.pool, id, status, req.reply)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(new_status) = update.changed {
        tracing::info!(
            "Staff {} moved appointment {} to {}",
            staff.id,
            id,
            new_status.label()
        );
        push_status_change(
            &state,
            state.config.wx_appointment_template_id.as_ref(),
            update.owner_id,
            "服务预约",
            new_status,
        );
    }

    Ok(success_to_api_response(update.record))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackReply {
    pub replay: String,
}

#[axum::debug_handler]
pub async fn reply_feedback(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<FeedbackReply>,
) -> AppResult<impl IntoResponse> {
    require_text(&req.replay, "回复内容", 10_000)?;
    let feedback = Feedback::reply(&state.pool, id, &req.replay)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(feedback))
}

#[derive(Debug, Deserialize)]
pub struct ReportReply {
    pub reply: String,
}

#[axum::debug_handler]
pub async fn reply_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ReportReply>,
) -> AppResult<impl IntoResponse> {
    require_text(&req.reply, "回复内容", 10_000)?;
    let report = Report::reply(&state.pool, id, &req.reply)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(report))
}

#[derive(Debug, Serialize)]
pub struct NotificationCreated {
    #[serde(flatten)]
    pub notification: Notification,
    pub receivers: Vec<i64>,
}

/// 管理员发布通知：写通知和接收人，并给每个接收人发一条站内消息
#[axum::debug_handler]
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(staff): Extension<WeChatUser>,
    Json(req): Json<CreateNotificationRequest>,
) -> AppResult<impl IntoResponse> {
    if !staff.is_admin() {
        return Err(AppError::Forbidden);
    }
    req.validate().map_err(AppError::Validation)?;

    let mut tx = state.pool.begin().await?;
    let (notification, receivers) = Notification::create(&mut tx, staff.id, &req).await?;
    for receiver in &receivers {
        Message::send(&mut *tx, *receiver, NOTIFICATION_MESSAGE_TYPE, &notification.title).await?;
    }
    tx.commit().await?;

    tracing::info!(
        "Admin {} published notification {} to {} users",
        staff.id,
        notification.id,
        receivers.len()
    );
    Ok((
        StatusCode::CREATED,
        success_to_api_response(NotificationCreated {
            notification,
            receivers,
        }),
    ))
}
