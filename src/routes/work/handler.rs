use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use super::model::{
    Appointment, AppointmentRequest, ReviewQuery, Ticket, TicketImage, TicketImageRequest,
    TicketRequest, TicketReview, TicketReviewRequest,
};
use crate::{
    AppState,
    common::{require_text, soft_delete_child_owned, soft_delete_owned},
    error::{AppError, AppResult},
    routes::user::WeChatUser,
    utils::success_to_api_response,
};

// ---- 服务预约 ----

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
) -> AppResult<impl IntoResponse> {
    let appointments = Appointment::list_by_user(&state.pool, user.id).await?;
    Ok(success_to_api_response(appointments))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let appointment = Appointment::find_owned(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(appointment))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<AppointmentRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate(true)?;
    let appointment = Appointment::create(&state.pool, user.id, req).await?;
    tracing::info!("User {} created appointment {}", user.id, appointment.id);
    Ok((StatusCode::CREATED, success_to_api_response(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
    Json(req): Json<AppointmentRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate(false)?;
    let appointment = Appointment::update_owned(&state.pool, id, user.id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !soft_delete_owned(&state.pool, "appointments", id, user.id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---- 工单 ----

#[axum::debug_handler]
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
) -> AppResult<impl IntoResponse> {
    let tickets = Ticket::list_by_user(&state.pool, &state.config, user.id).await?;
    Ok(success_to_api_response(tickets))
}

#[axum::debug_handler]
pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let ticket = Ticket::find_owned(&state.pool, &state.config, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(ticket))
}

#[axum::debug_handler]
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<TicketRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate(true)?;
    let ticket = Ticket::create(&state.pool, &state.config, user.id, req).await?;
    tracing::info!("User {} created ticket {}", user.id, ticket.id);
    Ok((StatusCode::CREATED, success_to_api_response(ticket)))
}

#[axum::debug_handler]
pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
    Json(req): Json<TicketRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate(false)?;
    let ticket = Ticket::update_owned(&state.pool, &state.config, id, user.id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(ticket))
}

#[axum::debug_handler]
pub async fn delete_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !soft_delete_owned(&state.pool, "tickets", id, user.id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---- 工单图片 ----

#[derive(Debug, Deserialize)]
pub struct TicketImageQuery {
    pub ticket: Option<i64>,
}

#[axum::debug_handler]
pub async fn list_ticket_images(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Query(query): Query<TicketImageQuery>,
) -> AppResult<impl IntoResponse> {
    let images: Vec<TicketImage> = TicketImage::list_owned(&state.pool, user.id, query.ticket)
        .await?
        .into_iter()
        .map(|image| image.with_url(&state.config))
        .collect();
    Ok(success_to_api_response(images))
}

#[axum::debug_handler]
pub async fn get_ticket_image(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let image = TicketImage::find_owned(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(image.with_url(&state.config)))
}

#[axum::debug_handler]
pub async fn create_ticket_image(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<TicketImageRequest>,
) -> AppResult<impl IntoResponse> {
    require_text(&req.image, "图片", 255)?;
    let image = TicketImage::create(&state.pool, user.id, req.ticket, &req.image)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, success_to_api_response(image.with_url(&state.config))))
}

#[axum::debug_handler]
pub async fn delete_ticket_image(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let deleted = soft_delete_child_owned(
        &state.pool,
        "ticket_images",
        "tickets",
        "ticket_id",
        id,
        user.id,
    )
    .await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---- 工单评价 ----

#[axum::debug_handler]
pub async fn list_reviews(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Query(query): Query<ReviewQuery>,
) -> AppResult<impl IntoResponse> {
    let reviews = TicketReview::list_owned(&state.pool, user.id, query.ticket).await?;
    Ok(success_to_api_response(reviews))
}

#[axum::debug_handler]
pub async fn get_review(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let review = TicketReview::find_owned(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(review))
}

/// 同一工单重复评价会覆盖上一次的内容，始终返回 201
#[axum::debug_handler]
pub async fn upsert_review(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<TicketReviewRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let ticket_id = req
        .ticket
        .ok_or_else(|| AppError::Validation("工单不能为空".into()))?;
    let review = TicketReview::upsert(&state.pool, user.id, ticket_id, req.comment, req.rating)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, success_to_api_response(review)))
}

#[axum::debug_handler]
pub async fn update_review(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
    Json(req): Json<TicketReviewRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let review = TicketReview::update_owned(&state.pool, id, user.id, req.comment, req.rating)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(review))
}

#[axum::debug_handler]
pub async fn delete_review(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let deleted = soft_delete_child_owned(
        &state.pool,
        "ticket_reviews",
        "tickets",
        "ticket_id",
        id,
        user.id,
    )
    .await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
