use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::model::{
    Consult, ConsultRequest, Evaluation, EvaluationRequest, Favorite, FavoriteRequest, Feedback,
    FeedbackImage, FeedbackImageRequest, FeedbackRequest, ImageQuery, Report, ReportImage,
    ReportImageRequest, ReportRequest,
};
use crate::{
    AppState,
    common::{require_text, soft_delete, soft_delete_child_owned, soft_delete_owned},
    error::{AppError, AppResult},
    routes::{message::Message, user::WeChatUser},
    utils::success_to_api_response,
};

const CONSULT_MESSAGE_TYPE: &str = "预约咨询";
const CONSULT_MESSAGE_CONTENT: &str = "您已提交预约咨询。请耐心等待工作人员的回复";

// ---- 评价 ----

#[axum::debug_handler]
pub async fn create_evaluation(
    State(state): State<AppState>,
    Json(req): Json<EvaluationRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate(true)?;
    let evaluation = Evaluation::create(&state.pool, req).await?;
    Ok((StatusCode::CREATED, success_to_api_response(evaluation)))
}

#[axum::debug_handler]
pub async fn update_evaluation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<EvaluationRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate(false)?;
    let evaluation = Evaluation::update(&state.pool, id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(evaluation))
}

#[axum::debug_handler]
pub async fn delete_evaluation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !soft_delete(&state.pool, "evaluations", id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---- 意见反馈 ----

#[axum::debug_handler]
pub async fn list_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
) -> AppResult<impl IntoResponse> {
    let feedback = Feedback::list_by_user(&state.pool, user.id).await?;
    Ok(success_to_api_response(feedback))
}

#[axum::debug_handler]
pub async fn get_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let feedback = Feedback::find_owned(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(feedback))
}

#[axum::debug_handler]
pub async fn create_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<FeedbackRequest>,
) -> AppResult<impl IntoResponse> {
    require_text(&req.content, "反馈内容", 10_000)?;
    let feedback = Feedback::create(&state.pool, user.id, &req.content).await?;
    tracing::info!("User {} submitted feedback {}", user.id, feedback.id);
    Ok((StatusCode::CREATED, success_to_api_response(feedback)))
}

#[axum::debug_handler]
pub async fn update_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
    Json(req): Json<FeedbackRequest>,
) -> AppResult<impl IntoResponse> {
    require_text(&req.content, "反馈内容", 10_000)?;
    let feedback = Feedback::update_content(&state.pool, id, user.id, &req.content)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(feedback))
}

#[axum::debug_handler]
pub async fn delete_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !soft_delete_owned(&state.pool, "feedbacks", id, user.id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_feedback_images(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Query(query): Query<ImageQuery>,
) -> AppResult<impl IntoResponse> {
    let images = FeedbackImage::list_owned(&state.pool, user.id, query.feedback).await?;
    Ok(success_to_api_response(images))
}

#[axum::debug_handler]
pub async fn get_feedback_image(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let image = FeedbackImage::find_owned(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(image))
}

#[axum::debug_handler]
pub async fn create_feedback_image(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<FeedbackImageRequest>,
) -> AppResult<impl IntoResponse> {
    require_text(&req.image, "图片", 255)?;
    let image = FeedbackImage::create(&state.pool, user.id, req.feedback, &req.image)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, success_to_api_response(image)))
}

#[axum::debug_handler]
pub async fn delete_feedback_image(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let deleted = soft_delete_child_owned(
        &state.pool,
        "feedback_images",
        "feedbacks",
        "feedback_id",
        id,
        user.id,
    )
    .await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---- 问题上报 ----

#[axum::debug_handler]
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
) -> AppResult<impl IntoResponse> {
    let reports = Report::list_by_user(&state.pool, user.id).await?;
    Ok(success_to_api_response(reports))
}

#[axum::debug_handler]
pub async fn get_report(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let report = Report::find_owned(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(report))
}

#[axum::debug_handler]
pub async fn create_report(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<ReportRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate(true)?;
    let report = Report::create(&state.pool, user.id, req).await?;
    tracing::info!("User {} submitted report {}", user.id, report.id);
    Ok((StatusCode::CREATED, success_to_api_response(report)))
}

#[axum::debug_handler]
pub async fn update_report(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
    Json(req): Json<ReportRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate(false)?;
    let report = Report::update(&state.pool, id, user.id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(report))
}

#[axum::debug_handler]
pub async fn delete_report(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !soft_delete_owned(&state.pool, "reports", id, user.id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_report_images(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Query(query): Query<ImageQuery>,
) -> AppResult<impl IntoResponse> {
    let images = ReportImage::list_owned(&state.pool, user.id, query.report).await?;
    Ok(success_to_api_response(images))
}

#[axum::debug_handler]
pub async fn get_report_image(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let image = ReportImage::find_owned(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(image))
}

#[axum::debug_handler]
pub async fn create_report_image(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<ReportImageRequest>,
) -> AppResult<impl IntoResponse> {
    require_text(&req.image, "图片", 255)?;
    let image = ReportImage::create(&state.pool, user.id, req.report, &req.image)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, success_to_api_response(image)))
}

#[axum::debug_handler]
pub async fn delete_report_image(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let deleted = soft_delete_child_owned(
        &state.pool,
        "report_images",
        "reports",
        "report_id",
        id,
        user.id,
    )
    .await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---- 收藏 ----

#[axum::debug_handler]
pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
) -> AppResult<impl IntoResponse> {
    let favorites = Favorite::list_by_user(&state.pool, user.id).await?;
    Ok(success_to_api_response(favorites))
}

#[axum::debug_handler]
pub async fn get_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let favorite = Favorite::find_owned(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(favorite))
}

#[axum::debug_handler]
pub async fn create_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<FavoriteRequest>,
) -> AppResult<impl IntoResponse> {
    require_text(&req.item, "收藏项", 100)?;
    let favorite = Favorite::create(&state.pool, user.id, &req.item).await?;
    Ok((StatusCode::CREATED, success_to_api_response(favorite)))
}

#[axum::debug_handler]
pub async fn update_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
    Json(req): Json<FavoriteRequest>,
) -> AppResult<impl IntoResponse> {
    require_text(&req.item, "收藏项", 100)?;
    let favorite = Favorite::update(&state.pool, id, user.id, &req.item)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(favorite))
}

#[axum::debug_handler]
pub async fn delete_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !soft_delete_owned(&state.pool, "favorites", id, user.id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---- 预约咨询 ----

#[axum::debug_handler]
pub async fn list_consults(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
) -> AppResult<impl IntoResponse> {
    let consults = Consult::list_by_user(&state.pool, user.id).await?;
    Ok(success_to_api_response(consults))
}

#[axum::debug_handler]
pub async fn get_consult(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let consult = Consult::find_owned(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(consult))
}

/// 提交预约咨询，同一事务内给提交人发一条站内消息
#[axum::debug_handler]
pub async fn create_consult(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<ConsultRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate(true)?;

    let mut tx = state.pool.begin().await?;
    let consult = Consult::create(&mut *tx, user.id, req).await?;
    Message::send(&mut *tx, user.id, CONSULT_MESSAGE_TYPE, CONSULT_MESSAGE_CONTENT).await?;
    tx.commit().await?;

    tracing::info!("User {} submitted consult {}", user.id, consult.id);
    Ok((StatusCode::CREATED, success_to_api_response(consult)))
}

#[axum::debug_handler]
pub async fn update_consult(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
    Json(req): Json<ConsultRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate(false)?;
    let consult = Consult::update(&state.pool, id, user.id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(consult))
}

#[axum::debug_handler]
pub async fn delete_consult(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !soft_delete_owned(&state.pool, "consults", id, user.id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
