use axum::{
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::model::{News, Notification};
use crate::{
    AppState,
    error::{AppError, AppResult},
    routes::user::WeChatUser,
    utils::success_to_api_response,
};

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub category: Option<i64>,
}

#[axum::debug_handler]
pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> AppResult<impl IntoResponse> {
    let news = News::list(&state.pool, query.category).await?;
    Ok(success_to_api_response(news))
}

#[axum::debug_handler]
pub async fn get_news(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let news = News::find(&state.pool, id).await?.ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(news))
}

/// 当前用户收到的通知
#[axum::debug_handler]
pub async fn received_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
) -> AppResult<impl IntoResponse> {
    let notifications = Notification::received_by(&state.pool, user.id).await?;
    Ok(success_to_api_response(notifications))
}
