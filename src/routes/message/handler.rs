use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::model::Message;
use crate::{
    AppState,
    error::{AppError, AppResult},
    routes::user::WeChatUser,
    utils::success_to_api_response,
};

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
) -> AppResult<impl IntoResponse> {
    let messages = Message::list_for(&state.pool, user.id).await?;
    Ok(success_to_api_response(messages))
}

#[axum::debug_handler]
pub async fn get_message(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let message = Message::find_for(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(message))
}

#[axum::debug_handler]
pub async fn mark_as_read(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let message = Message::mark_as_read(&state.pool, id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(message))
}

#[axum::debug_handler]
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !Message::soft_delete(&state.pool, id, user.id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
