use axum::{
    extract::{Extension, Json, State},
    response::IntoResponse,
};

use crate::{
    AppState,
    error::{AppError, AppResult},
    utils::{generate_token, success_to_api_response},
};

use super::model::{
    BindPhoneRequest, LoginRequest, LoginResponse, RefreshTokenResponse, UpdateProfileRequest,
    WeChatUser,
};

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    let open_id = state
        .wechat
        .code_to_openid(&req.code)
        .await?
        .ok_or_else(|| AppError::NotAcceptable("获取OpenID失败".into()))?;

    let (user, created) = WeChatUser::get_or_create(
        &state.pool,
        &open_id,
        req.nickname.as_deref(),
        req.avatar.as_deref(),
    )
    .await?;

    if user.is_deleted {
        return Err(AppError::Unauthorized("未找到用户".into()));
    }
    if !user.is_active {
        return Err(AppError::Unauthorized("当前用户未激活".into()));
    }

    let (token, expires_at) = generate_token(user.id, &state.config)?;
    tracing::info!("User {} logged in (new: {})", user.id, created);

    Ok(success_to_api_response(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

#[axum::debug_handler]
pub async fn me(Extension(user): Extension<WeChatUser>) -> impl IntoResponse {
    success_to_api_response(user)
}

#[axum::debug_handler]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let user = WeChatUser::update_profile(&state.pool, user.id, req).await?;
    Ok(success_to_api_response(user))
}

#[axum::debug_handler]
pub async fn bind_phone(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    Json(req): Json<BindPhoneRequest>,
) -> AppResult<impl IntoResponse> {
    let phone = state
        .wechat
        .phone_number(&req.code)
        .await?
        .ok_or_else(|| AppError::NotAcceptable("获取手机号失败".into()))?;

    let user = WeChatUser::update_phone(&state.pool, user.id, &phone).await?;
    Ok(success_to_api_response(user))
}

#[axum::debug_handler]
pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
) -> AppResult<impl IntoResponse> {
    let (token, expires_at) = generate_token(user.id, &state.config)?;
    Ok(success_to_api_response(RefreshTokenResponse { token, expires_at }))
}
