use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use crate::{
    AppState,
    error::AppError,
    routes::user::WeChatUser,
    utils::verify_token,
};

/// 校验 Bearer Token 并把当前微信用户放进请求扩展
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| AppError::Unauthorized("未提供身份认证信息".into()))?;

    let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::Unauthorized("Token无效".into())
    })?;

    let user = WeChatUser::find_by_id(&state.pool, claims.user_id)
        .await?
        .filter(|u| !u.is_deleted)
        .ok_or_else(|| AppError::Unauthorized("未找到用户".into()))?;

    if !user.is_active {
        return Err(AppError::Unauthorized("当前用户未激活".into()));
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// 工作人员（role >= 1）才能访问，需挂在 auth_middleware 之后
pub async fn staff_only(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<WeChatUser>() {
        Some(user) if user.is_staff() => Ok(next.run(req).await),
        Some(_) => Err(AppError::Forbidden),
        None => Err(AppError::Unauthorized("未提供身份认证信息".into())),
    }
}
