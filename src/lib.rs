use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use sqlx::PgPool;

use config::Config;
use error::AppError;
use middleware::{auth_middleware, staff_only};
use wechat::WechatClient;

pub mod common;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod utils;
pub mod wechat;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub wechat: WechatClient,
}

/// 组装全部业务路由（不含限流、CORS 等外层中间件）
pub fn build_router(state: AppState) -> Router {
    // 公开路由
    let public_routes = Router::new()
        .merge(routes::health::routes())
        .route("/user/login", post(routes::user::login))
        .merge(routes::system::public_routes())
        .merge(routes::info::public_routes())
        .merge(routes::community::public_routes())
        .merge(routes::work::public_routes());

    let staff_routes = routes::staff::routes().route_layer(from_fn(staff_only));

    // 需要登录的路由
    let protected_routes = Router::new()
        .route(
            "/user/me",
            get(routes::user::me)
                .patch(routes::user::update_me)
                .put(routes::user::update_me),
        )
        .route("/user/phone", post(routes::user::bind_phone))
        .route("/user/refresh-token", post(routes::user::refresh_token))
        .route("/message", get(routes::message::list_messages))
        .route("/message/by_user", get(routes::message::list_messages))
        .route(
            "/message/{id}",
            get(routes::message::get_message).delete(routes::message::delete_message),
        )
        .route(
            "/message/{id}/mark_as_read",
            post(routes::message::mark_as_read),
        )
        .merge(routes::info::protected_routes())
        .merge(routes::community::protected_routes())
        .merge(routes::work::protected_routes())
        .merge(routes::upload::routes(state.config.upload_max_bytes))
        .merge(staff_routes)
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest(
            &state.config.api_base_uri,
            Router::new().merge(public_routes).merge(protected_routes),
        )
        .fallback(|| async { AppError::NotFound })
        .with_state(state)
}
