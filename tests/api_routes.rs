use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::config;
use community_backend::{AppState, build_router, utils::generate_token, wechat::WechatClient};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

mod common;

fn app() -> Router {
    let config = config();
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(300))
        .connect_lazy(&config.database_url)
        .unwrap();
    let redis = Arc::new(redis::Client::open(config.redis_url.clone()).unwrap());
    let state = AppState {
        pool,
        wechat: WechatClient::new(&config, redis),
        config,
    };
    build_router(state)
}

async fn send(req: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(req).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn ping_is_public() {
    let (status, json) = send(get("/api/v1/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], 0);
    assert_eq!(json["resp_data"]["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_token() {
    for uri in [
        "/api/v1/user/me",
        "/api/v1/message",
        "/api/v1/feedback",
        "/api/v1/work",
        "/api/v1/appointment/by_user",
        "/api/v1/notification/received",
    ] {
        let (status, json) = send(get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(json["code"], 1002, "{}", uri);
    }
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let (status, json) = send(get_with_token("/api/v1/message", "not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["msg"], "Token无效");
}

#[tokio::test]
async fn token_signed_with_other_secret_is_rejected_on_staff_routes() {
    let mut other = config();
    other.jwt_secret = "someone-else".into();
    let (token, _) = generate_token(1, &other).unwrap();

    let (status, json) = send(get_with_token("/api/v1/staff/work", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["msg"], "Token无效");
}

#[tokio::test]
async fn writes_on_public_resources_still_need_auth() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/evaluation")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"title":"好","description":"很好"}"#))
        .unwrap();
    let (status, _) = send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/upload")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, json) = send(get("/api/v1/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], 1004);
}

#[tokio::test]
async fn database_failure_is_reported_generically() {
    let (status, json) = send(get("/api/v1/carousel")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], 5000);
    assert_eq!(json["msg"], "数据库错误");
}
