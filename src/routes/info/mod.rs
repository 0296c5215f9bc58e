mod handler;
mod model;

use axum::{Router, routing::get};

use crate::{AppState, routes::catalog};

pub use handler::{get_news, list_news, received_notifications};
pub use model::{Activity, CreateNotificationRequest, News, NewsTag, Notification, TelephoneDirectory};

// 便民电话、新闻、活动、通知
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog::routes::<TelephoneDirectory>("telephone"))
        .route("/news", get(list_news))
        .route("/news/{id}", get(get_news))
        .merge(catalog::routes::<Activity>("activity"))
        .merge(catalog::routes::<Notification>("notification"))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/notification/received", get(received_notifications))
}
