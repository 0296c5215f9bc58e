mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::AppState;

pub use handler::{
    create_notification, list_appointments, list_tickets, reply_feedback, reply_report,
    update_appointment, update_ticket,
};

// 工作人员后台：工单/预约处理、回复、发布通知。挂载在 staff_only 之后
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/staff/work", get(list_tickets))
        .route("/staff/work/{id}", patch(update_ticket).put(update_ticket))
        .route("/staff/appointment", get(list_appointments))
        .route(
            "/staff/appointment/{id}",
            patch(update_appointment).put(update_appointment),
        )
        .route("/staff/feedback/{id}", patch(reply_feedback))
        .route("/staff/report/{id}", patch(reply_report))
        .route("/staff/notification", post(create_notification))
}
