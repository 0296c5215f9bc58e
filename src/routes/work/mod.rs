mod handler;
mod model;

use axum::{Router, routing::get};

use crate::{AppState, routes::catalog};

pub use handler::*;
pub use model::{
    Appointment, AppointmentStatus, AppointmentTime, AppointmentType, StaffAppointmentUpdate,
    StaffTicketUpdate, StatusUpdate, Ticket, TicketImage, TicketReview, TicketStatus, TicketType,
    WorkStatus, is_assignable_worker, parse_status,
};

// 预约类型、预约时段、工单类型
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog::routes::<AppointmentType>("appointment_type"))
        .merge(catalog::routes::<AppointmentTime>("appointment_time"))
        .merge(catalog::routes::<TicketType>("work_type"))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/appointment", get(list_appointments).post(create_appointment))
        .route("/appointment/by_user", get(list_appointments))
        .route(
            "/appointment/{id}",
            get(get_appointment)
                .patch(update_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route("/work", get(list_tickets).post(create_ticket))
        .route("/work/by_user", get(list_tickets))
        .route(
            "/work/{id}",
            get(get_ticket)
                .patch(update_ticket)
                .put(update_ticket)
                .delete(delete_ticket),
        )
        .route(
            "/work_image",
            get(list_ticket_images).post(create_ticket_image),
        )
        .route(
            "/work_image/{id}",
            get(get_ticket_image).delete(delete_ticket_image),
        )
        .route("/work_review", get(list_reviews).post(upsert_review))
        .route(
            "/work_review/{id}",
            get(get_review)
                .patch(update_review)
                .put(update_review)
                .delete(delete_review),
        )
}
