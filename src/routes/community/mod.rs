mod handler;
mod model;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::{AppState, routes::catalog};

pub use handler::*;
pub use model::{
    Consult, ConsultPhone, ConsultTime, Evaluation, Favorite, Feedback, FeedbackImage, Report,
    ReportImage, ServiceList,
};

// 咨询电话、咨询时段、服务清单、评价（只读）
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog::routes::<ConsultPhone>("consult_phone"))
        .merge(catalog::routes::<ConsultTime>("consult_time"))
        .merge(catalog::routes::<ServiceList>("service_list"))
        .merge(catalog::routes::<Evaluation>("evaluation"))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/evaluation", post(create_evaluation))
        .route(
            "/evaluation/{id}",
            patch(update_evaluation)
                .put(update_evaluation)
                .delete(delete_evaluation),
        )
        .route("/feedback", get(list_feedback).post(create_feedback))
        .route("/feedback/by_user", get(list_feedback))
        .route(
            "/feedback/{id}",
            get(get_feedback)
                .patch(update_feedback)
                .put(update_feedback)
                .delete(delete_feedback),
        )
        .route(
            "/feedback_image",
            get(list_feedback_images).post(create_feedback_image),
        )
        .route(
            "/feedback_image/{id}",
            get(get_feedback_image).delete(delete_feedback_image),
        )
        .route("/report", get(list_reports).post(create_report))
        .route("/report/by_user", get(list_reports))
        .route(
            "/report/{id}",
            get(get_report)
                .patch(update_report)
                .put(update_report)
                .delete(delete_report),
        )
        .route("/report_image", get(list_report_images).post(create_report_image))
        .route(
            "/report_image/{id}",
            get(get_report_image).delete(delete_report_image),
        )
        .route("/favorite", get(list_favorites).post(create_favorite))
        .route(
            "/favorite/{id}",
            get(get_favorite)
                .patch(update_favorite)
                .put(update_favorite)
                .delete(delete_favorite),
        )
        .route("/consult", get(list_consults).post(create_consult))
        .route("/consult/by_user", get(list_consults))
        .route(
            "/consult/{id}",
            get(get_consult)
                .patch(update_consult)
                .put(update_consult)
                .delete(delete_consult),
        )
}
