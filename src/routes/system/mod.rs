mod handler;
mod model;

use axum::{Router, routing::get};

use crate::{AppState, routes::catalog};

pub use handler::{get_menu_category, list_menu_categories, list_pages};
pub use model::{Carousel, MenuCategory, MenuItem, Page, SystemParam};

// 首页轮播、系统参数、菜单、单页
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog::routes::<Carousel>("carousel"))
        .merge(catalog::routes::<SystemParam>("system_params"))
        .route("/menu_category", get(list_menu_categories))
        .route("/menu_category/{id}", get(get_menu_category))
        .route("/pages", get(list_pages))
        .route("/pages/{id}", get(catalog::retrieve::<Page>))
}
