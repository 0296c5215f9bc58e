use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::model::{MenuCategory, Page};
use crate::{
    AppState,
    error::{AppError, AppResult},
    routes::catalog::list_active,
    utils::success_to_api_response,
};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub name: Option<String>,
}

#[axum::debug_handler]
pub async fn list_pages(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let pages = match query.name {
        Some(name) => Page::find_by_name(&state.pool, &name).await?,
        None => list_active::<Page>(&state.pool).await?,
    };
    Ok(success_to_api_response(pages))
}

#[axum::debug_handler]
pub async fn list_menu_categories(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let categories = MenuCategory::list(&state.pool).await?;
    Ok(success_to_api_response(categories))
}

#[axum::debug_handler]
pub async fn get_menu_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let category = MenuCategory::find(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(category))
}
