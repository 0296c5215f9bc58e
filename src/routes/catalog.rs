//! 只读目录资源：只展示启用且未删除的记录，提供 list / retrieve 两个接口。

use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use sqlx::{FromRow, PgPool, postgres::PgRow};

use crate::{
    AppState,
    error::{AppError, AppResult},
    utils::success_to_api_response,
};

pub trait Catalog: for<'r> FromRow<'r, PgRow> + Serialize + Send + Unpin + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static str;
    const ORDER_BY: &'static str = "id ASC";
}

pub async fn list_active<T: Catalog>(pool: &PgPool) -> Result<Vec<T>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} WHERE is_active AND NOT is_deleted ORDER BY {}",
        T::COLUMNS,
        T::TABLE,
        T::ORDER_BY
    );
    sqlx::query_as::<_, T>(&sql).fetch_all(pool).await
}

pub async fn find_active<T: Catalog>(pool: &PgPool, id: i64) -> Result<Option<T>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = $1 AND is_active AND NOT is_deleted",
        T::COLUMNS,
        T::TABLE
    );
    sqlx::query_as::<_, T>(&sql).bind(id).fetch_optional(pool).await
}

pub async fn list<T: Catalog>(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let items = list_active::<T>(&state.pool).await?;
    Ok(success_to_api_response(items))
}

pub async fn retrieve<T: Catalog>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let item = find_active::<T>(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(item))
}

/// `/{name}` 与 `/{name}/{id}` 两条只读路由
pub fn routes<T: Catalog>(name: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("/{}", name), get(list::<T>))
        .route(&format!("/{}/{{id}}", name), get(retrieve::<T>))
}
