use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::routes::catalog::Catalog;

#[derive(Debug, Serialize, FromRow)]
pub struct Carousel {
    pub id: i64,
    pub title: String,
    pub image: String,
    pub target_url: String,
    pub description: String,
}

impl Catalog for Carousel {
    const TABLE: &'static str = "carousels";
    const COLUMNS: &'static str = "id, title, image, target_url, description";
}

#[derive(Debug, Serialize, FromRow)]
pub struct SystemParam {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub description: String,
}

impl Catalog for SystemParam {
    const TABLE: &'static str = "system_params";
    const COLUMNS: &'static str = "id, key, value, description";
}

#[derive(Debug, Serialize, FromRow)]
pub struct Page {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub content: String,
    pub signature: String,
}

impl Catalog for Page {
    const TABLE: &'static str = "pages";
    const COLUMNS: &'static str = "id, name, title, content, signature";
}

impl Page {
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Page>(
            "SELECT id, name, title, content, signature FROM pages \
             WHERE name = $1 AND is_active AND NOT is_deleted",
        )
        .bind(name)
        .fetch_all(pool)
        .await
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub appid: Option<String>,
}

#[derive(Debug, FromRow)]
struct LinkedMenuItem {
    category_id: i64,
    #[sqlx(flatten)]
    item: MenuItem,
}

#[derive(Debug, FromRow)]
struct MenuCategoryRow {
    id: i64,
    name: String,
    url: String,
    icon: String,
    color: String,
}

#[derive(Debug, Serialize)]
pub struct MenuCategory {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub icon: String,
    pub color: String,
    pub items: Vec<MenuItem>,
}

impl MenuCategory {
    async fn load(pool: &PgPool, rows: Vec<MenuCategoryRow>) -> Result<Vec<Self>, sqlx::Error> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, LinkedMenuItem>(
            r#"
            SELECT l.category_id, i.id, i.name, i.url, i.icon, i.color, i.appid
            FROM menu_category_items l
            JOIN menu_items i ON i.id = l.item_id
            WHERE l.category_id = ANY($1) AND i.is_active AND NOT i.is_deleted
            ORDER BY i.id
            "#,
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<MenuItem>> = HashMap::new();
        for link in links {
            grouped.entry(link.category_id).or_default().push(link.item);
        }

        Ok(rows
            .into_iter()
            .map(|row| MenuCategory {
                items: grouped.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                url: row.url,
                icon: row.icon,
                color: row.color,
            })
            .collect())
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MenuCategoryRow>(
            "SELECT id, name, url, icon, color FROM menu_categories \
             WHERE is_active AND NOT is_deleted ORDER BY id",
        )
        .fetch_all(pool)
        .await?;
        Self::load(pool, rows).await
    }

    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MenuCategoryRow>(
            "SELECT id, name, url, icon, color FROM menu_categories \
             WHERE id = $1 AND is_active AND NOT is_deleted",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;
        Ok(Self::load(pool, rows).await?.into_iter().next())
    }
}
