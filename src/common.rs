// 各资源共用的记录操作与字段校验

use sqlx::PgPool;

use crate::error::AppError;

/// 软删除：只打标记，不删行
pub async fn soft_delete(pool: &PgPool, table: &str, id: i64) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "UPDATE {} SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
        table
    );
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// 软删除当前用户自己的记录，其他人的记录视为不存在
pub async fn soft_delete_owned(
    pool: &PgPool,
    table: &str,
    id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "UPDATE {} SET is_deleted = TRUE, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND NOT is_deleted",
        table
    );
    let result = sqlx::query(&sql).bind(id).bind(user_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// 软删除挂在某条用户记录下的图片
pub async fn soft_delete_child_owned(
    pool: &PgPool,
    table: &str,
    parent_table: &str,
    parent_column: &str,
    id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "UPDATE {table} c SET is_deleted = TRUE, updated_at = NOW() \
         FROM {parent_table} p \
         WHERE c.id = $1 AND c.{parent_column} = p.id AND p.user_id = $2 \
           AND NOT c.is_deleted AND NOT p.is_deleted"
    );
    let result = sqlx::query(&sql).bind(id).bind(user_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// 必填文本：去掉首尾空白后不能为空，且不超过 max 个字符
pub fn require_text(value: &str, field: &str, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::Validation(format!("{}不能为空", field)));
    }
    if len > max {
        return Err(AppError::Validation(format!("{}不能超过{}个字符", field, max)));
    }
    Ok(())
}

/// 选填文本，只校验长度
pub fn optional_text(value: Option<&str>, field: &str, max: usize) -> Result<(), AppError> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::Validation(format!(
            "{}不能超过{}个字符",
            field, max
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_blank_and_long() {
        assert!(require_text("反馈内容", "内容", 10).is_ok());
        assert!(matches!(require_text("   ", "内容", 10), Err(AppError::Validation(_))));
        assert!(require_text(&"字".repeat(11), "内容", 10).is_err());
        assert!(require_text(&"字".repeat(10), "内容", 10).is_ok());
    }

    #[test]
    fn optional_text_checks_length_only() {
        assert!(optional_text(None, "地址", 5).is_ok());
        assert!(optional_text(Some(""), "地址", 5).is_ok());
        assert!(optional_text(Some("123456"), "地址", 5).is_err());
    }
}
