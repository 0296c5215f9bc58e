//! 文件上传：按日期分目录，文件名取内容的 sha256，重复上传同一文件只保存一份。

use std::path::Path;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Extension, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{
    AppState,
    config::Config,
    error::{AppError, AppResult},
    routes::user::WeChatUser,
    utils::{china_offset, success_to_api_response},
};

const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "gif", "png", "bmp", "webp", "pdf", "doc", "docx", "xls", "xlsx",
];

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub path: String,
    pub url: String,
}

/// 取小写扩展名，不在白名单内返回 None
pub fn allowed_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// upload/YYYY/MM/DD/{sha256}.{ext}
pub fn storage_path(at: &DateTime<FixedOffset>, data: &[u8], ext: &str) -> String {
    let digest = Sha256::digest(data);
    format!("upload/{}/{:x}.{}", at.format("%Y/%m/%d"), digest, ext)
}

/// 校验并落盘，返回相对路径与可访问地址
pub async fn save_upload(config: &Config, file_name: &str, data: &[u8]) -> AppResult<UploadedFile> {
    let ext = allowed_extension(file_name)
        .ok_or_else(|| AppError::Validation("不支持的文件类型".into()))?;
    if data.is_empty() {
        return Err(AppError::Validation("文件不能为空".into()));
    }
    if data.len() > config.upload_max_bytes {
        return Err(AppError::Validation(format!(
            "文件大小不能超过{}字节",
            config.upload_max_bytes
        )));
    }

    let now = Utc::now().with_timezone(&china_offset());
    let relative = storage_path(&now, data, &ext);
    let full = Path::new(&config.media_root).join(&relative);
    if let Some(dir) = full.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&full, data).await?;

    Ok(UploadedFile {
        url: config.media_url(&relative),
        path: relative,
    })
}

#[axum::debug_handler]
pub async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<WeChatUser>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("上传数据无效: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("读取文件失败: {}", e)))?;

        let saved = save_upload(&state.config, &file_name, &data).await?;
        tracing::info!("User {} uploaded {}", user.id, saved.path);
        return Ok((StatusCode::CREATED, success_to_api_response(saved)));
    }

    Err(AppError::Validation("缺少file字段".into()))
}

pub fn routes(max_bytes: usize) -> Router<AppState> {
    // 给 multipart 边界和其他字段留些余量，真正的大小校验在 save_upload 里
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_bytes + 64 * 1024))
}
