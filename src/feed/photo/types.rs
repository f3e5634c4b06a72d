//! 照片 API DTO（请求和响应结构体）

use crate::feed::photo::models::{Photo, PhotoUrls};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

/// 服务端返回的照片地址集合
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoUrlsResult {
    #[serde(default)]
    pub raw: String,
    pub full: String,
    pub regular: String,
    pub small: String,
    #[serde(default)]
    pub thumb: String,
}

/// 服务端返回的照片记录（`GET /photos` 数组元素）
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoResult {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub liked_by_user: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    pub urls: PhotoUrlsResult,
}

/// 点赞 / 取消点赞响应（`{ "photo": ... }`）
#[derive(Debug, Clone, Deserialize)]
pub struct LikePhotoResult {
    pub photo: PhotoResult,
}

/// 照片记录校验失败
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhotoDecodeError {
    #[error("照片 id 为空")]
    EmptyId,
    #[error("照片 {id} 创建时间格式无效: {value}")]
    InvalidDate { id: String, value: String },
    #[error("照片 {id} 尺寸无效: {width}x{height}")]
    InvalidSize { id: String, width: u32, height: u32 },
    #[error("照片 {id} 地址无效: {value}")]
    InvalidUrl { id: String, value: String },
}

/// 校验绝对 http(s) 地址
fn absolute_url(id: &str, value: &str) -> Result<String, PhotoDecodeError> {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(url.to_string()),
        _ => Err(PhotoDecodeError::InvalidUrl {
            id: id.to_string(),
            value: value.to_string(),
        }),
    }
}

impl TryFrom<PhotoResult> for Photo {
    type Error = PhotoDecodeError;

    fn try_from(result: PhotoResult) -> Result<Self, Self::Error> {
        if result.id.is_empty() {
            return Err(PhotoDecodeError::EmptyId);
        }

        let created_at = match result.created_at.as_deref() {
            None | Some("") => None,
            Some(value) => Some(
                DateTime::parse_from_rfc3339(value)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|_| PhotoDecodeError::InvalidDate {
                        id: result.id.clone(),
                        value: value.to_string(),
                    })?,
            ),
        };

        if result.width == 0 || result.height == 0 {
            return Err(PhotoDecodeError::InvalidSize {
                id: result.id,
                width: result.width,
                height: result.height,
            });
        }

        let urls = PhotoUrls {
            small: absolute_url(&result.id, &result.urls.small)?,
            regular: absolute_url(&result.id, &result.urls.regular)?,
            full: absolute_url(&result.id, &result.urls.full)?,
        };

        Ok(Photo {
            id: result.id,
            created_at,
            width: result.width,
            height: result.height,
            color: result.color.unwrap_or_default(),
            is_liked: result.liked_by_user.unwrap_or(false),
            description: result.description.unwrap_or_default(),
            urls,
        })
    }
}
