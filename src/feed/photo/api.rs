//! 照片 HTTP API 客户端
//!
//! 负责所有照片相关的 HTTP 请求：分页拉取信息流、点赞 / 取消点赞

use crate::feed::error::{ApiError, ApiResult};
use crate::feed::photo::models::Photo;
use crate::feed::photo::types::{LikePhotoResult, PhotoResult};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 同步服务使用的远程信息流接口
#[async_trait]
pub trait PhotoFeedApi: Send + Sync {
    /// 拉取第 `page` 页（从 1 开始）照片
    async fn fetch_photos(&self, token: &str, page: u32, per_page: u32) -> ApiResult<Vec<Photo>>;

    /// 点赞（`is_like = true`）或取消点赞，返回服务端的最新照片状态
    async fn change_like(&self, token: &str, photo_id: &str, is_like: bool) -> ApiResult<Photo>;
}

/// 照片相关的 HTTP API 客户端
#[derive(Clone)]
pub struct PhotoApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl PhotoApi {
    /// 创建新的照片 API 客户端
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 发送请求并检查 HTTP 状态，返回响应 body
    async fn send(&self, request: reqwest::RequestBuilder, action: &str) -> ApiResult<Vec<u8>> {
        let operation_id = Uuid::new_v4().to_string();
        debug!("[PhotoAPI]   {}，操作ID: {}", action, operation_id);

        let response = request.send().await.map_err(|e| {
            error!("[PhotoAPI] {}请求失败: {:?}", action, e);
            ApiError::Transport(e)
        })?;

        let status = response.status();
        let body_bytes = response.bytes().await?;

        if !status.is_success() {
            let body_str = String::from_utf8_lossy(&body_bytes).to_string();
            error!(
                "[PhotoAPI] {}失败，HTTP状态: {}, 响应: {}",
                action, status, body_str
            );
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body: body_str,
            });
        }

        Ok(body_bytes.to_vec())
    }

    /// 逐条解析照片数组，无效记录记录日志后跳过
    pub(crate) fn decode_photo_list(body: &[u8]) -> ApiResult<Vec<Photo>> {
        let values: Vec<serde_json::Value> = serde_json::from_slice(body).map_err(|e| {
            error!(
                "[PhotoAPI] 照片列表反序列化失败: {:?}\n原始响应: {}",
                e,
                String::from_utf8_lossy(body)
            );
            ApiError::Decode(e.to_string())
        })?;

        let total = values.len();
        let photos: Vec<Photo> = values
            .into_iter()
            .filter_map(|value| {
                let result = match serde_json::from_value::<PhotoResult>(value) {
                    Ok(result) => result,
                    Err(e) => {
                        warn!("[PhotoAPI] 跳过无法解析的照片记录: {}", e);
                        return None;
                    }
                };
                match Photo::try_from(result) {
                    Ok(photo) => Some(photo),
                    Err(e) => {
                        warn!("[PhotoAPI] 跳过无效的照片记录: {}", e);
                        None
                    }
                }
            })
            .collect();

        if photos.len() != total {
            warn!(
                "[PhotoAPI] 照片列表共 {} 条，有效 {} 条",
                total,
                photos.len()
            );
        }
        Ok(photos)
    }
}

#[async_trait]
impl PhotoFeedApi for PhotoApi {
    async fn fetch_photos(&self, token: &str, page: u32, per_page: u32) -> ApiResult<Vec<Photo>> {
        let url = format!("{}/photos", self.api_base_url);
        info!("[PhotoAPI] 📡 请求照片列表，第 {} 页，每页 {} 条", page, per_page);
        debug!("[PhotoAPI]   请求URL: {}", url);

        let request = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("page", page), ("per_page", per_page)]);

        let body = self.send(request, "照片列表").await?;
        let photos = Self::decode_photo_list(&body)?;

        info!("[PhotoAPI] ✅ 第 {} 页返回 {} 张照片", page, photos.len());
        Ok(photos)
    }

    async fn change_like(&self, token: &str, photo_id: &str, is_like: bool) -> ApiResult<Photo> {
        let url = format!("{}/photos/{}/like", self.api_base_url, photo_id);
        info!(
            "[PhotoAPI] 📡 {}照片: {}",
            if is_like { "点赞" } else { "取消点赞" },
            photo_id
        );
        debug!("[PhotoAPI]   请求URL: {}", url);

        let method = if is_like {
            reqwest::Method::POST
        } else {
            reqwest::Method::DELETE
        };
        let request = self.client.request(method, &url).bearer_auth(token);

        let body = self.send(request, "点赞状态").await?;
        let result: LikePhotoResult = serde_json::from_slice(&body).map_err(|e| {
            error!(
                "[PhotoAPI] 点赞响应反序列化失败: {:?}\n原始响应: {}",
                e,
                String::from_utf8_lossy(&body)
            );
            ApiError::Decode(e.to_string())
        })?;

        let photo = Photo::try_from(result.photo).map_err(|e| ApiError::Decode(e.to_string()))?;
        info!(
            "[PhotoAPI] ✅ 照片 {} 点赞状态: {}",
            photo.id, photo.is_liked
        );
        Ok(photo)
    }
}
