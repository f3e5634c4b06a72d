//! 用户资料 HTTP API 客户端

use crate::feed::error::{ApiError, ApiResult};
use crate::feed::profile::models::{Profile, ProfileImage};
use crate::feed::profile::types::{ProfileResult, UserResult};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 用户资料 API 客户端
#[derive(Clone)]
pub struct ProfileApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl ProfileApi {
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, token: &str) -> ApiResult<T> {
        let operation_id = Uuid::new_v4().to_string();
        debug!("[Profile]   请求URL: {}，操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                error!("[Profile] 请求失败: {:?}", e);
                ApiError::Transport(e)
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("[Profile] 请求失败，HTTP状态: {}, 响应: {}", status, body);
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("[Profile] 响应反序列化失败: {:?}\n原始响应: {}", e, body);
            ApiError::Decode(e.to_string())
        })
    }

    /// 当前用户资料（`GET /me`）
    pub async fn fetch_profile(&self, token: &str) -> ApiResult<Profile> {
        info!("[Profile] 📡 请求当前用户资料");
        let url = format!("{}/me", self.api_base_url);
        let result: ProfileResult = self.get_json(&url, token).await?;
        Ok(Profile::from(result))
    }

    /// 用户头像地址（`GET /users/{username}`）
    pub async fn fetch_profile_image(&self, token: &str, username: &str) -> ApiResult<ProfileImage> {
        info!("[Profile] 📡 请求用户头像: {}", username);
        let url = format!("{}/users/{}", self.api_base_url, username);
        let result: UserResult = self.get_json(&url, token).await?;
        Ok(ProfileImage::from(result))
    }
}
