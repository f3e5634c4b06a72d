//! 用户资料服务
//!
//! 资料和头像请求各自按令牌单飞：相同令牌的请求进行中时拒绝，新令牌取代旧请求。

use crate::feed::error::ApiResult;
use crate::feed::flight::SupersedingFlight;
use crate::feed::profile::api::ProfileApi;
use crate::feed::profile::models::{Profile, ProfileImage, ProfileStorage};
use std::sync::{Arc, RwLock};
use tracing::info;

/// 用户资料服务
pub struct ProfileService {
    api: ProfileApi,
    storage: Arc<ProfileStorage>,
    avatar: RwLock<Option<ProfileImage>>,
    profile_flight: SupersedingFlight,
    image_flight: SupersedingFlight,
}

impl ProfileService {
    pub fn new(api: ProfileApi, storage: Arc<ProfileStorage>) -> Self {
        Self {
            api,
            storage,
            avatar: RwLock::new(None),
            profile_flight: SupersedingFlight::new("Profile"),
            image_flight: SupersedingFlight::new("ProfileImage"),
        }
    }

    pub fn storage(&self) -> &Arc<ProfileStorage> {
        &self.storage
    }

    /// 最近一次获取到的头像地址
    pub fn profile_image(&self) -> Option<ProfileImage> {
        self.avatar.read().ok().and_then(|a| a.clone())
    }

    /// 拉取当前用户资料并写入资料缓存
    pub async fn fetch_profile(&self, token: &str) -> ApiResult<Profile> {
        let api = self.api.clone();
        let owned_token = token.to_string();
        let profile = self
            .profile_flight
            .run(token, async move { api.fetch_profile(&owned_token).await })
            .await?;

        self.storage.set_profile(Some(profile.clone()));
        info!("[Profile] ✅ 资料已更新: {}", profile.login_name);
        Ok(profile)
    }

    /// 优先返回未过期的缓存资料，否则重新拉取
    pub async fn profile_or_fetch(&self, token: &str) -> ApiResult<Profile> {
        if !self.storage.is_expired() {
            if let Some(profile) = self.storage.profile() {
                return Ok(profile);
            }
        }
        self.fetch_profile(token).await
    }

    /// 拉取用户头像地址
    pub async fn fetch_profile_image_url(
        &self,
        token: &str,
        username: &str,
    ) -> ApiResult<ProfileImage> {
        let api = self.api.clone();
        let owned_token = token.to_string();
        let username = username.to_string();
        let image = self
            .image_flight
            .run(token, async move {
                api.fetch_profile_image(&owned_token, &username).await
            })
            .await?;

        if let Ok(mut avatar) = self.avatar.write() {
            *avatar = Some(image.clone());
        }
        Ok(image)
    }

    /// 清除资料缓存和头像
    pub fn clear(&self) {
        self.storage.clear();
        if let Ok(mut avatar) = self.avatar.write() {
            *avatar = None;
        }
    }
}
