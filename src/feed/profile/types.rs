//! 用户资料 API 响应结构体

use crate::feed::profile::models::{Profile, ProfileImage};
use serde::Deserialize;

/// `GET /me` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResult {
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl From<ProfileResult> for Profile {
    fn from(result: ProfileResult) -> Self {
        let name = format!(
            "{} {}",
            result.first_name.unwrap_or_default(),
            result.last_name.unwrap_or_default()
        )
        .trim()
        .to_string();

        Profile {
            login_name: format!("@{}", result.username),
            username: result.username,
            name,
            bio: result.bio,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileImageUrls {
    pub small: String,
    pub medium: String,
    pub large: String,
}

/// `GET /users/{username}` 响应（只取头像部分）
#[derive(Debug, Clone, Deserialize)]
pub struct UserResult {
    pub profile_image: ProfileImageUrls,
}

impl From<UserResult> for ProfileImage {
    fn from(result: UserResult) -> Self {
        ProfileImage {
            small: result.profile_image.small,
            medium: result.profile_image.medium,
            large: result.profile_image.large,
        }
    }
}
