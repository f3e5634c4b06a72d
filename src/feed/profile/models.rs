//! 用户资料本地模型

use chrono::{DateTime, Utc};
use std::sync::RwLock;
use std::time::Duration;

/// 资料缓存有效期
pub const PROFILE_TTL: Duration = Duration::from_secs(15 * 60);

/// 当前登录用户的资料
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    /// "名 姓"，两端空白已去除
    pub name: String,
    /// "@username"
    pub login_name: String,
    pub bio: Option<String>,
}

/// 头像的三种尺寸地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileImage {
    pub small: String,
    pub medium: String,
    pub large: String,
}

struct StoredProfile {
    profile: Profile,
    saved_at: DateTime<Utc>,
}

/// 内存中的资料缓存，带 15 分钟过期
#[derive(Default)]
pub struct ProfileStorage {
    inner: RwLock<Option<StoredProfile>>,
}

impl ProfileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|stored| stored.profile.clone()))
    }

    /// 写入资料并刷新时间戳；`None` 表示清除
    pub fn set_profile(&self, profile: Option<Profile>) {
        self.set_profile_at(profile, Utc::now());
    }

    pub(crate) fn set_profile_at(&self, profile: Option<Profile>, now: DateTime<Utc>) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = profile.map(|profile| StoredProfile {
                profile,
                saved_at: now,
            });
        }
    }

    pub fn clear(&self) {
        self.set_profile(None);
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// 没有资料或已超过有效期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.inner.read() {
            Ok(inner) => match inner.as_ref() {
                Some(stored) => (now - stored.saved_at)
                    .to_std()
                    .map(|age| age > PROFILE_TTL)
                    .unwrap_or(false),
                None => true,
            },
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn profile() -> Profile {
        Profile {
            username: "jdoe".to_string(),
            name: "John Doe".to_string(),
            login_name: "@jdoe".to_string(),
            bio: None,
        }
    }

    #[test]
    fn storage_expires_after_fifteen_minutes() {
        let storage = ProfileStorage::new();
        assert!(storage.is_expired());

        let saved_at = Utc::now();
        storage.set_profile_at(Some(profile()), saved_at);
        assert_eq!(storage.profile(), Some(profile()));
        assert!(!storage.is_expired_at(saved_at + Duration::minutes(14)));
        assert!(storage.is_expired_at(saved_at + Duration::minutes(16)));

        storage.clear();
        assert!(storage.profile().is_none());
        assert!(storage.is_expired());
    }
}
