//! 照片本地模型定义

use chrono::{DateTime, Utc};
use std::hash::{Hash, Hasher};

/// 照片的三种分辨率地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUrls {
    /// 缩略图
    pub small: String,
    /// 常规尺寸
    pub regular: String,
    /// 原图
    pub full: String,
}

/// 信息流中的一张照片
///
/// 身份只由 `id` 决定：两张照片 `id` 相同即视为相等，与其余字段无关。
#[derive(Debug, Clone)]
pub struct Photo {
    pub id: String,
    /// 服务端创建时间（可能缺失）
    pub created_at: Option<DateTime<Utc>>,
    pub width: u32,
    pub height: u32,
    /// 主色调提示，例如 "#60544D"
    pub color: String,
    pub is_liked: bool,
    pub description: String,
    pub urls: PhotoUrls,
}

impl Photo {
    /// 宽高比，用于列表布局
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 1.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }
}

impl PartialEq for Photo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Photo {}

impl Hash for Photo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// 本地缓存记录（对应 `local_photos` 表的一行）
///
/// `position` 每次整体平移都会变化，只能作为查询参数使用，不能当作稳定标识。
#[derive(Debug, Clone)]
pub struct LocalPhoto {
    pub photo: Photo,
    /// 在信息流中的排名，0 为最新
    pub position: i64,
    /// 最后写入时间
    pub last_updated: DateTime<Utc>,
}

/// 信息流同步器配置
#[derive(Debug, Clone)]
pub struct FeedSyncerConfig {
    /// 每页条数
    pub page_size: u32,
}

impl Default for FeedSyncerConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}
