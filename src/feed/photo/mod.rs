//! 照片信息流模块
//!
//! 实现信息流的分页同步、本地持久化缓存和点赞

pub mod api;
pub mod dao;
pub mod listener;
pub mod models;
pub mod service;
pub mod types;

// 重新导出主要类型和函数
pub use api::{PhotoApi, PhotoFeedApi};
pub use dao::{PhotoDao, DEFAULT_CACHE_TTL};
pub use listener::{EmptyFeedListener, FeedListener, FeedListeners, ListenerId};
pub use models::{FeedSyncerConfig, LocalPhoto, Photo, PhotoUrls};
pub use service::FeedSyncer;
pub use types::{LikePhotoResult, PhotoDecodeError, PhotoResult, PhotoUrlsResult};
