pub mod feed;

// 重新导出常用类型和函数，方便外部使用
pub use feed::{
    auth::{AuthConfiguration, OAuth2Service},
    client::{ClientConfig, FeedClient},
    db::create_sqlite_pool_with_migration,
    error::{ApiError, ApiResult},
    photo::{
        EmptyFeedListener, FeedListener, FeedSyncer, FeedSyncerConfig, Photo, PhotoApi,
        PhotoDao, PhotoFeedApi,
    },
    profile::{Profile, ProfileImage, ProfileService, ProfileStorage},
    token::{FileTokenStorage, MemoryTokenStorage, TokenStorage},
};
