//! 信息流客户端
//!
//! 组合根：创建数据库连接池和 HTTP 客户端，把缓存、远程接口、令牌存储、
//! 同步服务、OAuth 和资料服务显式注入到一起。

use crate::feed::auth::{AuthConfiguration, OAuth2Service};
use crate::feed::db::create_sqlite_pool_with_migration;
use crate::feed::error::{ApiError, ApiResult};
use crate::feed::photo::{
    FeedListener, FeedSyncer, FeedSyncerConfig, ListenerId, PhotoApi, PhotoDao,
    DEFAULT_CACHE_TTL,
};
use crate::feed::profile::{Profile, ProfileApi, ProfileService, ProfileStorage};
use crate::feed::token::{FileTokenStorage, TokenStorage};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// OAuth 应用的 access key（client_id）
    pub access_key: String,
    /// OAuth 应用的 secret key
    pub secret_key: String,
    /// REST API 基础地址
    pub api_base_url: String,
    /// OAuth 授权服务器地址
    pub auth_base_url: String,
    pub redirect_uri: String,
    /// 以 `+` 分隔的权限列表
    pub access_scope: String,
    /// 照片缓存使用的本地 SQLite 数据库 URL
    ///
    /// 例如：`sqlite://imagefeed.db?mode=rwc`
    pub db_url: String,
    /// 每页条数
    pub page_size: u32,
    /// 缓存有效期
    pub cache_ttl: Duration,
    /// 令牌文件路径
    pub token_path: PathBuf,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(access_key: String, secret_key: String) -> Self {
        Self {
            access_key,
            secret_key,
            api_base_url: "https://api.unsplash.com".to_string(),
            auth_base_url: "https://unsplash.com".to_string(),
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            access_scope: "public+read_user+write_likes".to_string(),
            db_url: "sqlite://imagefeed.db?mode=rwc".to_string(),
            page_size: 20,
            cache_ttl: DEFAULT_CACHE_TTL,
            token_path: PathBuf::from("imagefeed_token.json"),
        }
    }

    pub fn auth_configuration(&self) -> AuthConfiguration {
        AuthConfiguration {
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            redirect_uri: self.redirect_uri.clone(),
            access_scope: self.access_scope.clone(),
            auth_base_url: self.auth_base_url.clone(),
        }
    }
}

/// 信息流客户端
#[derive(Clone)]
pub struct FeedClient {
    config: ClientConfig,
    tokens: Arc<dyn TokenStorage>,
    syncer: Arc<FeedSyncer>,
    oauth: Arc<OAuth2Service>,
    profile: Arc<ProfileService>,
}

impl FeedClient {
    /// 使用文件令牌存储创建客户端
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let tokens: Arc<dyn TokenStorage> =
            Arc::new(FileTokenStorage::new(config.token_path.clone()));
        Self::with_token_storage(config, tokens).await
    }

    /// 使用调用方提供的令牌存储创建客户端
    pub async fn with_token_storage(
        config: ClientConfig,
        tokens: Arc<dyn TokenStorage>,
    ) -> Result<Self> {
        info!("[Client] 初始化信息流客户端，API: {}", config.api_base_url);

        let pool = create_sqlite_pool_with_migration(&config.db_url)
            .await
            .context("初始化照片缓存失败")?;
        let http = reqwest::Client::builder()
            .build()
            .context("创建 HTTP 客户端失败")?;

        let photo_dao = PhotoDao::with_ttl(pool, config.cache_ttl);
        let photo_api = Arc::new(PhotoApi::new(http.clone(), config.api_base_url.clone()));
        let syncer = FeedSyncer::new(
            FeedSyncerConfig {
                page_size: config.page_size,
            },
            photo_api,
            photo_dao,
            tokens.clone(),
        );

        let oauth = Arc::new(OAuth2Service::new(
            http.clone(),
            config.auth_configuration(),
            tokens.clone(),
        ));
        let profile = Arc::new(ProfileService::new(
            ProfileApi::new(http, config.api_base_url.clone()),
            Arc::new(ProfileStorage::new()),
        ));

        info!("[Client] ✅ 客户端初始化完成");
        Ok(Self {
            config,
            tokens,
            syncer,
            oauth,
            profile,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn syncer(&self) -> &Arc<FeedSyncer> {
        &self.syncer
    }

    pub fn oauth(&self) -> &Arc<OAuth2Service> {
        &self.oauth
    }

    pub fn profile_service(&self) -> &Arc<ProfileService> {
        &self.profile
    }

    pub fn token_storage(&self) -> &Arc<dyn TokenStorage> {
        &self.tokens
    }

    /// 本地是否已有访问令牌
    pub fn is_authorized(&self) -> bool {
        self.tokens.token().is_some()
    }

    /// 注册信息流监听器
    pub fn add_feed_listener(&self, listener: Arc<dyn FeedListener>) -> ListenerId {
        self.syncer.add_listener(listener)
    }

    /// 用授权码登录
    pub async fn login_with_code(&self, code: &str) -> ApiResult<String> {
        self.oauth.fetch_oauth_token(code).await
    }

    /// 当前用户资料（缓存未过期时直接返回缓存）
    pub async fn profile(&self) -> ApiResult<Profile> {
        let token = self.tokens.token().ok_or(ApiError::MissingToken)?;
        self.profile.profile_or_fetch(&token).await
    }

    /// 退出登录：删除令牌、清除资料、重置信息流并清空照片缓存
    pub async fn logout(&self) {
        info!("[Client] 退出登录");
        if let Err(e) = self.tokens.clear() {
            error!("[Client] 删除令牌失败: {:?}", e);
        }
        self.profile.clear();
        self.syncer.clear_cache().await;
    }
}
