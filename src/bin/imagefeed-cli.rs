//! 照片信息流 CLI 客户端
//!
//! 非交互式 CLI，用于登录、浏览信息流、点赞和查看个人资料

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use imagefeed_sdk_core::feed::photo::{FeedListener, Photo};
use imagefeed_sdk_core::{ClientConfig, FeedClient, OAuth2Service};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// 照片信息流 CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "imagefeed-cli")]
#[command(about = "照片信息流 CLI 客户端 - 登录、浏览信息流、点赞", long_about = None)]
struct Args {
    /// OAuth access key
    #[arg(long, env = "IMAGEFEED_ACCESS_KEY", default_value = "")]
    access_key: String,

    /// OAuth secret key
    #[arg(long, env = "IMAGEFEED_SECRET_KEY", default_value = "")]
    secret_key: String,

    /// REST API 基础地址
    #[arg(long, default_value = "https://api.unsplash.com")]
    api_base_url: String,

    /// OAuth 授权服务器地址
    #[arg(long, default_value = "https://unsplash.com")]
    auth_base_url: String,

    /// 照片缓存数据库
    #[arg(long, default_value = "sqlite://imagefeed.db?mode=rwc")]
    db_url: String,

    /// 令牌文件
    #[arg(long, default_value = "imagefeed_token.json")]
    token_path: PathBuf,

    /// 每页条数
    #[arg(long, default_value = "20")]
    page_size: u32,

    /// 日志级别（默认: info,imagefeed_sdk_core=debug）
    #[arg(long, default_value = "info,imagefeed_sdk_core=debug")]
    log_level: String,

    /// 日志文件
    #[arg(long, default_value = "debug.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 打印授权页地址
    AuthUrl,
    /// 用授权码（或授权回调地址）登录
    Login {
        #[arg(long)]
        code: String,
    },
    /// 加载信息流
    Feed {
        /// 加载页数
        #[arg(long, default_value = "1")]
        pages: u32,
    },
    /// 点赞照片
    Like { id: String },
    /// 取消点赞
    Unlike { id: String },
    /// 查看当前用户资料
    Profile,
    /// 退出登录并清空缓存
    Logout,
    /// 清空照片缓存
    ClearCache,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.access_key.clone(), self.secret_key.clone());
        config.api_base_url = self.api_base_url.clone();
        config.auth_base_url = self.auth_base_url.clone();
        config.db_url = self.db_url.clone();
        config.token_path = self.token_path.clone();
        config.page_size = self.page_size;
        config
    }
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str, log_path: &Path) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // 创建日志文件（追加模式）
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("无法创建日志文件 {}", log_path.display()))?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("[CLI] 📝 日志已同时输出到控制台和文件: {}", log_path.display());
    Ok(())
}

/// 打印收到的信息流事件
struct CliFeedListener;

#[async_trait::async_trait]
impl FeedListener for CliFeedListener {
    async fn on_photos_changed(&self, new_photos: Vec<Photo>) {
        info!("[CLI/Feed] 🖼️ 收到 {} 张照片", new_photos.len());
        for photo in &new_photos {
            println!(
                "{}\t{}x{}\t{}\t{}",
                photo.id,
                photo.width,
                photo.height,
                if photo.is_liked { "♥" } else { " " },
                photo.urls.small
            );
        }
    }

    async fn on_load_failed(&self, reason: String) {
        error!("[CLI/Feed] ❌ 加载失败: {}", reason);
    }

    async fn on_like_status_changed(&self, photo: Photo) {
        info!("[CLI/Feed] ♥ 照片 {} 点赞状态: {}", photo.id, photo.is_liked);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(&args.log_level, &args.log_file)?;

    info!("[CLI] 🚀 照片信息流 CLI 客户端");

    let client = FeedClient::new(args.client_config()).await?;
    client.add_feed_listener(Arc::new(CliFeedListener));

    match args.command {
        Command::AuthUrl => {
            println!("{}", client.oauth().authorization_url()?);
        }
        Command::Login { code } => {
            // 也接受完整的授权回调地址
            let code = OAuth2Service::code_from_redirect(&code).unwrap_or(code);
            client.login_with_code(&code).await?;
            info!("[CLI] ✅ 登录成功，令牌已保存");
        }
        Command::Feed { pages } => {
            let syncer = client.syncer();
            for _ in 0..pages {
                if let Some(handle) = syncer.fetch_photos_next_page() {
                    handle.await.context("加载任务异常退出")?;
                }
            }
            info!(
                "[CLI] 已加载到第 {} 页，缓存共 {} 张照片",
                syncer.last_loaded_page(),
                syncer.photo_dao().get_cached_photos_count().await
            );
        }
        Command::Like { id } => {
            client.syncer().change_like_status(&id, true).await?;
        }
        Command::Unlike { id } => {
            client.syncer().change_like_status(&id, false).await?;
        }
        Command::Profile => {
            let profile = client.profile().await?;
            println!("{} ({})", profile.name, profile.login_name);
            if let Some(bio) = &profile.bio {
                println!("{}", bio);
            }
            let token = client.token_storage().token().unwrap_or_default();
            match client
                .profile_service()
                .fetch_profile_image_url(&token, &profile.username)
                .await
            {
                Ok(image) => println!("{}", image.large),
                Err(e) => error!("[CLI] 获取头像失败: {}", e),
            }
        }
        Command::Logout => {
            client.logout().await;
            info!("[CLI] 👋 已退出登录");
        }
        Command::ClearCache => {
            client.syncer().clear_cache().await;
            info!("[CLI] 🧹 照片缓存已清空");
        }
    }

    Ok(())
}
