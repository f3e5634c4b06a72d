//! 访问令牌存储
//!
//! 同步服务和 OAuth 服务只依赖 [`TokenStorage`]，具体持久化方式由调用方注入。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, error, info};

/// Bearer token 存储接口
pub trait TokenStorage: Send + Sync {
    /// 当前令牌
    fn token(&self) -> Option<String>;

    /// 写入（`Some`）或删除（`None`）令牌
    fn set_token(&self, token: Option<String>) -> Result<()>;

    /// 删除令牌
    fn clear(&self) -> Result<()> {
        self.set_token(None)
    }
}

/// 进程内令牌存储
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: Option<String>) -> Result<()> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| anyhow::anyhow!("令牌存储锁已损坏"))?;
        *slot = token;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct TokenFile {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// JSON 文件令牌存储
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn token(&self) -> Option<String> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                error!("[Token] 读取令牌文件失败 {}: {:?}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<TokenFile>(&content) {
            Ok(file) => Some(file.access_token),
            Err(e) => {
                error!("[Token] 令牌文件格式无效 {}: {:?}", self.path.display(), e);
                None
            }
        }
    }

    fn set_token(&self, token: Option<String>) -> Result<()> {
        match token {
            Some(access_token) => {
                if let Some(parent) = self.path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)
                            .with_context(|| format!("创建目录失败: {}", parent.display()))?;
                    }
                }
                let json = serde_json::to_vec_pretty(&TokenFile { access_token })?;
                std::fs::write(&self.path, json)
                    .with_context(|| format!("写入令牌文件失败: {}", self.path.display()))?;
                info!("[Token] 🔑 令牌已保存到 {}", self.path.display());
            }
            None => match std::fs::remove_file(&self.path) {
                Ok(()) => info!("[Token] 令牌已删除"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("[Token] 令牌文件不存在，无需删除")
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("删除令牌文件失败: {}", self.path.display()))
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryTokenStorage::default();
        assert!(storage.token().is_none());
        storage.set_token(Some("abc".to_string())).unwrap();
        assert_eq!(storage.token().as_deref(), Some("abc"));
        storage.clear().unwrap();
        assert!(storage.token().is_none());
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");

        let storage = FileTokenStorage::new(&path);
        assert!(storage.token().is_none());
        storage.set_token(Some("secret".to_string())).unwrap();

        let reopened = FileTokenStorage::new(&path);
        assert_eq!(reopened.token().as_deref(), Some("secret"));

        reopened.clear().unwrap();
        assert!(storage.token().is_none());
        assert!(!path.exists());
        reopened.clear().unwrap();
    }

    #[test]
    fn corrupt_file_reads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(FileTokenStorage::new(&path).token().is_none());
    }
}
