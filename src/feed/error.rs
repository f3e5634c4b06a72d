//! 远程接口错误类型
//!
//! 网络层统一返回 [`ApiError`]，同步服务把所有变体都视为“加载失败”。

use thiserror::Error;

/// 远程 API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 传输层错误（连接失败、超时等）
    #[error("网络请求失败: {0}")]
    Transport(#[from] reqwest::Error),

    /// 非 2xx 的 HTTP 状态码，保留原始状态码
    #[error("HTTP 错误 {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// 响应体无法解析
    #[error("反序列化响应失败: {0}")]
    Decode(String),

    /// 本地没有可用的访问令牌
    #[error("缺少访问令牌，请先登录")]
    MissingToken,

    /// 相同 key 的请求仍在进行中
    #[error("相同请求正在进行中: {0}")]
    DuplicateRequest(String),

    /// 请求被新的请求取代或被主动取消
    #[error("请求已被取消")]
    Cancelled,

    /// 无法构造请求地址
    #[error("无效的请求地址: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP 状态码（仅 `HttpStatus` 变体有值）
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 远程 API 结果类型
pub type ApiResult<T> = std::result::Result<T, ApiError>;
