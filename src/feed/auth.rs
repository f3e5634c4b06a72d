//! OAuth2 授权码登录
//!
//! 构造授权页地址、从回调地址中提取授权码、用授权码换取访问令牌。

use crate::feed::error::{ApiError, ApiResult};
use crate::feed::flight::SupersedingFlight;
use crate::feed::token::TokenStorage;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 授权回调中携带授权码的路径
pub const NATIVE_REDIRECT_PATH: &str = "/oauth/authorize/native";

/// OAuth 应用配置
#[derive(Debug, Clone)]
pub struct AuthConfiguration {
    pub access_key: String,
    pub secret_key: String,
    pub redirect_uri: String,
    /// 以 `+` 分隔的权限列表
    pub access_scope: String,
    pub auth_base_url: String,
}

impl AuthConfiguration {
    /// 使用默认回调地址、权限和授权服务器创建配置
    pub fn new(access_key: String, secret_key: String) -> Self {
        Self {
            access_key,
            secret_key,
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            access_scope: "public+read_user+write_likes".to_string(),
            auth_base_url: "https://unsplash.com".to_string(),
        }
    }
}

/// 令牌接口响应
#[derive(Debug, Deserialize)]
pub struct OAuthTokenResponseBody {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// OAuth2 授权服务
pub struct OAuth2Service {
    client: reqwest::Client,
    config: AuthConfiguration,
    tokens: Arc<dyn TokenStorage>,
    flight: SupersedingFlight,
}

impl OAuth2Service {
    pub fn new(
        client: reqwest::Client,
        config: AuthConfiguration,
        tokens: Arc<dyn TokenStorage>,
    ) -> Self {
        Self {
            client,
            config,
            tokens,
            flight: SupersedingFlight::new("OAuth"),
        }
    }

    pub fn config(&self) -> &AuthConfiguration {
        &self.config
    }

    /// 授权页地址，用户在浏览器中打开并同意授权
    pub fn authorization_url(&self) -> ApiResult<String> {
        let base = format!(
            "{}/oauth/authorize",
            self.config.auth_base_url.trim_end_matches('/')
        );
        // 表单编码会把空格写成 `+`
        let scope = self.config.access_scope.replace('+', " ");
        let url = reqwest::Url::parse_with_params(
            &base,
            &[
                ("client_id", self.config.access_key.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
            ],
        )
        .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base, e)))?;
        Ok(url.to_string())
    }

    /// 从授权回调地址中提取授权码
    ///
    /// 只接受路径为 [`NATIVE_REDIRECT_PATH`] 的地址
    pub fn code_from_redirect(url: &str) -> Option<String> {
        let url = reqwest::Url::parse(url).ok()?;
        if url.path() != NATIVE_REDIRECT_PATH {
            return None;
        }
        url.query_pairs()
            .find(|(name, _)| name == "code")
            .map(|(_, value)| value.into_owned())
    }

    /// 用授权码换取访问令牌，成功后写入令牌存储
    ///
    /// 相同授权码的请求进行中时返回 `DuplicateRequest`；
    /// 新的授权码会取消进行中的旧请求。
    pub async fn fetch_oauth_token(&self, code: &str) -> ApiResult<String> {
        let url = format!(
            "{}/oauth/token",
            self.config.auth_base_url.trim_end_matches('/')
        );
        info!("[OAuth] 🔐 正在用授权码换取访问令牌...");
        debug!("[OAuth]   请求URL: {}", url);

        let request = self.client.post(&url).query(&[
            ("client_id", self.config.access_key.as_str()),
            ("client_secret", self.config.secret_key.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ]);
        let tokens = self.tokens.clone();

        self.flight
            .run(code, async move {
                let operation_id = Uuid::new_v4().to_string();
                debug!("[OAuth]   操作ID: {}", operation_id);

                let response = request.send().await.map_err(|e| {
                    error!("[OAuth] 令牌请求失败: {:?}", e);
                    ApiError::Transport(e)
                })?;
                let status = response.status();
                let body = response.text().await?;

                if !status.is_success() {
                    error!("[OAuth] 令牌请求失败，HTTP状态: {}, 响应: {}", status, body);
                    return Err(ApiError::HttpStatus {
                        status: status.as_u16(),
                        body,
                    });
                }

                let token_resp: OAuthTokenResponseBody =
                    serde_json::from_str(&body).map_err(|e| {
                        error!("[OAuth] 令牌响应反序列化失败: {:?}\n原始响应: {}", e, body);
                        ApiError::Decode(e.to_string())
                    })?;

                if let Err(e) = tokens.set_token(Some(token_resp.access_token.clone())) {
                    error!("[OAuth] 保存令牌失败: {:?}", e);
                }
                info!("[OAuth] ✅ 登录成功");
                Ok(token_resp.access_token)
            })
            .await
    }
}
