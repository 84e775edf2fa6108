use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use super::ClientError;
use crate::models::{
    push::{PushSubscription, UnsubscribeRequest},
    response::VapidKeyResponse,
};

pub const SERVICE_WORKER_URL: &str = "/sw.js";
pub const SERVICE_WORKER_SCOPE: &str = "/";

/// 浏览器当前具备的能力
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// `"serviceWorker" in navigator`
    pub service_worker: bool,
    /// `"PushManager" in window`
    pub push_manager: bool,
    /// iOS / iPadOS 上的浏览器
    pub ios: bool,
    /// 以主屏幕应用（standalone）方式运行
    pub standalone: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    NoServiceWorker,
    NoPushManager,
    RequiresHomeScreenInstall,
}

impl UnsupportedReason {
    /// 展示给用户的提示
    pub fn notice(&self) -> &'static str {
        match self {
            UnsupportedReason::NoServiceWorker | UnsupportedReason::NoPushManager => {
                "Push notifications are not supported in this browser."
            }
            UnsupportedReason::RequiresHomeScreenInstall => {
                "To get notifications on iPhone or iPad, add this site to your Home Screen and open it from there."
            }
        }
    }
}

/// 推送可用性策略
///
/// iOS 只允许已安装到主屏幕的 Web 应用接收推送，仅检查 Push API 是否存在
/// 会在 iOS Safari 上静默失败。
pub fn check_push_support(caps: &PlatformCapabilities) -> Result<(), UnsupportedReason> {
    if !caps.service_worker {
        return Err(UnsupportedReason::NoServiceWorker);
    }
    if !caps.push_manager {
        return Err(UnsupportedReason::NoPushManager);
    }
    if caps.ios && !caps.standalone {
        return Err(UnsupportedReason::RequiresHomeScreenInstall);
    }
    Ok(())
}

/// `pushSupported && (!ios || standalone)`
pub fn push_usable(caps: &PlatformCapabilities) -> bool {
    check_push_support(caps).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Default,
}

/// 浏览器推送相关 API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushPlatform: Send + Sync {
    fn capabilities(&self) -> PlatformCapabilities;

    /// 注册或复用 Service Worker，等待其激活
    async fn register_service_worker(&self, script_url: &str, scope: &str) -> Result<(), ClientError>;

    async fn request_permission(&self) -> Result<Permission, ClientError>;

    /// `pushManager.subscribe({ userVisibleOnly: true, applicationServerKey })`
    async fn subscribe(&self, application_server_key: &[u8]) -> Result<PushSubscription, ClientError>;

    /// 当前激活的注册上的订阅；没有注册或订阅时返回 `None`
    async fn current_subscription(&self) -> Result<Option<PushSubscription>, ClientError>;

    async fn unsubscribe(&self) -> Result<bool, ClientError>;
}

/// 服务端订阅接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentApi: Send + Sync {
    async fn vapid_public_key(&self) -> Result<String, ClientError>;

    async fn subscribe(&self, subscription: &PushSubscription) -> Result<(), ClientError>;

    async fn unsubscribe(&self, endpoint: &str) -> Result<(), ClientError>;
}

/// 基于 reqwest 的服务端接口实现
#[derive(Debug, Clone)]
pub struct HttpEnrollmentApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpEnrollmentApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl EnrollmentApi for HttpEnrollmentApi {
    async fn vapid_public_key(&self) -> Result<String, ClientError> {
        let response = self.client.get(self.url("/api/push/vapid-public-key")?).send().await?;
        let body: VapidKeyResponse = Self::read(response).await?;
        Ok(body.key)
    }

    async fn subscribe(&self, subscription: &PushSubscription) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/api/push/subscribe")?)
            .json(subscription)
            .send()
            .await?;
        let _: serde_json::Value = Self::read(response).await?;
        Ok(())
    }

    async fn unsubscribe(&self, endpoint: &str) -> Result<(), ClientError> {
        let request = UnsubscribeRequest {
            endpoint: Some(endpoint.to_string()),
        };
        let response = self
            .client
            .post(self.url("/api/push/unsubscribe")?)
            .json(&request)
            .send()
            .await?;
        let _: serde_json::Value = Self::read(response).await?;
        Ok(())
    }
}

/// base64url 文本转成 `applicationServerKey` 需要的原始字节
///
/// 兼容填充和标准字母表（`+` `/`）。
pub fn application_server_key(text: &str) -> Result<Vec<u8>, ClientError> {
    let normalized: String = text
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = BASE64URL
        .decode(normalized)
        .map_err(|e| ClientError::InvalidKey(e.to_string()))?;

    if bytes.len() != 65 || bytes[0] != 0x04 {
        return Err(ClientError::InvalidKey(format!(
            "expected a 65-byte uncompressed P-256 point, got {} bytes",
            bytes.len()
        )));
    }

    Ok(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentState {
    Unregistered,
    ServiceWorkerActive,
    Subscribed,
}

/// 浏览器端订阅流程
///
/// Unregistered → ServiceWorkerActive → Subscribed，`disable()` 回到 Unregistered。
/// 任何一步失败都直接返回，不自动重试；调用方可以重新执行整个流程。
pub struct EnrollmentClient<P, A> {
    platform: P,
    api: A,
    state: EnrollmentState,
}

impl<P: PushPlatform, A: EnrollmentApi> EnrollmentClient<P, A> {
    pub fn new(platform: P, api: A) -> Self {
        Self {
            platform,
            api,
            state: EnrollmentState::Unregistered,
        }
    }

    pub fn state(&self) -> EnrollmentState {
        self.state
    }

    /// 开启推送
    pub async fn enable(&mut self) -> Result<PushSubscription, ClientError> {
        check_push_support(&self.platform.capabilities()).map_err(ClientError::Unsupported)?;

        self.platform
            .register_service_worker(SERVICE_WORKER_URL, SERVICE_WORKER_SCOPE)
            .await?;
        self.state = EnrollmentState::ServiceWorkerActive;

        if self.platform.request_permission().await? != Permission::Granted {
            return Err(ClientError::PermissionDenied);
        }

        let key = application_server_key(&self.api.vapid_public_key().await?)?;
        let subscription = self.platform.subscribe(&key).await?;

        // 平台订阅成功之后才通知服务端
        self.api.subscribe(&subscription).await?;
        self.state = EnrollmentState::Subscribed;

        info!("Push notifications enabled");
        Ok(subscription)
    }

    /// 关闭推送；没有订阅时什么也不做
    pub async fn disable(&mut self) -> Result<(), ClientError> {
        let Some(subscription) = self.platform.current_subscription().await? else {
            debug!("No active push subscription to disable");
            return Ok(());
        };

        self.platform.unsubscribe().await?;
        self.api.unsubscribe(&subscription.endpoint).await?;
        self.state = EnrollmentState::Unregistered;

        info!("Push notifications disabled");
        Ok(())
    }

    pub async fn is_subscribed(&self) -> Result<bool, ClientError> {
        Ok(self.platform.current_subscription().await?.is_some())
    }
}
