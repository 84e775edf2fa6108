use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use web_push::{ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessageBuilder};

use crate::{
    models::push::PushSubscription,
    services::vapid::SigningIdentity,
    utils::endpoint::redact_endpoint,
};

/// 单个订阅的投递失败
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// 推送服务报告 endpoint 永久失效（404 / 410）
    #[error("Subscription is gone (HTTP {0})")]
    Gone(u16),

    #[error("Rate limited by push service")]
    RateLimited,

    #[error("Push service rejected the message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to build push message: {0}")]
    Message(String),

    #[error("Push request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DeliveryError {
    /// 是否应当删除该订阅
    pub fn is_gone(&self) -> bool {
        matches!(self, DeliveryError::Gone(_))
    }

    /// 按推送服务返回的状态码分类
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            404 | 410 => DeliveryError::Gone(status),
            429 => DeliveryError::RateLimited,
            _ => DeliveryError::Rejected { status, body },
        }
    }
}

impl From<web_push::WebPushError> for DeliveryError {
    fn from(err: web_push::WebPushError) -> Self {
        DeliveryError::Message(err.to_string())
    }
}

/// 向单个订阅投递一条加密消息
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        identity: &SigningIdentity,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<(), DeliveryError>;
}

/// 基于 `web-push` 加密签名、reqwest 发送的实现
///
/// `web-push` 只负责 RFC 8291 加密和 VAPID JWT，HTTP 请求自己发，
/// 这样状态码可以直接分类，连接池也能在一次广播内复用。
#[derive(Clone)]
pub struct WebPushSender {
    client: reqwest::Client,
    ttl: u32,
}

impl WebPushSender {
    pub fn new(ttl: u32) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, ttl })
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(
        &self,
        identity: &SigningIdentity,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<(), DeliveryError> {
        let sub_info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut sig_builder = VapidSignatureBuilder::from_base64(identity.private_key(), &sub_info)?;
        sig_builder.add_claim("sub", identity.subject());
        let signature = sig_builder.build()?;

        let mut builder = WebPushMessageBuilder::new(&sub_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(self.ttl);

        let message = builder.build()?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }

        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }

        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");

            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }

            request = request.body(push_payload.content);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();

        if (200..300).contains(&status) {
            debug!("Push delivered to {} (HTTP {})", redact_endpoint(&subscription.endpoint), status);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::from_status(status, body))
    }
}
