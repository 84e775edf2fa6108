use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::{serde_helpers::null_as_default, validation::not_blank};

/// 浏览器推送订阅
///
/// `endpoint` 是唯一标识；缺失或为 `null` 的字段反序列化为空字符串，
/// 由 `validate()` 统一拒绝，这样缺字段、`null` 和空字段都返回 400。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PushSubscription {
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom = "not_blank")]
    pub endpoint: String,

    #[serde(default, deserialize_with = "null_as_default")]
    #[validate]
    pub keys: SubscriptionKeys,
}

/// 加密推送消息所需的订阅密钥（base64url）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SubscriptionKeys {
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom = "not_blank")]
    pub p256dh: String,

    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom = "not_blank")]
    pub auth: String,
}

impl PushSubscription {
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }
}

/// 退订请求，`endpoint` 可省略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// 推送内容，每次广播临时构造，不落库
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NotificationPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(length(min = 1, max = 200, message = "标题长度必须在1-200字符之间"))]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(length(max = 1000, message = "正文不能超过1000字符"))]
    pub body: String,

    #[serde(default = "default_url")]
    pub url: String,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            url: url.into(),
        }
    }
}

fn default_url() -> String {
    "/".to_string()
}
