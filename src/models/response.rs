use serde::{Deserialize, Serialize};

/// 订阅/退订接口的标准响应 `{ "ok": true }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// VAPID 公钥响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VapidKeyResponse {
    pub key: String,
}

/// 广播结果：尝试发送的订阅数量（不是送达数量）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub attempted: usize,
}
