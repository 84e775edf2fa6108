//! 浏览器端推送逻辑
//!
//! 订阅流程和 Service Worker 事件处理都写成与平台无关的状态机，
//! 浏览器能力通过 trait 注入（wasm 绑定或测试替身）。`static/sw.js`
//! 是同一套契约的浏览器实现。

pub mod enrollment;
pub mod service_worker;

use thiserror::Error;

pub use enrollment::{EnrollmentApi, EnrollmentClient, EnrollmentState, HttpEnrollmentApi, PushPlatform};
pub use service_worker::{PushEventHandler, WorkerScope};

/// 浏览器端错误
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{}", .0.notice())]
    Unsupported(enrollment::UnsupportedReason),

    #[error("Notification permission was not granted")]
    PermissionDenied,

    #[error("Service worker registration failed: {0}")]
    Registration(String),

    #[error("Push subscription failed: {0}")]
    Subscription(String),

    #[error("Invalid VAPID public key: {0}")]
    InvalidKey(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Browser API error: {0}")]
    Platform(String),
}
