//! 联赛站点的 Web Push 服务
//!
//! 服务端保存浏览器推送订阅并用 VAPID 签名广播通知；`client` 模块是浏览器端
//! 订阅流程和 Service Worker 的实现。

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(feature = "metrics")]
pub mod metrics;
