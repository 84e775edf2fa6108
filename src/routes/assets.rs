use axum::{
    http::{header, HeaderName, HeaderValue},
    response::IntoResponse,
};

/// 浏览器端 Service Worker 脚本
pub const SERVICE_WORKER_JS: &str = include_str!("../../static/sw.js");

/// `GET /sw.js`：从站点根目录提供，作用域为 `/`
pub async fn service_worker() -> impl IntoResponse {
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/javascript; charset=utf-8"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (HeaderName::from_static("service-worker-allowed"), HeaderValue::from_static("/")),
        ],
        SERVICE_WORKER_JS,
    )
}
