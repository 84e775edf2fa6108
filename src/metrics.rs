use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// 安装 Prometheus recorder，返回暴露 `/metrics` 的路由
pub async fn setup_metrics() -> anyhow::Result<Router> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    Ok(Router::new().route("/metrics", get(move || render(handle.clone()))))
}

async fn render(handle: PrometheusHandle) -> String {
    handle.render()
}
