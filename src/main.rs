use std::sync::Arc;
use axum::http::{HeaderValue, Method};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing::{info, warn};

use league_push::{
    config::Config,
    routes,
    services::{
        Database, MemorySubscriptionStore, PgSubscriptionStore, SubscriptionStore, VapidContext,
        WebPushSender,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化日志
    tracing_subscriber::registry()
        .with(config.log_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting league push service...");

    // VAPID 密钥缺失或不匹配时直接拒绝启动
    let vapid = Arc::new(VapidContext::from_config(&config));
    vapid.ensure_ready()?;

    // 订阅存储
    let subscriptions: Arc<dyn SubscriptionStore> = match config.database_url {
        Some(_) => {
            let db = Database::new(&config).await?;
            db.verify_connection().await?;
            db.migrate().await?;
            info!("Using PostgreSQL subscription store");
            Arc::new(PgSubscriptionStore::new(db))
        }
        None => {
            if config.is_production() {
                warn!("DATABASE_URL is not set in production: subscriptions will be lost on restart");
            } else {
                warn!("DATABASE_URL is not set, using in-memory subscription store");
            }
            Arc::new(MemorySubscriptionStore::new())
        }
    };

    let sender = Arc::new(WebPushSender::new(config.push_ttl_seconds)?);

    // 创建应用状态
    let app_state = Arc::new(AppState::new(config.clone(), subscriptions, sender, vapid));

    // 配置 CORS
    let origins = config
        .cors_allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(origins);

    let app = routes::router(app_state)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // 启动指标服务器（如果启用）
    #[cfg(feature = "metrics")]
    if config.metrics_enabled {
        let metrics_app = league_push::metrics::setup_metrics().await?;
        let metrics_addr: std::net::SocketAddr = format!("0.0.0.0:{}", config.metrics_port).parse()?;
        info!("Starting metrics server on {}", metrics_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::Server::bind(&metrics_addr)
                .serve(metrics_app.into_make_service())
                .await
            {
                tracing::error!("Metrics server stopped: {}", e);
            }
        });
    }

    // 启动主服务器
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
