use crate::config::Config;
use crate::error::{AppError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, error};

/// 数据库服务
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 创建新的数据库连接池
    pub async fn new(config: &Config) -> Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| AppError::configuration("DATABASE_URL is not set"))?;

        info!("Initializing database connection pool (max {} connections)", config.database_max_connections);

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(AppError::from(e))
            }
        }
    }

    /// 执行内嵌的迁移脚本
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
