use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use validator::Validate;

use crate::{
    error::Result,
    models::push::PushSubscription,
    services::Database,
    utils::endpoint::redact_endpoint,
};

/// 推送订阅存储
///
/// 以 `endpoint` 为唯一键。同一 endpoint 上的并发写入由后端串行化，后写者生效。
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// 插入或按 endpoint 覆盖密钥；字段缺失时返回校验错误且不写入
    async fn upsert(&self, subscription: &PushSubscription) -> Result<()>;

    /// 删除 endpoint 对应的行，不存在时什么也不做
    async fn remove(&self, endpoint: &str) -> Result<()>;

    /// 全部订阅，按创建时间排序，不分页
    async fn list_all(&self) -> Result<Vec<PushSubscription>>;

    async fn count(&self) -> Result<usize>;
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    endpoint: String,
    p256dh: String,
    auth: String,
}

impl From<SubscriptionRow> for PushSubscription {
    fn from(row: SubscriptionRow) -> Self {
        PushSubscription::new(row.endpoint, row.p256dh, row.auth)
    }
}

/// PostgreSQL 存储
#[derive(Clone)]
pub struct PgSubscriptionStore {
    db: Database,
}

impl PgSubscriptionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn upsert(&self, subscription: &PushSubscription) -> Result<()> {
        subscription.validate()?;

        sqlx::query(
            r#"
            INSERT INTO push_subscriptions (endpoint, p256dh, auth)
            VALUES ($1, $2, $3)
            ON CONFLICT (endpoint) DO UPDATE SET
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth,
                updated_at = now()
            "#,
        )
        .bind(&subscription.endpoint)
        .bind(&subscription.keys.p256dh)
        .bind(&subscription.keys.auth)
        .execute(self.db.pool())
        .await?;

        debug!("Upserted push subscription {}", redact_endpoint(&subscription.endpoint));
        Ok(())
    }

    async fn remove(&self, endpoint: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1")
            .bind(endpoint)
            .execute(self.db.pool())
            .await?;

        debug!(
            "Removed push subscription {} ({} rows)",
            redact_endpoint(endpoint),
            result.rows_affected()
        );
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PushSubscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT endpoint, p256dh, auth
            FROM push_subscriptions
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(PushSubscription::from).collect())
    }

    async fn count(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM push_subscriptions")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count as usize)
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    subscription: PushSubscription,
    seq: u64,
}

/// 内存存储，开发环境和测试使用，进程退出即丢失
#[derive(Debug, Default)]
pub struct MemorySubscriptionStore {
    entries: DashMap<String, MemoryEntry>,
    next_seq: AtomicU64,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn upsert(&self, subscription: &PushSubscription) -> Result<()> {
        subscription.validate()?;

        // entry 持有分片写锁，同一 endpoint 的写入在这里串行化
        self.entries
            .entry(subscription.endpoint.clone())
            .and_modify(|entry| entry.subscription.keys = subscription.keys.clone())
            .or_insert_with(|| MemoryEntry {
                subscription: subscription.clone(),
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            });

        Ok(())
    }

    async fn remove(&self, endpoint: &str) -> Result<()> {
        self.entries.remove(endpoint);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PushSubscription>> {
        let mut entries: Vec<MemoryEntry> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.seq);

        Ok(entries.into_iter().map(|entry| entry.subscription).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}
