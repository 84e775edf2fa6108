use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    models::push::{NotificationPayload, PushSubscription},
    services::{
        push_sender::PushSender,
        subscription_store::SubscriptionStore,
        vapid::{SigningIdentity, VapidContext},
    },
    utils::endpoint::redact_endpoint,
};

/// 累计投递计数，被吞掉的失败在这里留痕
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: AtomicU64,
    pruned: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryStatsSnapshot {
    pub delivered: u64,
    pub pruned: u64,
    pub failed: u64,
}

impl DeliveryStats {
    fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Delivered => &self.delivered,
            Outcome::Pruned => &self.pruned,
            Outcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::increment_counter!("push_deliveries_total", "outcome" => outcome.as_str());
    }

    pub fn snapshot(&self) -> DeliveryStatsSnapshot {
        DeliveryStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Delivered,
    Pruned,
    Failed,
}

#[cfg(feature = "metrics")]
impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Delivered => "delivered",
            Outcome::Pruned => "pruned",
            Outcome::Failed => "failed",
        }
    }
}

/// 广播分发器
///
/// 每次广播把同一条内容并发发给所有订阅，等全部结束再返回。单个失败互不影响：
/// endpoint 失效（404/410）的订阅被删除，其余失败只记录日志和计数，不重试。
#[derive(Clone)]
pub struct PushDispatcher {
    store: Arc<dyn SubscriptionStore>,
    sender: Arc<dyn PushSender>,
    vapid: Arc<VapidContext>,
    stats: Arc<DeliveryStats>,
}

impl PushDispatcher {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        sender: Arc<dyn PushSender>,
        vapid: Arc<VapidContext>,
    ) -> Self {
        Self {
            store,
            sender,
            vapid,
            stats: Arc::new(DeliveryStats::default()),
        }
    }

    /// 返回尝试发送的订阅数，不代表送达数
    pub async fn broadcast(&self, payload: &NotificationPayload) -> Result<usize> {
        let identity = self.vapid.ensure_ready()?;
        let subscriptions = self.store.list_all().await?;

        if subscriptions.is_empty() {
            debug!("No push subscriptions, skipping broadcast");
            return Ok(0);
        }

        let body = serde_json::to_vec(payload)?;
        let attempted = subscriptions.len();
        debug!("Broadcasting \"{}\" to {} subscriptions", payload.title, attempted);

        let outcomes = join_all(
            subscriptions
                .iter()
                .map(|subscription| self.deliver(identity, subscription, &body)),
        )
        .await;

        let count = |wanted: Outcome| outcomes.iter().filter(|o| **o == wanted).count();
        info!(
            "Broadcast \"{}\" settled: attempted={} delivered={} pruned={} failed={}",
            payload.title,
            attempted,
            count(Outcome::Delivered),
            count(Outcome::Pruned),
            count(Outcome::Failed),
        );

        Ok(attempted)
    }

    async fn deliver(
        &self,
        identity: &SigningIdentity,
        subscription: &PushSubscription,
        body: &[u8],
    ) -> Outcome {
        let outcome = match self.sender.send(identity, subscription, body).await {
            Ok(()) => Outcome::Delivered,
            Err(e) if e.is_gone() => {
                info!("Pruning expired push subscription {}: {}", redact_endpoint(&subscription.endpoint), e);
                match self.store.remove(&subscription.endpoint).await {
                    Ok(()) => Outcome::Pruned,
                    Err(remove_err) => {
                        warn!(
                            "Failed to remove expired subscription {}: {}",
                            redact_endpoint(&subscription.endpoint),
                            remove_err
                        );
                        Outcome::Failed
                    }
                }
            }
            Err(e) => {
                warn!("Push to {} failed: {}", redact_endpoint(&subscription.endpoint), e);
                Outcome::Failed
            }
        };

        self.stats.record(outcome);
        outcome
    }

    pub fn stats(&self) -> DeliveryStatsSnapshot {
        self.stats.snapshot()
    }
}
