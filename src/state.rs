use std::sync::Arc;

use crate::{
    config::Config,
    services::{PushDispatcher, PushSender, SubscriptionStore, VapidContext},
};

/// 应用程序的共享状态
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 推送订阅存储
    pub subscriptions: Arc<dyn SubscriptionStore>,

    /// VAPID 签名上下文
    pub vapid: Arc<VapidContext>,

    /// 广播分发器
    pub dispatcher: PushDispatcher,
}

impl AppState {
    pub fn new(
        config: Config,
        subscriptions: Arc<dyn SubscriptionStore>,
        sender: Arc<dyn PushSender>,
        vapid: Arc<VapidContext>,
    ) -> Self {
        let dispatcher = PushDispatcher::new(subscriptions.clone(), sender, vapid.clone());

        Self {
            config,
            subscriptions,
            vapid,
            dispatcher,
        }
    }
}
