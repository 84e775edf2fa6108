pub mod database;
pub mod dispatcher;
pub mod push_sender;
pub mod subscription_store;
pub mod vapid;

// 重新导出常用类型
pub use database::Database;
pub use dispatcher::PushDispatcher;
pub use push_sender::{DeliveryError, PushSender, WebPushSender};
pub use subscription_store::{MemorySubscriptionStore, PgSubscriptionStore, SubscriptionStore};
pub use vapid::VapidContext;
