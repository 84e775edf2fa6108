use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use super::ClientError;

/// 推送内容缺失或无法解析时的默认标题
pub const DEFAULT_TITLE: &str = "League Hub";
pub const DEFAULT_BODY: &str = "You have a new league update.";
pub const DEFAULT_URL: &str = "/";
pub const NOTIFICATION_ICON: &str = "/icons/icon-192.png";
pub const NOTIFICATION_TAG: &str = "league-push";

/// 通知附带的数据，点击时读取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub tag: String,
    pub data: NotificationData,
}

/// 已展示的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownNotification {
    pub title: String,
    pub options: NotificationOptions,
}

impl ShownNotification {
    pub fn target(&self) -> &str {
        &self.options.data.url
    }
}

/// 解析后的推送内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub url: String,
}

impl PushMessage {
    /// 解析推送事件数据；不是 JSON 对象时按空对象处理，缺失、空或非字符串字段取默认值
    pub fn from_event_data(data: Option<&[u8]>) -> Self {
        let fields = data
            .and_then(|bytes| serde_json::from_slice::<Value>(bytes).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();

        Self {
            title: text_field(&fields, "title", DEFAULT_TITLE),
            body: text_field(&fields, "body", DEFAULT_BODY),
            url: text_field(&fields, "url", DEFAULT_URL),
        }
    }

    fn into_notification(self) -> ShownNotification {
        ShownNotification {
            title: self.title,
            options: NotificationOptions {
                body: self.body,
                icon: NOTIFICATION_ICON.to_string(),
                tag: NOTIFICATION_TAG.to_string(),
                data: NotificationData { url: self.url },
            },
        }
    }
}

fn text_field(fields: &Map<String, Value>, key: &str, default: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// 浏览器窗口客户端
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
}

/// 点击通知后的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Focused(String),
    Opened(String),
}

/// Service Worker 全局作用域里用到的浏览器能力
#[async_trait]
pub trait WorkerScope: Send + Sync {
    /// Worker 自身的 origin，用于解析相对路径
    fn origin(&self) -> &Url;

    async fn show_notification(&self, notification: &ShownNotification) -> Result<(), ClientError>;

    async fn close_notification(&self, notification: &ShownNotification);

    /// `clients.matchAll({ type: "window", includeUncontrolled })`
    async fn match_all_windows(&self, include_uncontrolled: bool) -> Vec<WindowClient>;

    async fn focus(&self, client_id: &str) -> Result<(), ClientError>;

    async fn open_window(&self, url: &str) -> Result<(), ClientError>;
}

/// 推送事件处理器
///
/// 只有两个入口，除了事件本身携带的数据外不与页面共享任何状态。
pub struct PushEventHandler<S> {
    scope: S,
}

impl<S: WorkerScope> PushEventHandler<S> {
    pub fn new(scope: S) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &S {
        &self.scope
    }

    /// `push` 事件：通知展示完成后才返回（相当于 `event.waitUntil`）
    pub async fn on_push(&self, data: Option<&[u8]>) -> Result<ShownNotification, ClientError> {
        let notification = PushMessage::from_event_data(data).into_notification();
        self.scope.show_notification(&notification).await?;

        debug!("Shown push notification \"{}\"", notification.title);
        Ok(notification)
    }

    /// `notificationclick` 事件：聚焦已打开的匹配窗口，否则新开窗口
    pub async fn on_notification_click(
        &self,
        notification: &ShownNotification,
    ) -> Result<ClickOutcome, ClientError> {
        self.scope.close_notification(notification).await;

        let target = self
            .scope
            .origin()
            .join(notification.target())
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        let target_path = target.path();

        let windows = self.scope.match_all_windows(true).await;
        let existing = windows.iter().find(|window| window_path(&window.url).contains(target_path));

        match existing {
            Some(window) => {
                self.scope.focus(&window.id).await?;
                Ok(ClickOutcome::Focused(window.id.clone()))
            }
            None => {
                self.scope.open_window(target.as_str()).await?;
                Ok(ClickOutcome::Opened(target.to_string()))
            }
        }
    }
}

fn window_path(url: &str) -> String {
    Url::parse(url)
        .map(|parsed| parsed.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Show(String),
        Close,
        MatchAll(bool),
        Focus(String),
        Open(String),
    }

    struct FakeScope {
        origin: Url,
        windows: Vec<WindowClient>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeScope {
        fn new(windows: Vec<WindowClient>) -> Self {
            Self {
                origin: Url::parse("https://league.example.com/").unwrap(),
                windows,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl WorkerScope for FakeScope {
        fn origin(&self) -> &Url {
            &self.origin
        }

        async fn show_notification(&self, notification: &ShownNotification) -> Result<(), ClientError> {
            self.calls.lock().push(Call::Show(notification.title.clone()));
            Ok(())
        }

        async fn close_notification(&self, _notification: &ShownNotification) {
            self.calls.lock().push(Call::Close);
        }

        async fn match_all_windows(&self, include_uncontrolled: bool) -> Vec<WindowClient> {
            self.calls.lock().push(Call::MatchAll(include_uncontrolled));
            self.windows.clone()
        }

        async fn focus(&self, client_id: &str) -> Result<(), ClientError> {
            self.calls.lock().push(Call::Focus(client_id.to_string()));
            Ok(())
        }

        async fn open_window(&self, url: &str) -> Result<(), ClientError> {
            self.calls.lock().push(Call::Open(url.to_string()));
            Ok(())
        }
    }

    fn window(id: &str, url: &str) -> WindowClient {
        WindowClient { id: id.to_string(), url: url.to_string() }
    }

    #[tokio::test]
    async fn test_push_shows_payload_fields() {
        let handler = PushEventHandler::new(FakeScope::new(vec![]));

        let shown = handler
            .on_push(Some(br#"{"title":"Game Reported","body":"Week 3 vs Foxes","url":"/m/report"}"#))
            .await
            .unwrap();

        assert_eq!(shown.title, "Game Reported");
        assert_eq!(shown.options.body, "Week 3 vs Foxes");
        assert_eq!(shown.target(), "/m/report");
        assert_eq!(handler.scope().calls(), vec![Call::Show("Game Reported".to_string())]);
    }

    #[tokio::test]
    async fn test_unparsable_payload_uses_fallback_text() {
        let handler = PushEventHandler::new(FakeScope::new(vec![]));

        let shown = handler.on_push(Some(&[0xff, 0x00, 0x13])).await.unwrap();

        assert_eq!(shown.title, DEFAULT_TITLE);
        assert_eq!(shown.options.body, DEFAULT_BODY);
        assert_eq!(shown.target(), "/");
        assert_eq!(handler.scope().calls(), vec![Call::Show(DEFAULT_TITLE.to_string())]);
    }

    #[test]
    fn test_partial_and_non_object_payloads() {
        let message = PushMessage::from_event_data(Some(br#"{"title":"Trade Accepted","url":""}"#));
        assert_eq!(message.title, "Trade Accepted");
        assert_eq!(message.body, DEFAULT_BODY);
        assert_eq!(message.url, DEFAULT_URL);

        let message = PushMessage::from_event_data(Some(b"[1,2,3]"));
        assert_eq!(message.title, DEFAULT_TITLE);

        let message = PushMessage::from_event_data(None);
        assert_eq!(message.url, DEFAULT_URL);
    }

    #[tokio::test]
    async fn test_click_focuses_window_whose_path_contains_target() {
        let scope = FakeScope::new(vec![
            window("standings", "https://league.example.com/standings"),
            window("report", "https://league.example.com/m/report?week=3"),
        ]);
        let handler = PushEventHandler::new(scope);
        let shown = handler.on_push(Some(br#"{"url":"/m/report"}"#)).await.unwrap();

        let outcome = handler.on_notification_click(&shown).await.unwrap();

        assert_eq!(outcome, ClickOutcome::Focused("report".to_string()));
        let calls = handler.scope().calls();
        assert_eq!(calls[1], Call::Close);
        assert_eq!(calls[2], Call::MatchAll(true));
        assert_eq!(calls[3], Call::Focus("report".to_string()));
        assert!(!calls.iter().any(|call| matches!(call, Call::Open(_))));
    }

    #[tokio::test]
    async fn test_click_opens_new_window_when_no_match() {
        let scope = FakeScope::new(vec![window("standings", "https://league.example.com/standings")]);
        let handler = PushEventHandler::new(scope);
        let shown = handler.on_push(Some(br#"{"url":"/m/report"}"#)).await.unwrap();

        let outcome = handler.on_notification_click(&shown).await.unwrap();

        assert_eq!(outcome, ClickOutcome::Opened("https://league.example.com/m/report".to_string()));
        assert_eq!(
            handler.scope().calls().last(),
            Some(&Call::Open("https://league.example.com/m/report".to_string()))
        );
    }

    #[tokio::test]
    async fn test_absolute_target_matches_on_path_only() {
        let scope = FakeScope::new(vec![window("desk", "https://league.example.com/d/schedule")]);
        let handler = PushEventHandler::new(scope);
        let shown = handler
            .on_push(Some(br#"{"url":"https://league.example.com/schedule"}"#))
            .await
            .unwrap();

        let outcome = handler.on_notification_click(&shown).await.unwrap();

        assert_eq!(outcome, ClickOutcome::Focused("desk".to_string()));
    }
}
