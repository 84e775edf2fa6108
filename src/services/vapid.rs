use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use once_cell::sync::OnceCell;
use p256::ecdsa::SigningKey;
use tracing::info;

use crate::{
    config::Config,
    error::{AppError, Result},
};

/// 从配置中读取的原始 VAPID 设置，尚未校验
#[derive(Debug, Clone, Default)]
pub struct VapidSettings {
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub subject: Option<String>,
}

impl From<&Config> for VapidSettings {
    fn from(config: &Config) -> Self {
        Self {
            public_key: config.vapid_public_key.clone(),
            private_key: config.vapid_private_key.clone(),
            subject: config.vapid_subject.clone(),
        }
    }
}

/// 应用服务器签名身份
///
/// 私钥是原始 32 字节 P-256 标量，公钥是 65 字节未压缩点，都用 base64url（无填充）。
/// 这正是 `web-push` 的 `VapidSignatureBuilder::from_base64` 和浏览器
/// `applicationServerKey` 需要的格式。
#[derive(Clone)]
pub struct SigningIdentity {
    public_key: String,
    private_key: String,
    subject: String,
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("subject", &self.subject)
            .finish()
    }
}

impl SigningIdentity {
    fn from_settings(settings: &VapidSettings) -> Result<Self> {
        let public_key = settings
            .public_key
            .as_deref()
            .ok_or_else(|| AppError::configuration("VAPID_PUBLIC_KEY is not set"))?;
        let private_key = settings
            .private_key
            .as_deref()
            .ok_or_else(|| AppError::configuration("VAPID_PRIVATE_KEY is not set"))?;
        let subject = settings
            .subject
            .as_deref()
            .ok_or_else(|| AppError::configuration("VAPID_SUBJECT is not set"))?;

        // 兼容带填充的 base64url
        let public_key = public_key.trim_end_matches('=');
        let private_key = private_key.trim_end_matches('=');

        let private_bytes = BASE64URL
            .decode(private_key)
            .map_err(|e| AppError::configuration(format!("VAPID private key is not valid base64url: {}", e)))?;
        if private_bytes.len() != 32 {
            return Err(AppError::configuration(format!(
                "VAPID private key must be a 32-byte P-256 scalar, got {} bytes",
                private_bytes.len()
            )));
        }
        let signing_key = SigningKey::from_slice(&private_bytes)
            .map_err(|_| AppError::configuration("VAPID private key is not a valid P-256 scalar"))?;

        let public_bytes = BASE64URL
            .decode(public_key)
            .map_err(|e| AppError::configuration(format!("VAPID public key is not valid base64url: {}", e)))?;
        if public_bytes.len() != 65 || public_bytes[0] != 0x04 {
            return Err(AppError::configuration(
                "VAPID public key must be a 65-byte uncompressed P-256 point",
            ));
        }

        let derived = signing_key.verifying_key().to_encoded_point(false);
        if derived.as_bytes() != public_bytes.as_slice() {
            return Err(AppError::configuration(
                "VAPID public key does not match the private key",
            ));
        }

        if !(subject.starts_with("mailto:") || subject.starts_with("https:")) {
            return Err(AppError::configuration(
                "VAPID subject must be a mailto: or https: URI",
            ));
        }

        Ok(Self {
            public_key: public_key.to_string(),
            private_key: private_key.to_string(),
            subject: subject.to_string(),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// VAPID 签名上下文
///
/// 进程启动时构造一次，通过 `Arc` 传给分发器和路由。第一次 `ensure_ready()`
/// 读取并校验密钥，之后只返回缓存的身份。没有密钥轮换，换密钥需要重启进程。
#[derive(Debug)]
pub struct VapidContext {
    settings: VapidSettings,
    identity: OnceCell<SigningIdentity>,
}

impl VapidContext {
    pub fn new(settings: VapidSettings) -> Self {
        Self {
            settings,
            identity: OnceCell::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(VapidSettings::from(config))
    }

    /// 幂等初始化；密钥缺失或无效时返回 `AppError::Configuration`
    pub fn ensure_ready(&self) -> Result<&SigningIdentity> {
        self.identity.get_or_try_init(|| {
            let identity = SigningIdentity::from_settings(&self.settings)?;
            info!("VAPID signing identity initialized (subject: {})", identity.subject);
            Ok(identity)
        })
    }

    /// 浏览器订阅时使用的 applicationServerKey
    pub fn public_key(&self) -> Result<&str> {
        Ok(self.ensure_ready()?.public_key())
    }

    pub fn is_ready(&self) -> bool {
        self.identity.get().is_some()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_ensure_ready_is_idempotent() {
        let context = context();
        assert!(!context.is_ready());

        let first = context.ensure_ready().unwrap() as *const SigningIdentity;
        let second = context.ensure_ready().unwrap() as *const SigningIdentity;

        assert!(context.is_ready());
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_private_key_is_configuration_error() {
        let mut settings = settings();
        settings.private_key = None;
        let context = VapidContext::new(settings);

        let err = context.ensure_ready().unwrap_err();
        assert!(matches!(err, AppError::Configuration(ref msg) if msg.contains("VAPID_PRIVATE_KEY")));
        assert!(!context.is_ready());
    }

    #[test]
    fn test_missing_public_key_is_configuration_error() {
        let mut settings = settings();
        settings.public_key = None;

        let err = VapidContext::new(settings).public_key().unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_mismatched_key_pair_is_rejected() {
        let (other_public, _) = key_pair(9);
        let mut settings = settings();
        settings.public_key = Some(other_public);

        let err = VapidContext::new(settings).ensure_ready().unwrap_err();
        assert!(matches!(err, AppError::Configuration(ref msg) if msg.contains("does not match")));
    }

    #[test]
    fn test_subject_must_be_contact_uri() {
        let mut settings = settings();
        settings.subject = Some("commissioner@league.example".to_string());

        assert!(VapidContext::new(settings).ensure_ready().is_err());
    }

    #[test]
    fn test_padded_keys_are_accepted() {
        let mut settings = settings();
        settings.public_key = settings.public_key.map(|key| format!("{}=", key));

        let context = VapidContext::new(settings);
        let public_key = context.public_key().unwrap();
        assert!(!public_key.ends_with('='));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let context = context();
        let identity = context.ensure_ready().unwrap();
        let rendered = format!("{:?}", identity);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(identity.private_key()));
    }
}
