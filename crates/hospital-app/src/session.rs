//! 会话管理
//!
//! 持有登录令牌与当前账号，令牌通过 [`TokenStore`] 持久化。

use hospital_client::{ApiClient, TokenStore};
use hospital_core::{HospitalError, Identity, Role};
use std::sync::Arc;
use tracing::{info, warn};

pub const MSG_MISSING_CREDENTIALS: &str = "请输入账号和密码";
pub const MSG_LOGIN_FAILED: &str = "登录失败";

/// 已登录会话
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
}

/// 会话存储
pub struct SessionStore {
    tokens: Arc<dyn TokenStore>,
    session: Option<Session>,
}

impl SessionStore {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            tokens,
            session: None,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.identity)
    }

    pub fn role(&self) -> Option<Role> {
        self.identity().map(|i| i.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// 病人账号关联的病人档案ID
    pub fn linked_patient_id(&self) -> Option<&str> {
        self.identity()
            .filter(|i| i.role == Role::Patient)
            .and_then(|i| i.linked_id.as_deref())
    }

    /// 用持久化的令牌恢复会话；任何失败都会清空令牌与会话
    pub async fn restore(&mut self, client: &mut ApiClient) -> bool {
        let token = match self.tokens.get() {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.reset(client);
                return false;
            }
            Err(e) => {
                warn!("Failed to read persisted token: {}", e);
                self.clear_all(client);
                return false;
            }
        };

        self.establish(client, token).await
    }

    /// 用令牌获取账号信息并建立会话；失败时清空令牌与会话
    async fn establish(&mut self, client: &mut ApiClient, token: String) -> bool {
        client.set_token(Some(token.clone()));
        match client.me().await {
            Ok(identity) => {
                info!(
                    "Session established for {} ({})",
                    identity.display_name(),
                    identity.role
                );
                self.session = Some(Session { token, identity });
                true
            }
            Err(e) => {
                warn!("Session restore failed: {}", e);
                self.clear_all(client);
                false
            }
        }
    }

    /// 登录；失败时返回可直接展示的消息
    pub async fn login(
        &mut self,
        client: &mut ApiClient,
        username: &str,
        password: &str,
    ) -> Result<(), String> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(MSG_MISSING_CREDENTIALS.to_string());
        }

        client.set_token(None);
        let token = match client.login(username, password).await {
            Ok(token) => token,
            Err(HospitalError::Api { message, .. }) => {
                warn!("Login rejected for {}: {}", username, message);
                self.clear_all(client);
                return Err(message);
            }
            Err(e) => {
                warn!("Login failed for {}: {}", username, e);
                self.clear_all(client);
                return Err(MSG_LOGIN_FAILED.to_string());
            }
        };

        // 持久化失败不影响本次登录
        if let Err(e) = self.tokens.set(&token) {
            warn!("Failed to persist token: {}", e);
        }

        if self.establish(client, token).await {
            Ok(())
        } else {
            Err(MSG_LOGIN_FAILED.to_string())
        }
    }

    /// 病人档案更新后重新获取账号信息（linkedId 可能变化）
    pub async fn refresh_identity(&mut self, client: &mut ApiClient) -> bool {
        match self.session.as_ref().map(|s| s.token.clone()) {
            Some(token) => self.establish(client, token).await,
            None => self.restore(client).await,
        }
    }

    /// 退出登录：不访问网络，无条件清空
    pub fn logout(&mut self, client: &mut ApiClient) {
        if let Some(session) = &self.session {
            info!("Logout: {}", session.identity.display_name());
        }
        self.clear_all(client);
    }

    fn clear_all(&mut self, client: &mut ApiClient) {
        if let Err(e) = self.tokens.clear() {
            warn!("Failed to clear persisted token: {}", e);
        }
        self.reset(client);
    }

    fn reset(&mut self, client: &mut ApiClient) {
        client.set_token(None);
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospital_client::mock::ScriptedTransport;
    use hospital_client::{HttpMethod, MemoryTokenStore};
    use hospital_core::Result;
    use serde_json::json;

    /// 无法写入的令牌存储
    struct ReadOnlyTokenStore;

    impl TokenStore for ReadOnlyTokenStore {
        fn get(&self) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _token: &str) -> Result<()> {
            Err(HospitalError::Internal("read-only".to_string()))
        }

        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    fn setup(token: Option<&str>) -> (Arc<ScriptedTransport>, Arc<MemoryTokenStore>, ApiClient) {
        let transport = Arc::new(ScriptedTransport::new());
        let tokens = Arc::new(match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::new(),
        });
        let client = ApiClient::new(transport.clone());
        (transport, tokens, client)
    }

    #[tokio::test]
    async fn test_restore_with_valid_token() {
        let (transport, tokens, mut client) = setup(Some("tok"));
        transport.respond(
            HttpMethod::Get,
            "/api/auth/me",
            200,
            json!({"id": "u1", "username": "doc", "role": "doctor", "linkedId": "d1"}),
        );
        let mut store = SessionStore::new(tokens);

        assert!(store.restore(&mut client).await);
        assert_eq!(store.role(), Some(Role::Doctor));
        assert_eq!(client.token(), Some("tok"));
        assert!(store.linked_patient_id().is_none());
    }

    #[tokio::test]
    async fn test_restore_with_unknown_role_clears_token() {
        let (transport, tokens, mut client) = setup(Some("tok"));
        transport.respond(
            HttpMethod::Get,
            "/api/auth/me",
            200,
            json!({"id": "u1", "role": "nurse"}),
        );
        let mut store = SessionStore::new(tokens.clone());

        assert!(!store.restore(&mut client).await);
        assert!(!store.is_authenticated());
        assert_eq!(tokens.get().unwrap(), None);
        assert!(client.token().is_none());
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let (transport, tokens, mut client) = setup(None);
        let mut store = SessionStore::new(tokens);

        let err = store.login(&mut client, "  ", "pw").await.unwrap_err();
        assert_eq!(err, MSG_MISSING_CREDENTIALS);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_login_surfaces_backend_message() {
        let (transport, tokens, mut client) = setup(None);
        transport.respond(
            HttpMethod::Post,
            "/api/auth/login",
            401,
            json!({"error": "账号或密码错误"}),
        );
        let mut store = SessionStore::new(tokens);

        let err = store.login(&mut client, "admin", "bad").await.unwrap_err();
        assert_eq!(err, "账号或密码错误");
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_then_logout() {
        let (transport, tokens, mut client) = setup(None);
        transport
            .respond(HttpMethod::Post, "/api/auth/login", 200, json!({"token": "t-1"}))
            .respond(
                HttpMethod::Get,
                "/api/auth/me",
                200,
                json!({"id": "p-acc", "role": "patient", "linkedId": "p1"}),
            );
        let mut store = SessionStore::new(tokens.clone());

        store.login(&mut client, "zhang", "pw").await.unwrap();
        assert_eq!(tokens.get().unwrap().as_deref(), Some("t-1"));
        assert_eq!(store.linked_patient_id(), Some("p1"));
        let me = transport
            .requests()
            .into_iter()
            .find(|r| r.path == "/api/auth/me")
            .unwrap();
        assert_eq!(me.bearer.as_deref(), Some("t-1"));

        let before = transport.requests().len();
        store.logout(&mut client);
        assert!(!store.is_authenticated());
        assert_eq!(tokens.get().unwrap(), None);
        assert_eq!(transport.requests().len(), before);
    }

    #[tokio::test]
    async fn test_login_without_token_fails() {
        let (transport, tokens, mut client) = setup(None);
        transport.respond(HttpMethod::Post, "/api/auth/login", 200, json!({}));
        let mut store = SessionStore::new(tokens);

        let err = store.login(&mut client, "admin", "pw").await.unwrap_err();
        assert_eq!(err, MSG_LOGIN_FAILED);
    }

    #[tokio::test]
    async fn test_login_succeeds_when_token_cannot_be_persisted() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .respond(HttpMethod::Post, "/api/auth/login", 200, json!({"token": "t-1"}))
            .respond(
                HttpMethod::Get,
                "/api/auth/me",
                200,
                json!({"id": "a1", "username": "admin", "role": "admin"}),
            );
        let mut client = ApiClient::new(transport.clone());
        let mut store = SessionStore::new(Arc::new(ReadOnlyTokenStore));

        store.login(&mut client, "admin", "pw").await.unwrap();
        assert_eq!(store.role(), Some(Role::Admin));
        assert_eq!(client.token(), Some("t-1"));
        assert_eq!(transport.calls(HttpMethod::Get, "/api/auth/me"), 1);

        // 刷新身份沿用内存中的令牌
        assert!(store.refresh_identity(&mut client).await);
        assert_eq!(transport.calls(HttpMethod::Get, "/api/auth/me"), 2);
    }
}
