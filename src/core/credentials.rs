use crate::domain::model::{Credentials, SessionEvent};
use crate::domain::ports::KeyValueStore;
use crate::utils::error::Result;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

pub const TOKEN_KEY: &str = "zurfy_token";
pub const REFRESH_TOKEN_KEY: &str = "zurfy_refresh_token";
pub const USER_KEY: &str = "zurfy_user";

/// 憑證與其所屬的 epoch；每次寫入 epoch 都會遞增
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSnapshot {
    pub credentials: Credentials,
    pub epoch: u64,
}

#[derive(Debug, Default)]
struct CredentialState {
    credentials: Credentials,
    user: Option<serde_json::Value>,
    epoch: u64,
}

struct CredentialInner {
    state: RwLock<CredentialState>,
    persistence: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<SessionEvent>,
}

/// 目前 session 的憑證，寫入時同步到持久層
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<CredentialInner>,
}

impl CredentialStore {
    pub fn new(persistence: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(CredentialInner {
                state: RwLock::new(CredentialState::default()),
                persistence,
                events,
            }),
        }
    }

    /// 從持久層讀回上次的 session
    pub async fn restore(persistence: Arc<dyn KeyValueStore>) -> Result<Self> {
        let access_token = persistence.get(TOKEN_KEY).await?;
        let refresh_token = persistence.get(REFRESH_TOKEN_KEY).await?;
        let user = match persistence.get(USER_KEY).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!("⚠️ Ignoring unreadable stored user profile: {}", e);
                    None
                }
            },
            None => None,
        };

        let store = Self::new(persistence);
        {
            let mut state = store.write_state();
            state.credentials = Credentials {
                access_token,
                refresh_token,
            };
            state.user = user;
        }

        if store.is_authenticated() {
            tracing::debug!("🔑 Restored persisted session");
        }
        Ok(store)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, CredentialState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, CredentialState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> CredentialSnapshot {
        let state = self.read_state();
        CredentialSnapshot {
            credentials: state.credentials.clone(),
            epoch: state.epoch,
        }
    }

    pub fn credentials(&self) -> Credentials {
        self.read_state().credentials.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_state().credentials.access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_state().credentials.refresh_token.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.read_state().epoch
    }

    pub fn user(&self) -> Option<serde_json::Value> {
        self.read_state().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().credentials.access_token.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// 登入/註冊成功後寫入整組憑證
    pub async fn set(&self, credentials: Credentials, user: Option<serde_json::Value>) {
        {
            let mut state = self.write_state();
            state.credentials = credentials.clone();
            if user.is_some() {
                state.user = user.clone();
            }
            state.epoch += 1;
        }

        self.persist(TOKEN_KEY, credentials.access_token.as_deref()).await;
        self.persist(REFRESH_TOKEN_KEY, credentials.refresh_token.as_deref())
            .await;
        if let Some(user) = user {
            self.persist(USER_KEY, Some(&user.to_string())).await;
        }
        self.emit(SessionEvent::LoggedIn);
    }

    pub async fn set_user(&self, user: serde_json::Value) {
        self.write_state().user = Some(user.clone());
        self.persist(USER_KEY, Some(&user.to_string())).await;
    }

    /// 只由 dispatcher 的 refresh 流程呼叫
    pub(crate) async fn apply_refresh(&self, access_token: String, refresh_token: Option<String>) {
        {
            let mut state = self.write_state();
            state.credentials.access_token = Some(access_token.clone());
            if let Some(rotated) = &refresh_token {
                state.credentials.refresh_token = Some(rotated.clone());
            }
            state.epoch += 1;
        }

        self.persist(TOKEN_KEY, Some(&access_token)).await;
        if let Some(rotated) = refresh_token {
            self.persist(REFRESH_TOKEN_KEY, Some(&rotated)).await;
        }
        self.emit(SessionEvent::Refreshed);
    }

    /// 使用者主動登出
    pub async fn clear(&self) {
        self.wipe().await;
        self.emit(SessionEvent::LoggedOut);
    }

    /// refresh 失敗：清除憑證並通知 session 已過期
    pub(crate) async fn expire(&self) {
        self.wipe().await;
        self.emit(SessionEvent::Expired);
    }

    async fn wipe(&self) {
        {
            let mut state = self.write_state();
            state.credentials = Credentials::default();
            state.user = None;
            state.epoch += 1;
        }

        self.persist(TOKEN_KEY, None).await;
        self.persist(REFRESH_TOKEN_KEY, None).await;
        self.persist(USER_KEY, None).await;
    }

    // 持久層失敗不影響記憶體中的 session
    async fn persist(&self, key: &str, value: Option<&str>) {
        let outcome = match value {
            Some(value) => self.inner.persistence.set(key, value).await,
            None => self.inner.persistence.remove(key).await,
        };
        if let Err(e) = outcome {
            tracing::warn!("⚠️ Failed to persist '{}': {}", key, e);
        }
    }

    fn emit(&self, event: SessionEvent) {
        tracing::debug!("🔑 Session event: {:?}", event);
        // 沒有訂閱者時 send 會失敗，可忽略
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_persists_and_advances_epoch() {
        let persistence = Arc::new(MemoryStore::new());
        let store = CredentialStore::new(persistence.clone());
        assert_eq!(store.epoch(), 0);
        assert!(!store.is_authenticated());

        store
            .set(
                Credentials::new("access-1", "refresh-1"),
                Some(json!({"email": "maker@example.com"})),
            )
            .await;

        assert_eq!(store.epoch(), 1);
        assert_eq!(store.access_token().as_deref(), Some("access-1"));
        assert_eq!(
            persistence.get(TOKEN_KEY).await.unwrap().as_deref(),
            Some("access-1")
        );
        assert_eq!(
            persistence.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(),
            Some("refresh-1")
        );
        assert!(persistence.get(USER_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_restore_reads_persisted_session() {
        let persistence = Arc::new(MemoryStore::new());
        persistence.set(TOKEN_KEY, "stored-access").await.unwrap();
        persistence.set(REFRESH_TOKEN_KEY, "stored-refresh").await.unwrap();
        persistence
            .set(USER_KEY, r#"{"name":"Maker"}"#)
            .await
            .unwrap();

        let store = CredentialStore::restore(persistence).await.unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.refresh_token().as_deref(), Some("stored-refresh"));
        assert_eq!(store.user().unwrap()["name"], "Maker");
    }

    #[tokio::test]
    async fn test_restore_ignores_corrupt_user_blob() {
        let persistence = Arc::new(MemoryStore::new());
        persistence.set(TOKEN_KEY, "stored-access").await.unwrap();
        persistence.set(USER_KEY, "{not json").await.unwrap();

        let store = CredentialStore::restore(persistence).await.unwrap();

        assert!(store.is_authenticated());
        assert!(store.user().is_none());
    }

    #[tokio::test]
    async fn test_apply_refresh_keeps_refresh_token_unless_rotated() {
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        store.set(Credentials::new("old", "refresh-1"), None).await;

        store.apply_refresh("new".to_string(), None).await;
        assert_eq!(store.access_token().as_deref(), Some("new"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));

        store
            .apply_refresh("newer".to_string(), Some("refresh-2".to_string()))
            .await;
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-2"));
        assert_eq!(store.epoch(), 3);
    }

    #[tokio::test]
    async fn test_expire_clears_everything_and_broadcasts() {
        let persistence = Arc::new(MemoryStore::new());
        let store = CredentialStore::new(persistence.clone());
        store
            .set(Credentials::new("a", "r"), Some(json!({"id": 1})))
            .await;
        let mut events = store.subscribe();

        store.expire().await;

        assert!(store.credentials().is_empty());
        assert!(store.user().is_none());
        assert_eq!(persistence.get(TOKEN_KEY).await.unwrap(), None);
        assert_eq!(persistence.get(USER_KEY).await.unwrap(), None);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Expired);
    }
}
