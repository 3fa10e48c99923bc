//! Session lifecycle: restore on start, login, logout and expiry.
//!
//! `SessionManager` is the single owner of the authenticated identity. It is
//! constructed once at startup and shared (via `Arc`) with the gateway and the
//! view layer. State changes are published on a watch channel so views can
//! redirect to the login screen when a session ends.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiError;

use super::authenticator::Authenticator;
use super::store::{keys, KeyValueStore};
use super::{Credentials, Session};

/// Authentication state. `Unknown` only exists until the first `restore()`
/// or `login()` resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unknown,
    Authenticated(Session),
    Anonymous,
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    authenticator: Arc<dyn Authenticator>,
    state: watch::Sender<AuthState>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, authenticator: Arc<dyn Authenticator>) -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self {
            store,
            authenticator,
            state,
        }
    }

    /// Restore a persisted session. Anything incomplete or expired is wiped.
    pub fn restore(&self) -> Option<Session> {
        match self.read_persisted() {
            Some(session) if !session.is_expired() => {
                info!(
                    tenant_id = %session.tenant_id,
                    minutes_left = session.minutes_until_expiry(),
                    "Restored session"
                );
                self.state.send_replace(AuthState::Authenticated(session.clone()));
                Some(session)
            }
            found => {
                if found.is_some() {
                    info!("Persisted session has expired");
                } else {
                    debug!("No usable persisted session");
                }
                self.clear_storage();
                self.state.send_replace(AuthState::Anonymous);
                None
            }
        }
    }

    /// Authenticate and establish a session. On failure nothing is changed.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        if !credentials.is_complete() {
            return Err(ApiError::InvalidCredentials);
        }

        let response = match self.authenticator.authenticate(credentials).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, username = %credentials.username, "Login failed");
                return Err(e);
            }
        };

        if response.expires_in <= 0 {
            return Err(ApiError::InvalidResponse(format!(
                "Login returned non-positive lifetime {}",
                response.expires_in
            )));
        }

        let expires_in = response.expires_in;
        let session = Session::starting_at(
            Utc::now(),
            response.token,
            response.dairy_name,
            response.dairy_id,
            expires_in,
        )
        .ok_or_else(|| ApiError::InvalidResponse(format!("Login lifetime {} is out of range", expires_in)))?;

        if let Err(e) = self.persist(&session) {
            // A half-written session must not be restorable
            self.clear_storage();
            warn!(error = %e, "Failed to save session");
        }

        info!(tenant_id = %session.tenant_id, demo = self.authenticator.is_demo(), "Login successful");
        self.state.send_replace(AuthState::Authenticated(session.clone()));
        Ok(session)
    }

    /// Clear the session from memory and storage. Safe to call repeatedly.
    pub fn logout(&self) {
        self.clear_storage();
        let previous = self.state.send_replace(AuthState::Anonymous);
        if previous.session().is_some() {
            info!("Logged out");
        }
    }

    /// Forced logout after the server rejected the token.
    pub fn expire(&self) {
        warn!("Session rejected by server, clearing");
        self.clear_storage();
        self.state.send_replace(AuthState::Anonymous);
    }

    /// Forced logout for a rejected `token`, only if it still belongs to the
    /// current session. Returns whether the session was ended.
    pub fn expire_if(&self, token: &str) -> bool {
        let ended = self.state.send_if_modified(|state| match state.session() {
            Some(session) if session.token == token => {
                *state = AuthState::Anonymous;
                true
            }
            _ => false,
        });
        if ended {
            warn!("Session rejected by server, clearing");
            self.clear_storage();
        } else {
            debug!("Ignoring rejection for a token that is no longer current");
        }
        ended
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    /// Current session if it has not passed its expiry. An expired session is
    /// cleared on the way out.
    pub fn valid_session(&self) -> Option<Session> {
        let session = self.current()?;
        if session.is_expired() {
            info!(tenant_id = %session.tenant_id, "Session expired");
            self.clear_storage();
            self.state.send_replace(AuthState::Anonymous);
            return None;
        }
        Some(session)
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state.borrow(), AuthState::Unknown)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().session().is_some()
    }

    /// Whether the persisted session was created by the demo login
    pub fn is_demo(&self) -> bool {
        self.store.get(keys::DEMO_MODE).as_deref() == Some("true")
    }

    fn read_persisted(&self) -> Option<Session> {
        let token = self.store.get(keys::TOKEN)?;
        let tenant_name = self.store.get(keys::TENANT_NAME)?;
        let tenant_id = self.store.get(keys::TENANT_ID)?;
        let expires_at = Session::parse_expiry_millis(&self.store.get(keys::EXPIRES_AT)?)?;

        if token.is_empty() || tenant_id.is_empty() {
            return None;
        }

        Some(Session {
            token,
            tenant_name,
            tenant_id,
            expires_at,
        })
    }

    fn persist(&self, session: &Session) -> anyhow::Result<()> {
        self.store.set(keys::TOKEN, &session.token)?;
        self.store.set(keys::TENANT_NAME, &session.tenant_name)?;
        self.store.set(keys::TENANT_ID, &session.tenant_id)?;
        self.store.set(keys::EXPIRES_AT, &session.expires_at_millis().to_string())?;
        if self.authenticator.is_demo() {
            self.store.set(keys::DEMO_MODE, "true")?;
        } else {
            self.store.remove(keys::DEMO_MODE)?;
        }
        Ok(())
    }

    fn clear_storage(&self) {
        for key in keys::ALL {
            if let Err(e) = self.store.remove(key) {
                warn!(error = %e, key, "Failed to clear session key");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LoginResponse;
    use crate::auth::authenticator::DemoAuthenticator;
    use crate::auth::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration;

    /// Accepts one username/password pair with a fixed lifetime
    struct FixedAuthenticator {
        expires_in: i64,
    }

    #[async_trait]
    impl Authenticator for FixedAuthenticator {
        async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
            if credentials.username == "farmer" && credentials.password == "cows" {
                Ok(LoginResponse {
                    token: "live-token".to_string(),
                    dairy_name: "T&K Dairy".to_string(),
                    dairy_id: "401".to_string(),
                    expires_in: self.expires_in,
                })
            } else {
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    fn manager_with(store: Arc<MemoryStore>) -> SessionManager {
        SessionManager::new(store, Arc::new(FixedAuthenticator { expires_in: 3600 }))
    }

    fn seed(store: &MemoryStore, expires_at_millis: i64) {
        store.set(keys::TOKEN, "stored-token").unwrap();
        store.set(keys::TENANT_NAME, "Milky Way").unwrap();
        store.set(keys::TENANT_ID, "633").unwrap();
        store.set(keys::EXPIRES_AT, &expires_at_millis.to_string()).unwrap();
    }

    #[test]
    fn test_starts_unknown_and_loading() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        assert_eq!(manager.state(), AuthState::Unknown);
        assert!(manager.is_loading());
        assert!(manager.current().is_none());
    }

    #[test]
    fn test_restore_expired_session_clears_storage() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, (Utc::now() - Duration::minutes(1)).timestamp_millis());
        store.set(keys::DEMO_MODE, "true").unwrap();

        let manager = manager_with(store.clone());
        assert!(manager.restore().is_none());
        assert_eq!(manager.state(), AuthState::Anonymous);
        assert!(!manager.is_loading());
        assert!(store.is_empty());
    }

    #[test]
    fn test_restore_valid_session() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, (Utc::now() + Duration::hours(3)).timestamp_millis());

        let manager = manager_with(store.clone());
        let session = manager.restore().expect("session should restore");
        assert_eq!(session.tenant_id, "633");
        assert_eq!(session.tenant_name, "Milky Way");
        assert_eq!(session.token, "stored-token");
        assert!(manager.is_authenticated());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_restore_incomplete_session_clears_storage() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, (Utc::now() + Duration::hours(3)).timestamp_millis());
        store.remove(keys::TENANT_NAME).unwrap();

        let manager = manager_with(store.clone());
        assert!(manager.restore().is_none());
        assert_eq!(manager.state(), AuthState::Anonymous);
        assert!(store.is_empty());
    }

    #[test]
    fn test_restore_unparseable_expiry_clears_storage() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, 0);
        store.set(keys::EXPIRES_AT, "tomorrow").unwrap();

        let manager = manager_with(store.clone());
        assert!(manager.restore().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());

        let before = Utc::now();
        let session = manager
            .login(&Credentials::new("farmer", "cows"))
            .await
            .expect("login should succeed");
        let after = Utc::now();

        assert_eq!(manager.state(), AuthState::Authenticated(session.clone()));
        assert_eq!(store.get(keys::TOKEN).as_deref(), Some("live-token"));
        assert_eq!(store.get(keys::TENANT_ID).as_deref(), Some("401"));
        assert!(store.get(keys::DEMO_MODE).is_none());

        let stored: i64 = store.get(keys::EXPIRES_AT).unwrap().parse().unwrap();
        let lower = (before + Duration::seconds(3600)).timestamp_millis();
        let upper = (after + Duration::seconds(3600)).timestamp_millis();
        assert!(stored >= lower && stored <= upper, "expiry {} not in [{}, {}]", stored, lower, upper);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_storage_untouched() {
        let store = Arc::new(MemoryStore::new());
        store.set("unrelated", "kept").unwrap();
        let manager = manager_with(store.clone());

        let err = manager
            .login(&Credentials::new("farmer", "goats"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
        assert!(manager.current().is_none());
        assert_eq!(store.len(), 1);
        assert!(store.get(keys::TOKEN).is_none());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_existing_session() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, (Utc::now() + Duration::hours(1)).timestamp_millis());
        let manager = manager_with(store.clone());
        manager.restore().unwrap();

        assert!(manager.login(&Credentials::new("x", "y")).await.is_err());
        assert_eq!(manager.current().unwrap().token, "stored-token");
        assert_eq!(store.get(keys::TOKEN).as_deref(), Some("stored-token"));
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected_without_authenticating() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let err = manager.login(&Credentials::new("", "")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
        assert!(manager.is_loading());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());
        manager.login(&Credentials::new("farmer", "cows")).await.unwrap();

        manager.logout();
        assert!(store.is_empty());
        assert_eq!(manager.state(), AuthState::Anonymous);

        manager.logout();
        assert!(store.is_empty());
        assert_eq!(manager.state(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_demo_login_sets_marker() {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(store.clone(), Arc::new(DemoAuthenticator));

        let before = Utc::now();
        let session = manager.login(&Credentials::new("demo", "demo")).await.unwrap();

        assert!(session.token.starts_with("demo-token-"));
        assert_eq!(session.tenant_name, "Sunrise Valley Dairy");
        let expected = before + Duration::seconds(86_400);
        assert!((session.expires_at - expected).num_milliseconds().abs() < 5_000);
        assert!(manager.is_demo());
    }

    #[tokio::test]
    async fn test_valid_session_detects_expiry() {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(store.clone(), Arc::new(FixedAuthenticator { expires_in: 1 }));
        manager.login(&Credentials::new("farmer", "cows")).await.unwrap();
        assert!(manager.valid_session().is_some());

        tokio::time::sleep(std::time::Duration::from_millis(1_100)).await;
        assert!(manager.valid_session().is_none());
        assert_eq!(manager.state(), AuthState::Anonymous);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_expire() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        manager.login(&Credentials::new("farmer", "cows")).await.unwrap();
        let mut rx = manager.subscribe();

        manager.expire();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_is_invalid_response() {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(
            store.clone(),
            Arc::new(FixedAuthenticator { expires_in: 100_000_000_000_000 }),
        );
        manager.restore();

        let err = manager.login(&Credentials::new("farmer", "cows")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert_eq!(manager.state(), AuthState::Anonymous);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_expire_if_ignores_superseded_token() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, (Utc::now() + Duration::hours(1)).timestamp_millis());
        let manager = manager_with(store.clone());
        manager.restore().unwrap();

        assert!(!manager.expire_if("some-older-token"));
        assert_eq!(manager.current().unwrap().token, "stored-token");
        assert_eq!(store.get(keys::TOKEN).as_deref(), Some("stored-token"));

        assert!(manager.expire_if("stored-token"));
        assert_eq!(manager.state(), AuthState::Anonymous);
        assert!(store.is_empty());
        assert!(!manager.expire_if("stored-token"));
    }

    /// Fails every write of one key
    struct FailingKeyStore {
        inner: MemoryStore,
        failing_key: &'static str,
    }

    impl KeyValueStore for FailingKeyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if key == self.failing_key {
                anyhow::bail!("disk full");
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn test_partial_persist_leaves_nothing_to_restore() {
        let inner = MemoryStore::new();
        seed(&inner, (Utc::now() + Duration::hours(1)).timestamp_millis());
        let store = Arc::new(FailingKeyStore { inner, failing_key: keys::EXPIRES_AT });
        let manager = SessionManager::new(store.clone(), Arc::new(FixedAuthenticator { expires_in: 3600 }));

        let session = manager.login(&Credentials::new("farmer", "cows")).await.unwrap();
        assert_eq!(manager.current(), Some(session));
        assert!(store.inner.is_empty());

        let restarted = SessionManager::new(store, Arc::new(FixedAuthenticator { expires_in: 3600 }));
        assert!(restarted.restore().is_none());
    }
}
