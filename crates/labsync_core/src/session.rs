//! crates/labsync_core/src/session.rs
//!
//! The Auth Session Store: who is signed in, with which token, and what they
//! may do. It is constructed once and handed by reference to whatever needs it.
//! All mutation goes through `&mut self`, so there is exactly one writer at a
//! time; readers work from a cloned [`SessionSnapshot`].

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{LoginResponse, Role, User};
use crate::ports::{ApiError, ApiResult, AuthApi, TokenStore};

/// A consistent, read-only view of the session at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub token: Option<String>,
    pub loading: bool,
}

impl SessionSnapshot {
    pub fn has_role(&self, required: Role) -> bool {
        self.user
            .as_ref()
            .map_or(false, |user| user.role.level() >= required.level())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn can_edit(&self) -> bool {
        self.has_role(Role::Assistant)
    }

    pub fn can_upload_syllabus(&self) -> bool {
        self.has_role(Role::Assistant)
    }

    pub fn can_access_admin(&self) -> bool {
        self.has_role(Role::Hod)
    }

    pub fn is_principal(&self) -> bool {
        self.has_role(Role::Principal)
    }
}

pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn TokenStore>,
    state: SessionSnapshot,
}

impl SessionStore {
    /// Creates an unresolved session. Call [`SessionStore::initialize`] before
    /// trusting any role check.
    pub fn new(api: Arc<dyn AuthApi>, storage: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            storage,
            state: SessionSnapshot {
                user: None,
                token: None,
                loading: true,
            },
        }
    }

    /// Re-validates a persisted token. Any failure leaves the session signed
    /// out and removes the stored token; this never returns an error.
    pub async fn initialize(&mut self) {
        if let Some(saved) = self.storage.load() {
            match self.validate(&saved).await {
                Ok(user) => {
                    debug!(user_id = user.id, role = %user.role, "Stored token accepted");
                    self.state.user = Some(user);
                    self.state.token = Some(saved);
                }
                Err(e) => {
                    warn!("Stored token rejected, signing out: {}", e);
                    self.logout();
                }
            }
        }
        self.state.loading = false;
    }

    async fn validate(&self, token: &str) -> ApiResult<User> {
        let check = self.api.check_auth(token).await?;
        if !check.authenticated {
            return Err(ApiError::http(401, "Not authenticated"));
        }
        let record = check
            .user
            .ok_or_else(|| ApiError::Decode("authenticated response without a user".to_string()))?;
        Ok(User::try_from(record)?)
    }

    /// Signs in. Nothing is stored unless the server accepts the credentials
    /// and returns a user with a known role.
    pub async fn login(&mut self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let response = self.api.login(email, password).await?;
        let user = User::try_from(response.user.clone())?;

        if let Err(e) = self.storage.save(&response.access_token) {
            warn!("Could not persist the session token: {}", e);
        }
        info!(user_id = user.id, role = %user.role, "Signed in");
        self.state.token = Some(response.access_token.clone());
        self.state.user = Some(user);
        Ok(response)
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.storage.clear() {
            warn!("Could not remove the stored session token: {}", e);
        }
        if self.state.user.take().is_some() {
            info!("Signed out");
        }
        self.state.token = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.clone()
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn has_role(&self, required: Role) -> bool {
        self.state.has_role(required)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn can_edit(&self) -> bool {
        self.state.can_edit()
    }

    pub fn can_upload_syllabus(&self) -> bool {
        self.state.can_upload_syllabus()
    }

    pub fn can_access_admin(&self) -> bool {
        self.state.can_access_admin()
    }

    pub fn is_principal(&self) -> bool {
        self.state.is_principal()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{AuthCheck, NewUser, UserRecord, UserUpdate};
    use crate::ports::Ack;
    use crate::token::MemoryTokenStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend double: one account, one valid token.
    pub(crate) struct FakeAuth {
        pub role: String,
        pub check_fails: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeAuth {
        pub(crate) fn with_role(role: &str) -> Self {
            Self {
                role: role.to_string(),
                check_fails: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self) -> UserRecord {
            UserRecord {
                id: 3,
                email: "a@b.com".into(),
                role: self.role.clone(),
                name: Some("Asha".into()),
            }
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
            self.calls.lock().unwrap().push(format!("login {email}"));
            if password != "secret" {
                return Err(ApiError::http(401, "Invalid credentials"));
            }
            Ok(LoginResponse {
                access_token: "tok-1".into(),
                token_type: "bearer".into(),
                user: self.record(),
            })
        }

        async fn check_auth(&self, token: &str) -> ApiResult<AuthCheck> {
            self.calls.lock().unwrap().push(format!("check {token}"));
            if self.check_fails {
                return Err(ApiError::Network("connection refused".into()));
            }
            if token == "tok-1" {
                Ok(AuthCheck {
                    authenticated: true,
                    user: Some(self.record()),
                })
            } else {
                Ok(AuthCheck {
                    authenticated: false,
                    user: None,
                })
            }
        }

        async fn list_users(&self, _token: Option<&str>) -> ApiResult<Vec<UserRecord>> {
            Ok(vec![self.record()])
        }

        async fn create_user(&self, _token: Option<&str>, user: &NewUser) -> ApiResult<UserRecord> {
            Ok(UserRecord {
                id: 99,
                email: user.email.clone(),
                role: user.role.to_string(),
                name: user.name.clone(),
            })
        }

        async fn update_user(
            &self,
            _token: Option<&str>,
            user_id: i64,
            _update: &UserUpdate,
        ) -> ApiResult<UserRecord> {
            let mut record = self.record();
            record.id = user_id;
            Ok(record)
        }

        async fn delete_user(&self, _token: Option<&str>, _user_id: i64) -> ApiResult<Ack> {
            Ok(serde_json::json!({ "ok": true }))
        }
    }

    fn store(api: FakeAuth, storage: Arc<MemoryTokenStore>) -> SessionStore {
        SessionStore::new(Arc::new(api), storage)
    }

    #[test]
    fn no_role_without_a_user() {
        let session = store(FakeAuth::with_role("principal"), Arc::new(MemoryTokenStore::new()));
        for role in Role::ALL {
            assert!(!session.has_role(role));
        }
        assert!(session.is_loading());
    }

    #[tokio::test]
    async fn role_checks_are_monotonic() {
        for held in Role::ALL {
            let storage = Arc::new(MemoryTokenStore::new());
            let mut session = store(FakeAuth::with_role(held.as_str()), storage);
            session.login("a@b.com", "secret").await.unwrap();
            for required in Role::ALL {
                assert_eq!(session.has_role(required), required <= held, "{held} vs {required}");
            }
        }
    }

    #[tokio::test]
    async fn hod_check_against_assistant_and_principal() {
        let mut assistant = store(FakeAuth::with_role("assistant"), Arc::new(MemoryTokenStore::new()));
        assistant.login("a@b.com", "secret").await.unwrap();
        assert!(!assistant.has_role(Role::Hod));
        assert!(assistant.can_edit());
        assert!(!assistant.can_access_admin());

        let mut principal = store(FakeAuth::with_role("principal"), Arc::new(MemoryTokenStore::new()));
        principal.login("a@b.com", "secret").await.unwrap();
        assert!(principal.has_role(Role::Hod));
        assert!(principal.is_principal());
    }

    #[tokio::test]
    async fn failed_login_leaves_session_untouched() {
        let storage = Arc::new(MemoryTokenStore::new());
        let mut session = store(FakeAuth::with_role("hod"), storage.clone());

        let err = session.login("a@b.com", "wrong").await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid credentials");
        assert!(!session.is_authenticated());
        assert_eq!(storage.load(), None);
    }

    #[tokio::test]
    async fn unknown_role_is_refused_at_login() {
        let storage = Arc::new(MemoryTokenStore::new());
        let mut session = store(FakeAuth::with_role("admin"), storage.clone());

        let err = session.login("a@b.com", "secret").await.unwrap_err();

        assert_eq!(err, ApiError::UnknownRole("admin".into()));
        assert_eq!(storage.load(), None);
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn logout_clears_memory_and_storage() {
        let storage = Arc::new(MemoryTokenStore::new());
        let mut session = store(FakeAuth::with_role("assistant"), storage.clone());
        session.login("a@b.com", "secret").await.unwrap();
        assert_eq!(storage.load().as_deref(), Some("tok-1"));

        session.logout();

        assert!(!session.has_role(Role::Assistant));
        assert_eq!(session.token(), None);
        assert_eq!(storage.load(), None);
    }

    #[tokio::test]
    async fn reload_after_login_restores_the_same_user() {
        let storage = Arc::new(MemoryTokenStore::new());
        let mut first = store(FakeAuth::with_role("hod"), storage.clone());
        let response = first.login("a@b.com", "secret").await.unwrap();

        let mut reloaded = store(FakeAuth::with_role("hod"), storage.clone());
        reloaded.initialize().await;

        let expected = User::try_from(response.user).unwrap();
        assert_eq!(reloaded.user(), Some(&expected));
        assert_eq!(reloaded.token(), Some("tok-1"));
        assert!(!reloaded.is_loading());
    }

    #[tokio::test]
    async fn initialize_without_token_skips_validation() {
        let api = Arc::new(FakeAuth::with_role("hod"));
        let mut session = SessionStore::new(api.clone(), Arc::new(MemoryTokenStore::new()));

        session.initialize().await;

        assert!(api.calls.lock().unwrap().is_empty());
        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn initialize_fails_closed_on_rejected_token() {
        let storage = Arc::new(MemoryTokenStore::with_token("stale"));
        let mut session = store(FakeAuth::with_role("hod"), storage.clone());

        session.initialize().await;

        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(storage.load(), None);
    }

    #[tokio::test]
    async fn initialize_fails_closed_on_network_error() {
        let storage = Arc::new(MemoryTokenStore::with_token("tok-1"));
        let mut api = FakeAuth::with_role("hod");
        api.check_fails = true;
        let mut session = store(api, storage.clone());

        session.initialize().await;

        assert!(!session.is_authenticated());
        assert_eq!(storage.load(), None);
    }

    #[tokio::test]
    async fn initialize_fails_closed_on_unknown_role() {
        let storage = Arc::new(MemoryTokenStore::with_token("tok-1"));
        let mut session = store(FakeAuth::with_role("janitor"), storage.clone());

        session.initialize().await;

        assert!(!session.is_authenticated());
        assert_eq!(storage.load(), None);
    }
}
