//! Credential store.
//!
//! `SessionManager` is the single owner of the access token, refresh token,
//! username and admin flag. Nothing else in the crate reads or writes the
//! backing storage, so the gateway and the route guard always agree on which
//! access token is current.

mod storage;

pub use storage::{FileStorage, MemoryStorage, SessionStorage};

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four independently stored session fields.
///
/// Any subset may be present; a session without an access token is
/// unauthenticated no matter what else it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(access_token: String, refresh_token: String, username: String, is_admin: bool) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            username: Some(username),
            is_admin: Some(is_admin),
            updated_at: Some(Utc::now()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Client-trusted flag; absent counts as false.
    pub fn is_admin(&self) -> bool {
        self.is_admin.unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.refresh_token.is_none()
            && self.username.is_none()
            && self.is_admin.is_none()
    }
}

type Listener = Arc<dyn Fn(&Session) + Send + Sync>;

pub struct SessionManager {
    storage: Box<dyn SessionStorage>,
    current: RwLock<Session>,
    listeners: RwLock<Vec<Listener>>,
}

impl SessionManager {
    /// Load whatever the storage holds; unreadable storage starts an empty session.
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        let current = match storage.load() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("discarding unreadable stored session: {}", e);
                Session::default()
            }
        };

        Self {
            storage: Box::new(storage),
            current: RwLock::new(current),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    pub fn session(&self) -> Session {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_session(&self, session: Session) {
        self.update(|current| *current = session);
    }

    pub fn clear_session(&self) {
        self.update(|current| *current = Session::default());
    }

    /// Register a callback fired after every write, outside the state lock.
    pub fn on_session_change<F>(&self, listener: F)
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(|s| s.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(|s| s.refresh_token.clone())
    }

    pub fn username(&self) -> Option<String> {
        self.read(|s| s.username.clone())
    }

    pub fn set_tokens(&self, access_token: String, refresh_token: String) {
        self.update(|current| {
            current.access_token = Some(access_token);
            current.refresh_token = Some(refresh_token);
        });
    }

    /// Drops the whole session, username and admin flag included, so a
    /// stale admin flag cannot outlive the tokens that justified it.
    pub fn clear_tokens(&self) {
        self.clear_session();
    }

    fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn update(&self, f: impl FnOnce(&mut Session)) {
        let snapshot = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut current);
            current.updated_at = if current.is_empty() { None } else { Some(Utc::now()) };

            if let Err(e) = self.storage.save(&current) {
                tracing::warn!("failed to persist session: {}", e);
            }

            current.clone()
        };

        tracing::debug!(
            authenticated = snapshot.is_authenticated(),
            has_refresh_token = snapshot.refresh_token.is_some(),
            "session updated"
        );

        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session();
        f.debug_struct("SessionManager")
            .field("authenticated", &session.is_authenticated())
            .field("username", &session.username)
            .finish()
    }
}
