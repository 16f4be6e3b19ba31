//! Explicit session context: bearer token plus a small user summary.
//!
//! One `SessionHandle` is created at startup and cloned into the API client and
//! the views. Established on login, cleared on logout or on any 401.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub username: String,
    #[serde(default)]
    pub account_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserSummary>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone().filter(|t| !t.is_empty())
    }

    pub fn user(&self) -> Option<UserSummary> {
        self.read().user.clone()
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn establish(&self, token: impl Into<String>, user: UserSummary) {
        let mut s = self.write();
        s.token = Some(token.into());
        s.user = Some(user);
    }

    pub fn set_user(&self, user: UserSummary) {
        self.write().user = Some(user);
    }

    /// Drop token and user. Returns whether a token was present.
    pub fn clear(&self) -> bool {
        let mut s = self.write();
        let had_token = s.token.take().is_some();
        s.user = None;
        had_token
    }

    // A poisoned lock still holds a usable Session; keep going with it.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
