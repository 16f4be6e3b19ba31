//! Reaction to expired credentials.
//!
//! The client only reports `ApiError::Unauthorized`. Whoever composes the app
//! wraps calls with an [`UnauthorizedGuard`], which clears the shared session
//! and fires the logout callback once until the next login re-arms it.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use bankdash_core::SessionHandle;

use crate::error::ApiError;

pub trait LogoutHandler: Send + Sync {
    fn on_logout(&self);
}

impl<F> LogoutHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_logout(&self) {
        self()
    }
}

pub struct UnauthorizedGuard<H: LogoutHandler> {
    session: SessionHandle,
    handler: H,
    fired: AtomicBool,
}

impl<H: LogoutHandler> UnauthorizedGuard<H> {
    pub fn new(session: SessionHandle, handler: H) -> Self {
        Self {
            session,
            handler,
            fired: AtomicBool::new(false),
        }
    }

    /// Pass a result through, handling a 401 on the way.
    pub fn check<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(e) = &result {
            if e.is_unauthorized() {
                self.handle_unauthorized();
            }
        }
        result
    }

    fn handle_unauthorized(&self) {
        self.session.clear();
        if !self.fired.swap(true, Ordering::SeqCst) {
            info!("session rejected by server, logging out");
            self.handler.on_logout();
        }
    }

    /// Call after a successful login so the next 401 is reported again.
    pub fn rearm(&self) {
        self.fired.store(false, Ordering::SeqCst);
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
