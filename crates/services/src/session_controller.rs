use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use navigator_core::{AuthPhase, Session, SessionPatch};
use tokio::sync::watch;

use crate::auth_api::AuthApi;
use crate::config::AuthConfig;
use crate::error::{AuthError, ConfigError};

/// Callback invoked with the user name after a session is resumed or registered.
pub type AuthObserver = Arc<dyn Fn(Option<&str>) + Send + Sync>;

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Everything a UI needs to render the auth state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub session: Session,
    pub is_checking_auth: bool,
    pub register_error: Option<String>,
}

impl AuthSnapshot {
    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        AuthPhase::from_flags(self.is_checking_auth, self.session.is_authenticated())
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            session: Session::empty(),
            is_checking_auth: true,
            register_error: None,
        }
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Owns the client session and drives resume, register, and logout.
///
/// State is published through a `watch` channel; every mutation goes through one of
/// the operations below. Operations are not serialized: when two overlap, the one
/// that completes last decides the session.
pub struct SessionController {
    api: AuthApi,
    state: watch::Sender<AuthSnapshot>,
    observer: RwLock<Option<AuthObserver>>,
    resume_started: AtomicBool,
}

impl SessionController {
    #[must_use]
    pub fn new(api: AuthApi) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        Self {
            api,
            state,
            observer: RwLock::new(None),
            resume_started: AtomicBool::new(false),
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if the HTTP client cannot be built.
    pub fn from_config(config: AuthConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(AuthApi::new(config)?))
    }

    #[must_use]
    pub fn with_auth_observer<F>(self, observer: F) -> Self
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        self.set_auth_observer(observer);
        self
    }

    /// Replace the success observer. Takes effect for notifications fired afterwards,
    /// including those of operations already in flight.
    pub fn set_auth_observer<F>(&self, observer: F)
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        let observer: AuthObserver = Arc::new(observer);
        *self.observer_slot() = Some(observer);
    }

    pub fn clear_auth_observer(&self) {
        *self.observer_slot() = None;
    }

    fn observer_slot(&self) -> RwLockWriteGuard<'_, Option<AuthObserver>> {
        self.observer.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.state.borrow().session.clone()
    }

    #[must_use]
    pub fn is_checking_auth(&self) -> bool {
        self.state.borrow().is_checking_auth
    }

    #[must_use]
    pub fn register_error(&self) -> Option<String> {
        self.state.borrow().register_error.clone()
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        self.state.borrow().phase()
    }

    /// Probe the server for an existing cookie session.
    ///
    /// Runs once per controller; later calls return the current session untouched.
    /// Failures are logged and leave the session empty. `is_checking_auth` is cleared
    /// on every path, including when this future is dropped before completing.
    pub async fn resume_session(&self) -> Session {
        if self.resume_started.swap(true, Ordering::AcqRel) {
            return self.session();
        }
        let checking = CheckingGuard { state: &self.state };

        match self.api.current_session().await {
            Ok(Some(session)) => {
                tracing::info!(user = session.user_name(), "resumed session");
                let user_name = session.user_name().map(str::to_owned);
                self.state.send_modify(|state| state.session = session);
                self.notify_auth_success(user_name.as_deref());
            }
            Ok(None) => tracing::debug!("no session to resume"),
            Err(err) => tracing::warn!(error = %err, "session check failed"),
        }

        drop(checking);
        self.session()
    }

    /// Register `name`, returning whether it succeeded.
    ///
    /// On failure the user-facing message is available from `register_error`.
    pub async fn register(&self, name: &str) -> bool {
        self.try_register(name).await.is_ok()
    }

    /// Register `name`, returning the new session or the typed failure.
    ///
    /// Either way the outcome is also reflected in the published state.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` when the request fails or the response is rejected.
    pub async fn try_register(&self, name: &str) -> Result<Session, AuthError> {
        self.state.send_if_modified(|state| state.register_error.take().is_some());
        tracing::debug!(user = name, "registering");

        match self.api.register(name).await {
            Ok(session) => {
                tracing::info!(user = session.user_name(), "registered");
                let user_name = session.user_name().map(str::to_owned);
                self.state.send_modify(|state| state.session = session.clone());
                self.notify_auth_success(user_name.as_deref());
                Ok(session)
            }
            Err(err) => {
                let message = err.user_message();
                tracing::warn!(error = %err, timeout = err.is_timeout(), "registration failed");
                self.state
                    .send_modify(|state| state.register_error = Some(message));
                Err(err)
            }
        }
    }

    /// End the session. Local state is cleared whatever the server says.
    pub async fn logout(&self) {
        if let Err(err) = self.api.logout().await {
            tracing::warn!(error = %err, "logout request failed; clearing local session anyway");
        }

        self.state.send_if_modified(|state| {
            let changed = !state.session.is_empty() || state.register_error.is_some();
            state.session = Session::empty();
            state.register_error = None;
            changed
        });
    }

    /// Merge local corrections into the session without contacting the server.
    pub fn update_auth(&self, patch: SessionPatch) {
        if patch.is_empty() {
            return;
        }
        self.state.send_modify(|state| state.session.apply(patch));
    }

    pub fn reset_error(&self) {
        self.state
            .send_if_modified(|state| state.register_error.take().is_some());
    }

    fn notify_auth_success(&self, user_name: Option<&str>) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(observer) = observer else {
            return;
        };

        if panic::catch_unwind(AssertUnwindSafe(|| observer(user_name))).is_err() {
            tracing::error!(user = user_name, "auth observer panicked; ignoring");
        }
    }
}

// Clears the checking flag when resume finishes or is cancelled mid-flight.
struct CheckingGuard<'a> {
    state: &'a watch::Sender<AuthSnapshot>,
}

impl Drop for CheckingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            let was_checking = state.is_checking_auth;
            state.is_checking_auth = false;
            was_checking
        });
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
