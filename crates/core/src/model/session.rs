use thiserror::Error;

use crate::model::{AuthToken, SessionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("user name is empty")]
    EmptyUserName,

    #[error("session id is empty")]
    EmptySessionId,

    #[error("auth token is empty")]
    EmptyAuthToken,
}

/// The client's record of the logged-in user.
///
/// A session is either empty (the initial and logged-out value) or authenticated,
/// in which case `user_name` and `session_id` are both present. `auth_token` is only
/// present right after registration; a session resumed from the server cookie has none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_name: Option<String>,
    session_id: Option<SessionId>,
    auth_token: Option<AuthToken>,
    questions_remaining: Option<u32>,
    is_authenticated: bool,
}

impl Session {
    /// The unauthenticated value: every field absent.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an authenticated session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the user name, session id, or a supplied token is empty.
    pub fn authenticated(
        user_name: impl Into<String>,
        session_id: SessionId,
        auth_token: Option<AuthToken>,
        questions_remaining: u32,
    ) -> Result<Self, SessionError> {
        let user_name = user_name.into();
        if user_name.is_empty() {
            return Err(SessionError::EmptyUserName);
        }
        if session_id.is_empty() {
            return Err(SessionError::EmptySessionId);
        }
        if auth_token.as_ref().is_some_and(AuthToken::is_empty) {
            return Err(SessionError::EmptyAuthToken);
        }

        Ok(Self {
            user_name: Some(user_name),
            session_id: Some(session_id),
            auth_token,
            questions_remaining: Some(questions_remaining),
            is_authenticated: true,
        })
    }

    #[must_use]
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    #[must_use]
    pub fn auth_token(&self) -> Option<&AuthToken> {
        self.auth_token.as_ref()
    }

    #[must_use]
    pub fn questions_remaining(&self) -> Option<u32> {
        self.questions_remaining
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// True when the authentication flag agrees with the identifying fields.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.is_authenticated == (self.user_name.is_some() && self.session_id.is_some())
    }

    /// Shallow-merge `patch` into this session.
    ///
    /// No invariants are re-checked; callers own consistency of what they supply.
    pub fn apply(&mut self, patch: SessionPatch) {
        let SessionPatch {
            user_name,
            session_id,
            auth_token,
            questions_remaining,
            is_authenticated,
        } = patch;

        if let Some(value) = user_name {
            self.user_name = value;
        }
        if let Some(value) = session_id {
            self.session_id = value;
        }
        if let Some(value) = auth_token {
            self.auth_token = value;
        }
        if let Some(value) = questions_remaining {
            self.questions_remaining = value;
        }
        if let Some(value) = is_authenticated {
            self.is_authenticated = value;
        }
    }
}

/// Field overrides for `Session::apply`.
///
/// Each setter marks its field as overridden; untouched fields keep their current value.
/// Nullable fields take an `Option` so a patch can also clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct SessionPatch {
    user_name: Option<Option<String>>,
    session_id: Option<Option<SessionId>>,
    auth_token: Option<Option<AuthToken>>,
    questions_remaining: Option<Option<u32>>,
    is_authenticated: Option<bool>,
}

impl SessionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_name(mut self, value: Option<String>) -> Self {
        self.user_name = Some(value);
        self
    }

    pub fn session_id(mut self, value: Option<SessionId>) -> Self {
        self.session_id = Some(value);
        self
    }

    pub fn auth_token(mut self, value: Option<AuthToken>) -> Self {
        self.auth_token = Some(value);
        self
    }

    pub fn questions_remaining(mut self, value: Option<u32>) -> Self {
        self.questions_remaining = Some(value);
        self
    }

    pub fn is_authenticated(mut self, value: bool) -> Self {
        self.is_authenticated = Some(value);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
