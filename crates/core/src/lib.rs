#![forbid(unsafe_code)]

pub mod model;

pub use model::{AuthPhase, AuthToken, Session, SessionError, SessionId, SessionPatch};
