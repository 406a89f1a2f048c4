#![forbid(unsafe_code)]

pub mod auth_api;
pub mod config;
pub mod error;
pub mod session_controller;
pub mod transport;

pub use navigator_core::{AuthPhase, AuthToken, Session, SessionId, SessionPatch};

pub use auth_api::AuthApi;
pub use config::{AuthConfig, AuthTimeouts};
pub use error::{AuthError, ConfigError, TransportError};
pub use session_controller::{AuthObserver, AuthSnapshot, SessionController};
