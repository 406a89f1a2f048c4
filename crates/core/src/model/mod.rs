mod ids;
mod phase;
mod session;

pub use ids::{AuthToken, SessionId};
pub use phase::AuthPhase;
pub use session::{Session, SessionError, SessionPatch};
