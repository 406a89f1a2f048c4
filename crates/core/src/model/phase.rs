/// Lifecycle phase of a session controller.
///
/// `Initializing` is visited exactly once, while the startup session check is in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPhase {
    Initializing,
    Unauthenticated,
    Authenticated,
}

impl AuthPhase {
    /// Derive the phase from the checking flag and the authentication bit.
    #[must_use]
    pub fn from_flags(is_checking_auth: bool, is_authenticated: bool) -> Self {
        match (is_checking_auth, is_authenticated) {
            (true, _) => Self::Initializing,
            (false, true) => Self::Authenticated,
            (false, false) => Self::Unauthenticated,
        }
    }
}
