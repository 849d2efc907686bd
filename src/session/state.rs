use std::fmt;

/// Where a session stands in its login/refresh/logout lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggingIn,
    LoggedIn,
    /// A keep-alive refresh is in flight
    Refreshing,
    /// The keep-alive loop saw a non-success refresh and stopped
    Expired,
    /// The last login attempt did not succeed
    Failed,
}

impl SessionState {
    /// Logged in, possibly mid-refresh
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::LoggedIn | SessionState::Refreshing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::LoggedOut => "logged out",
            SessionState::LoggingIn => "logging in",
            SessionState::LoggedIn => "logged in",
            SessionState::Refreshing => "refreshing",
            SessionState::Expired => "expired",
            SessionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(SessionState::LoggedIn.is_active());
        assert!(SessionState::Refreshing.is_active());
        assert!(!SessionState::Expired.is_active());
        assert!(!SessionState::Failed.is_active());
    }
}
