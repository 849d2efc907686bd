//! Classification of gateway reply pages
//!
//! The gateway reports results only as prose inside an HTML page, so every
//! classifier here is a substring match. Checks run in a fixed priority order
//! because a degraded page can contain more than one marker.

use std::fmt;

const CREDENTIAL_MISMATCH: &str = "Either your userid and/or password does'not match.";
const LOGGED_IN_AS: &str = "You are logged in successfully as ";
const LOGGED_IN: &str = "You are logged in successfully";
const ALREADY_LOGGED_IN: &str = "already logged in";
const SESSION_EXPIRED: &str = "Session Expired";
const LOGGED_OUT: &str = "you have logged out from the IIT Delhi Proxy Service";

const PROBE_LOGIN_TITLE: &str = "<title>IIT Delhi Proxy Login</title>";
const PROBE_TARGET_TITLE: &str = "<title>Google</title>";

/// Result of a login, refresh or logout exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    IncorrectCredentials,
    AlreadyLoggedIn,
    SessionExpired,
    NotConnected,
    /// Refresh succeeded for a different user
    NotLoggedIn,
    /// Logout page carried neither the success nor the expiry message
    Failed,
    /// The executor gave up; there was no page to classify
    TransportFailure,
}

impl RequestOutcome {
    pub fn is_success(self) -> bool {
        self == RequestOutcome::Success
    }

    /// Outcome as reported past the session layer
    ///
    /// Transport failures are indistinguishable from being offline to the
    /// caller.
    pub fn surfaced(self) -> Self {
        match self {
            RequestOutcome::TransportFailure => RequestOutcome::NotConnected,
            other => other,
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestOutcome::Success => "Success",
            RequestOutcome::IncorrectCredentials => "Incorrect",
            RequestOutcome::AlreadyLoggedIn => "Already",
            RequestOutcome::SessionExpired => "Expired",
            RequestOutcome::NotConnected => "Not Connected",
            RequestOutcome::NotLoggedIn => "Not Logged In",
            RequestOutcome::Failed => "Failed",
            RequestOutcome::TransportFailure => "Transport Failure",
        };
        f.write_str(s)
    }
}

/// Result of fetching an outside page through the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// The proxy intercepted the request with its login page
    LoginPageShown,
    ReachedTarget,
    NotConnected,
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Connectivity::LoginPageShown => "Login Page",
            Connectivity::ReachedTarget => "Connected",
            Connectivity::NotConnected => "Not Connected",
        };
        f.write_str(s)
    }
}

pub fn classify_login(page: &str, username: &str) -> RequestOutcome {
    if page.is_empty() {
        RequestOutcome::TransportFailure
    } else if page.contains(CREDENTIAL_MISMATCH) {
        RequestOutcome::IncorrectCredentials
    } else if names_user(page, username) {
        RequestOutcome::Success
    } else if page.contains(ALREADY_LOGGED_IN) {
        RequestOutcome::AlreadyLoggedIn
    } else if page.contains(SESSION_EXPIRED) {
        RequestOutcome::SessionExpired
    } else {
        RequestOutcome::NotConnected
    }
}

pub fn classify_refresh(page: &str, username: &str) -> RequestOutcome {
    if page.is_empty() {
        RequestOutcome::TransportFailure
    } else if page.contains(LOGGED_IN) {
        if names_user(page, username) {
            RequestOutcome::Success
        } else {
            RequestOutcome::NotLoggedIn
        }
    } else if page.contains(SESSION_EXPIRED) {
        RequestOutcome::SessionExpired
    } else {
        RequestOutcome::NotConnected
    }
}

pub fn classify_logout(page: &str) -> RequestOutcome {
    if page.is_empty() {
        RequestOutcome::TransportFailure
    } else if page.contains(LOGGED_OUT) {
        RequestOutcome::Success
    } else if page.contains(SESSION_EXPIRED) {
        RequestOutcome::SessionExpired
    } else {
        RequestOutcome::Failed
    }
}

pub fn classify_probe(page: &str) -> Connectivity {
    if page.contains(PROBE_LOGIN_TITLE) {
        Connectivity::LoginPageShown
    } else if page.contains(PROBE_TARGET_TITLE) {
        Connectivity::ReachedTarget
    } else {
        Connectivity::NotConnected
    }
}

fn names_user(page: &str, username: &str) -> bool {
    page.contains(&format!("{}{}", LOGGED_IN_AS, username))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(body: &str) -> String {
        format!("<html><body><p>{}</p></body></html>", body)
    }

    #[test]
    fn test_login_success() {
        let page = html("You are logged in successfully as u1");
        assert_eq!(classify_login(&page, "u1"), RequestOutcome::Success);
    }

    #[test]
    fn test_login_success_for_other_user_is_not_success() {
        let page = html("You are logged in successfully as u2");
        assert_eq!(classify_login(&page, "u1"), RequestOutcome::NotConnected);
    }

    #[test]
    fn test_login_incorrect() {
        let page = html("Either your userid and/or password does'not match.");
        assert_eq!(
            classify_login(&page, "u1"),
            RequestOutcome::IncorrectCredentials
        );
    }

    #[test]
    fn test_login_already_and_expired() {
        assert_eq!(
            classify_login(&html("You are already logged in"), "u1"),
            RequestOutcome::AlreadyLoggedIn
        );
        assert_eq!(
            classify_login(&html("Session Expired"), "u1"),
            RequestOutcome::SessionExpired
        );
        assert_eq!(
            classify_login(&html("Service unavailable"), "u1"),
            RequestOutcome::NotConnected
        );
    }

    #[test]
    fn test_login_priority_order() {
        let all = html(
            "Either your userid and/or password does'not match. \
             You are logged in successfully as u1 already logged in Session Expired",
        );
        assert_eq!(
            classify_login(&all, "u1"),
            RequestOutcome::IncorrectCredentials
        );

        let success_and_rest =
            html("You are logged in successfully as u1 already logged in Session Expired");
        assert_eq!(
            classify_login(&success_and_rest, "u1"),
            RequestOutcome::Success
        );

        let already_and_expired = html("already logged in Session Expired");
        assert_eq!(
            classify_login(&already_and_expired, "u1"),
            RequestOutcome::AlreadyLoggedIn
        );
    }

    #[test]
    fn test_login_is_deterministic() {
        let page = html("already logged in");
        let first = classify_login(&page, "u1");
        for _ in 0..5 {
            assert_eq!(classify_login(&page, "u1"), first);
        }
    }

    #[test]
    fn test_refresh() {
        assert_eq!(
            classify_refresh(&html("You are logged in successfully as u1"), "u1"),
            RequestOutcome::Success
        );
        assert_eq!(
            classify_refresh(&html("You are logged in successfully as u2"), "u1"),
            RequestOutcome::NotLoggedIn
        );
        assert_eq!(
            classify_refresh(&html("Session Expired"), "u1"),
            RequestOutcome::SessionExpired
        );
        assert_eq!(
            classify_refresh(&html("Proxy error"), "u1"),
            RequestOutcome::NotConnected
        );
    }

    #[test]
    fn test_logout() {
        assert_eq!(
            classify_logout(&html(
                "Thank you, you have logged out from the IIT Delhi Proxy Service"
            )),
            RequestOutcome::Success
        );
        assert_eq!(
            classify_logout(&html("Session Expired")),
            RequestOutcome::SessionExpired
        );
        assert_eq!(classify_logout(&html("Error")), RequestOutcome::Failed);
    }

    #[test]
    fn test_empty_page_is_transport_failure() {
        assert_eq!(classify_login("", "u1"), RequestOutcome::TransportFailure);
        assert_eq!(classify_refresh("", "u1"), RequestOutcome::TransportFailure);
        assert_eq!(classify_logout(""), RequestOutcome::TransportFailure);
        assert_eq!(
            RequestOutcome::TransportFailure.surfaced(),
            RequestOutcome::NotConnected
        );
        assert_eq!(
            RequestOutcome::SessionExpired.surfaced(),
            RequestOutcome::SessionExpired
        );
    }

    #[test]
    fn test_probe() {
        assert_eq!(
            classify_probe("<html><head><title>IIT Delhi Proxy Login</title></head></html>"),
            Connectivity::LoginPageShown
        );
        assert_eq!(
            classify_probe("<html><head><title>Google</title></head></html>"),
            Connectivity::ReachedTarget
        );
        assert_eq!(classify_probe(""), Connectivity::NotConnected);
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(RequestOutcome::Success.to_string(), "Success");
        assert_eq!(RequestOutcome::NotConnected.to_string(), "Not Connected");
        assert_eq!(Connectivity::LoginPageShown.to_string(), "Login Page");
    }
}
