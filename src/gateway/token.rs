//! Session id scraping from the gateway form page

use std::fmt;
use thiserror::Error;

const TOKEN_MARKER: &str = r#"sessionid" type="hidden" value=""#;
pub const TOKEN_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("Session id not found in gateway page")]
    TokenNotFound,
}

/// Hidden `sessionid` value the gateway binds a login to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Placeholder id for a logout attempted without any usable token
    pub(crate) fn empty() -> Self {
        SessionToken(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the session id that follows the hidden-input marker
///
/// A page that ends before a full id follows the marker is treated as
/// malformed rather than yielding a short id.
pub fn extract_token(page: &str) -> Result<SessionToken, TokenError> {
    let start = page
        .find(TOKEN_MARKER)
        .map(|i| i + TOKEN_MARKER.len())
        .ok_or(TokenError::TokenNotFound)?;

    let token: String = page[start..].chars().take(TOKEN_LEN).collect();
    if token.chars().count() < TOKEN_LEN {
        return Err(TokenError::TokenNotFound);
    }

    Ok(SessionToken(token))
}
