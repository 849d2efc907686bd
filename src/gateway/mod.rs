//! IIT Delhi proxy gateway protocol
//!
//! The gateway serves a single CGI form per proxy host. A session is opened by
//! posting credentials together with a hidden `sessionid` scraped from the
//! form page, kept alive by posting `Refresh` with the same id, and closed by
//! posting `logout`. Every reply is an HTML page; outcomes are recognised by
//! the wording on that page.

pub mod client;
pub mod endpoint;
pub mod outcome;
pub mod token;

pub use client::GatewayClient;
pub use endpoint::{CategoryError, GatewayEndpoint, ProxyCategory};
pub use outcome::{Connectivity, RequestOutcome};
pub use token::{SessionToken, TokenError, extract_token};
