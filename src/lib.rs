//! IIT Delhi proxy - login and keep-alive client for the campus proxy gateway
//!
//! The campus proxy only forwards traffic for users with an open session on
//! its captive-portal style CGI form. This crate logs in to that form, keeps
//! the session alive by refreshing it every minute, and logs out on request.
//!
//! # Architecture
//!
//! - `config`: Configuration file handling (TOML)
//! - `credentials`: Username/password pair with a redacted password
//! - `http`: Transport trait and the retrying request executor
//! - `gateway`: Proxy hosts, session id scraping, form submission and reply
//!   classification
//! - `session`: Lifecycle state machine, the keep-alive task, and holding a
//!   session open until interrupted
//!
//! # Usage
//!
//! ```bash
//! iitd-proxy <username> <category>
//! ```

pub mod config;
pub mod credentials;
pub mod gateway;
pub mod http;
pub mod session;

pub use config::Config;
pub use credentials::Credentials;
pub use gateway::{Connectivity, GatewayEndpoint, ProxyCategory, RequestOutcome};
pub use session::{SessionClient, SessionEvent, SessionState, hold_session};
