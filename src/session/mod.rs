//! Session lifecycle: login, keep-alive, logout and holding a session open

pub mod client;
pub mod keepalive;
pub mod run;
pub mod state;

pub use client::{SessionClient, SessionError};
pub use keepalive::{KeepAlive, KeepAliveTarget};
pub use run::{SessionEvent, hold_session};
pub use state::SessionState;
