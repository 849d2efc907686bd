//! Session lifecycle state machine
//!
//! `SessionClient` owns the current session id, the lifecycle state and the
//! keep-alive handle. State, token and the stopped flag live behind one lock
//! shared with the keep-alive task; the lock is never held across an await.
//!
//! ```text
//! LoggedOut --login--> LoggingIn --Success--> LoggedIn <--tick ok--> Refreshing
//!                          |                     |
//!                          +--other--> Failed    +--tick not ok--> Expired
//! any state --logout--> LoggedOut
//! ```

use super::keepalive::{KeepAlive, KeepAliveTarget};
use super::state::SessionState;
use crate::config::Config;
use crate::credentials::Credentials;
use crate::gateway::{
    Connectivity, GatewayClient, GatewayEndpoint, ProxyCategory, RequestOutcome, SessionToken,
};
use crate::http::{Executor, ReqwestTransport, RetryPolicy, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Transport setup failed: {0}")]
    TransportError(#[from] TransportError),
}

struct Shared {
    state: SessionState,
    token: Option<SessionToken>,
    /// Set by logout before the keep-alive is cancelled
    stopped: bool,
    /// Bumped whenever a keep-alive is cancelled so a stale task can't
    /// touch a newer session
    generation: u64,
    last_outcome: Option<RequestOutcome>,
}

struct SessionCore {
    gateway: GatewayClient,
    shared: Mutex<Shared>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionCore {
    fn set_state(&self, shared: &mut Shared, state: SessionState) {
        if shared.state != state {
            debug!("Session state {} -> {}", shared.state, state);
        }
        shared.state = state;
        self.state_tx.send_replace(state);
    }

    /// Mark the session stopped and invalidate any running keep-alive
    fn stop(&self) -> Option<SessionToken> {
        let mut shared = self.shared.lock();
        shared.stopped = true;
        shared.generation += 1;
        shared.token.clone()
    }
}

/// Keep-alive view of a session, pinned to the generation that armed it
struct Ticker {
    core: Arc<SessionCore>,
    generation: u64,
}

impl Ticker {
    fn is_current(&self, shared: &Shared) -> bool {
        !shared.stopped && shared.generation == self.generation
    }
}

#[async_trait]
impl KeepAliveTarget for Ticker {
    fn begin_tick(&self) -> bool {
        let mut shared = self.core.shared.lock();
        if !self.is_current(&shared) || shared.state != SessionState::LoggedIn {
            return false;
        }
        self.core.set_state(&mut shared, SessionState::Refreshing);
        true
    }

    async fn refresh(&self) -> RequestOutcome {
        let token = self.core.shared.lock().token.clone();
        match token {
            Some(token) => self.core.gateway.refresh(&token).await,
            None => RequestOutcome::NotConnected,
        }
    }

    fn finish_tick(&self, outcome: RequestOutcome) -> bool {
        let mut shared = self.core.shared.lock();
        if !self.is_current(&shared) {
            return false;
        }
        shared.last_outcome = Some(outcome);
        if outcome.is_success() {
            self.core.set_state(&mut shared, SessionState::LoggedIn);
        } else {
            warn!("Session ended: refresh returned {}", outcome);
            self.core.set_state(&mut shared, SessionState::Expired);
        }
        true
    }
}

/// One user's session against one proxy gateway
pub struct SessionClient {
    credentials: Credentials,
    core: Arc<SessionCore>,
    keepalive: Mutex<Option<KeepAlive>>,
    refresh_interval: Duration,
}

impl SessionClient {
    /// Build a client talking to the real gateway for `category`
    pub fn new(
        credentials: Credentials,
        category: ProxyCategory,
        config: &Config,
    ) -> Result<Self, SessionError> {
        let endpoint = GatewayEndpoint::new(category);
        let transport = ReqwestTransport::new(
            &endpoint.proxy_url,
            config.timing.request_timeout(),
            config.gateway.accept_invalid_certs,
        )?;
        Ok(Self::with_transport(
            credentials,
            endpoint,
            Arc::new(transport),
            config,
        ))
    }

    /// Build a client over any transport
    pub fn with_transport(
        credentials: Credentials,
        endpoint: GatewayEndpoint,
        transport: Arc<dyn Transport>,
        config: &Config,
    ) -> Self {
        debug!(
            "Session for {} on {} (form {}, proxy {}, pac {})",
            credentials.username(),
            endpoint.category,
            endpoint.form_url,
            endpoint.proxy_url,
            endpoint.pac_url
        );

        let executor = Executor::new(transport, RetryPolicy::from(&config.timing));
        let gateway = GatewayClient::new(
            endpoint,
            credentials.username(),
            executor,
            config.gateway.probe_url.clone(),
        );
        let (state_tx, _) = watch::channel(SessionState::LoggedOut);

        Self {
            credentials,
            core: Arc::new(SessionCore {
                gateway,
                shared: Mutex::new(Shared {
                    state: SessionState::LoggedOut,
                    token: None,
                    stopped: true,
                    generation: 0,
                    last_outcome: None,
                }),
                state_tx,
            }),
            keepalive: Mutex::new(None),
            refresh_interval: config.timing.refresh_interval(),
        }
    }

    pub fn endpoint(&self) -> &GatewayEndpoint {
        self.core.gateway.endpoint()
    }

    pub fn state(&self) -> SessionState {
        self.core.shared.lock().state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state().is_active()
    }

    /// Session id captured at the last login attempt
    pub fn token(&self) -> Option<SessionToken> {
        self.core.shared.lock().token.clone()
    }

    /// Outcome of the most recent login, refresh or logout
    pub fn last_outcome(&self) -> Option<RequestOutcome> {
        self.core.shared.lock().last_outcome
    }

    /// Watch state changes, including ones made by the keep-alive task
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.core.state_tx.subscribe()
    }

    pub fn is_keepalive_running(&self) -> bool {
        self.keepalive
            .lock()
            .as_ref()
            .is_some_and(|keepalive| !keepalive.is_finished())
    }

    /// Log in with a freshly fetched session id
    ///
    /// On success the keep-alive is armed. Any keep-alive from an earlier
    /// login is cancelled first. A logout while this is in flight wins, and
    /// the login reports `NotConnected`.
    pub async fn login(&self) -> RequestOutcome {
        self.cancel_keepalive();

        let generation = {
            let mut shared = self.core.shared.lock();
            shared.token = None;
            self.core.set_state(&mut shared, SessionState::LoggingIn);
            shared.generation
        };

        let token = match self.core.gateway.fetch_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Login failed: {}", e);
                return self.finish_login(generation, RequestOutcome::NotConnected);
            }
        };
        debug!("Fetched session id {}", token);

        // A logout from here on submits this id rather than fetching another
        if !self.store_token(generation, &token) {
            debug!("Logout happened before the login form was sent");
            return RequestOutcome::NotConnected;
        }

        let outcome = self
            .core
            .gateway
            .login(&token, &self.credentials)
            .await
            .surfaced();
        let outcome = self.finish_login(generation, outcome);

        if outcome.is_success() {
            let ticker = Arc::new(Ticker {
                core: self.core.clone(),
                generation,
            });
            *self.keepalive.lock() = Some(KeepAlive::spawn(ticker, self.refresh_interval));
            info!("Logged in as {}", self.credentials.username());
        } else {
            info!("Login returned {}", outcome);
        }

        outcome
    }

    fn store_token(&self, generation: u64, token: &SessionToken) -> bool {
        let mut shared = self.core.shared.lock();
        if shared.generation != generation {
            return false;
        }
        shared.token = Some(token.clone());
        true
    }

    /// Apply a login result and return the outcome the caller should see
    ///
    /// A result that arrives after a logout is dropped and reported as
    /// `NotConnected`, since the session it belongs to is already gone.
    fn finish_login(&self, generation: u64, outcome: RequestOutcome) -> RequestOutcome {
        let mut shared = self.core.shared.lock();
        if shared.generation != generation {
            debug!("Logout happened during login, dropping {}", outcome);
            return RequestOutcome::NotConnected;
        }
        shared.last_outcome = Some(outcome);
        if outcome.is_success() {
            shared.stopped = false;
            self.core.set_state(&mut shared, SessionState::LoggedIn);
        } else {
            self.core.set_state(&mut shared, SessionState::Failed);
        }
        outcome
    }

    /// Log out, best effort, from any state
    ///
    /// Stops the keep-alive before anything else. Uses the session id from
    /// the last login; without one, a fresh id is fetched, and if even that
    /// fails the form is still submitted with an empty id.
    pub async fn logout(&self) -> RequestOutcome {
        let token = self.cancel_keepalive();

        let token = match token {
            Some(token) => token,
            None => match self.core.gateway.fetch_token().await {
                Ok(token) => token,
                Err(e) => {
                    warn!("No session id for logout: {}", e);
                    SessionToken::empty()
                }
            },
        };

        let outcome = self.core.gateway.logout(&token).await.surfaced();

        let mut shared = self.core.shared.lock();
        shared.token = None;
        shared.last_outcome = Some(outcome);
        self.core.set_state(&mut shared, SessionState::LoggedOut);
        info!("Logout returned {}", outcome);

        outcome
    }

    /// Check where a plain HTTP request through the proxy ends up
    pub async fn is_connected(&self) -> Connectivity {
        self.core.gateway.probe().await
    }

    /// Set the stopped flag, then cancel the keep-alive task
    fn cancel_keepalive(&self) -> Option<SessionToken> {
        let token = self.core.stop();
        if let Some(keepalive) = self.keepalive.lock().take() {
            keepalive.cancel();
        }
        token
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.cancel_keepalive();
    }
}
