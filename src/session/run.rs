//! Holding a session open until the user interrupts

use super::client::SessionClient;
use super::state::SessionState;
use crate::gateway::{Connectivity, RequestOutcome};
use std::future::Future;
use std::io;
use tracing::{info, warn};

/// Progress reported while a session is held open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Login(RequestOutcome),
    Connectivity(Connectivity),
    Expired,
    Logout(RequestOutcome),
}

/// Log in, hold the session until `shutdown` resolves, then log out
///
/// `shutdown` is watched from the start, so an interrupt during login or the
/// connectivity check goes straight to logout. Logout always runs, and its
/// outcome is returned.
pub async fn hold_session<F, R>(
    client: &SessionClient,
    check: bool,
    shutdown: F,
    mut report: R,
) -> RequestOutcome
where
    F: Future<Output = io::Result<()>>,
    R: FnMut(SessionEvent),
{
    tokio::pin!(shutdown);

    let mut interrupted = tokio::select! {
        outcome = client.login() => {
            report(SessionEvent::Login(outcome));
            false
        }
        result = &mut shutdown => {
            log_interrupt(result);
            true
        }
    };

    if check && !interrupted {
        interrupted = tokio::select! {
            connectivity = client.is_connected() => {
                report(SessionEvent::Connectivity(connectivity));
                false
            }
            result = &mut shutdown => {
                log_interrupt(result);
                true
            }
        };
    }

    if !interrupted {
        let mut states = client.subscribe();
        loop {
            tokio::select! {
                result = &mut shutdown => {
                    log_interrupt(result);
                    break;
                }
                changed = states.changed() => {
                    if changed.is_err() {
                        log_interrupt((&mut shutdown).await);
                        break;
                    }
                    if *states.borrow_and_update() == SessionState::Expired {
                        report(SessionEvent::Expired);
                    }
                }
            }
        }
    }

    info!("Interrupted, logging out");
    let outcome = client.logout().await;
    report(SessionEvent::Logout(outcome));
    outcome
}

fn log_interrupt(result: io::Result<()>) {
    if let Err(e) = result {
        warn!("Failed to listen for interrupt: {}", e);
    }
}
