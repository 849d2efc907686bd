//! Request execution with timeout and exponential backoff

use super::{GatewayRequest, Transport, TransportError};
use crate::config::TimingConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Factor applied to the delay after each further failure
    pub multiplier: u32,
    /// Bound on each individual attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

impl From<&TimingConfig> for RetryPolicy {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            max_attempts: timing.max_attempts.max(1),
            base_delay: Duration::from_secs(timing.base_delay_secs),
            multiplier: timing.backoff_multiplier,
            attempt_timeout: timing.request_timeout(),
        }
    }
}

impl RetryPolicy {
    /// One attempt, no backoff
    pub fn single(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1,
            attempt_timeout,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Runs requests through a transport, retrying transport failures
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Same transport, different retry policy
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            transport: self.transport.clone(),
            policy,
        }
    }

    /// Execute a request, returning the response body
    ///
    /// Returns an empty string once every attempt has failed. Callers must
    /// treat an empty body as a transport failure, not as a gateway page.
    pub async fn execute(&self, request: &GatewayRequest) -> String {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.attempt(request).await {
                Ok(body) => return body,
                Err(e) if !e.is_retryable() => {
                    warn!("{} failed with non-retryable error: {}", request.url(), e);
                    return String::new();
                }
                Err(e) => {
                    if attempt < max_attempts {
                        let delay = self.policy.delay_after(attempt);
                        warn!(
                            "Attempt {}/{} to {} failed, retrying in {:?}: {}",
                            attempt,
                            max_attempts,
                            request.url(),
                            delay,
                            e
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(
                            "Attempt {}/{} to {} failed: {}",
                            attempt,
                            max_attempts,
                            request.url(),
                            e
                        );
                    }
                }
            }
        }

        info!(
            "Giving up on {} after {} attempts",
            request.url(),
            max_attempts
        );
        String::new()
    }

    async fn attempt(&self, request: &GatewayRequest) -> Result<String, TransportError> {
        let timeout = self.policy.attempt_timeout;
        match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }
}
