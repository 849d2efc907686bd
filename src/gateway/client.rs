//! Form submission against the gateway CGI

use super::endpoint::GatewayEndpoint;
use super::outcome::{
    Connectivity, RequestOutcome, classify_login, classify_logout, classify_probe,
    classify_refresh,
};
use super::token::{SessionToken, TokenError, extract_token};
use crate::credentials::Credentials;
use crate::http::{Executor, GatewayRequest, RetryPolicy};
use tracing::{debug, info};

/// Gateway client for one user on one proxy host
///
/// Holds the username for matching refresh replies but never the password.
pub struct GatewayClient {
    endpoint: GatewayEndpoint,
    username: String,
    executor: Executor,
    probe: Executor,
    probe_url: String,
}

impl GatewayClient {
    pub fn new(
        endpoint: GatewayEndpoint,
        username: impl Into<String>,
        executor: Executor,
        probe_url: impl Into<String>,
    ) -> Self {
        // The probe is a one-shot check; a failure simply means not connected.
        let probe = executor.with_policy(RetryPolicy::single(executor.policy().attempt_timeout));
        Self {
            endpoint,
            username: username.into(),
            executor,
            probe,
            probe_url: probe_url.into(),
        }
    }

    pub fn endpoint(&self) -> &GatewayEndpoint {
        &self.endpoint
    }

    /// Fetch the form page and scrape a fresh session id
    pub async fn fetch_token(&self) -> Result<SessionToken, TokenError> {
        debug!("Fetching session id from {}", self.endpoint.form_url);
        let page = self
            .executor
            .execute(&GatewayRequest::get(&self.endpoint.form_url))
            .await;
        extract_token(&page)
    }

    pub async fn login(&self, token: &SessionToken, credentials: &Credentials) -> RequestOutcome {
        info!("Logging in as {} via {}", credentials.username(), self.endpoint.host);
        let request = GatewayRequest::post_form(
            &self.endpoint.form_url,
            &[
                ("sessionid", token.as_str()),
                ("action", "Validate"),
                ("userid", credentials.username()),
                ("pass", credentials.password()),
            ],
        );
        let page = self.executor.execute(&request).await;
        debug!("Login response: {}", page);
        classify_login(&page, credentials.username())
    }

    pub async fn refresh(&self, token: &SessionToken) -> RequestOutcome {
        let request = GatewayRequest::post_form(
            &self.endpoint.form_url,
            &[("sessionid", token.as_str()), ("action", "Refresh")],
        );
        let page = self.executor.execute(&request).await;
        debug!("Refresh response: {}", page);
        classify_refresh(&page, &self.username)
    }

    pub async fn logout(&self, token: &SessionToken) -> RequestOutcome {
        info!("Logging out {} from {}", self.username, self.endpoint.host);
        let request = GatewayRequest::post_form(
            &self.endpoint.form_url,
            &[
                ("sessionid", token.as_str()),
                ("action", "logout"),
                ("logout", "Log out"),
            ],
        );
        let page = self.executor.execute(&request).await;
        debug!("Logout response: {}", page);
        classify_logout(&page)
    }

    /// Fetch an outside page through the proxy to see where it lands
    pub async fn probe(&self) -> Connectivity {
        let page = self
            .probe
            .execute(&GatewayRequest::get(&self.probe_url))
            .await;
        classify_probe(&page)
    }
}
