//! HTTP implementation of [`FetchText`] on top of ureq

use super::FetchText;
use crate::utils::decode_bytes;
use std::io::Read;
use std::time::Duration;

/// Largest body read from a raw endpoint.
const MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

/// Blocking fetcher with optional session credentials.
///
/// Credentials are only attached to credentialed requests: the `Cookie` header when a session
/// cookie is configured, and `Authorization: Bearer` when a token is.
pub struct HttpFetcher {
    agent: ureq::Agent,
    cookie: Option<String>,
    token: Option<String>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            cookie: None,
            token: None,
        }
    }

    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie.filter(|c| !c.is_empty());
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }
}

impl FetchText for HttpFetcher {
    fn fetch_text(&self, url: &str, credentialed: bool) -> Option<String> {
        let mut request = self.agent.get(url);
        if credentialed {
            if let Some(cookie) = &self.cookie {
                request = request.set("Cookie", cookie);
            }
            if let Some(token) = &self.token {
                request = request.set("Authorization", &format!("Bearer {token}"));
            }
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _response)) => {
                tracing::debug!("Fetch of {url} returned status {code}");
                return None;
            }
            Err(ureq::Error::Transport(transport)) => {
                tracing::debug!("Fetch of {url} failed: {transport}");
                return None;
            }
        };

        let mut bytes = Vec::new();
        if let Err(err) = response.into_reader().take(MAX_BODY_BYTES).read_to_end(&mut bytes) {
            tracing::debug!("Reading body of {url} failed: {err}");
            return None;
        }
        if bytes.is_empty() {
            return None;
        }
        Some(decode_bytes(&bytes))
    }
}
