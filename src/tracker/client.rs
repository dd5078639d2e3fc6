use std::future::Future;
use std::time::Duration;

use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use url::Url;

use crate::auth::Credentials;
use crate::config::TrackerConfig;
use crate::error::{AlmError, Result};

/// Something that can retrieve the raw test-case payload of one suite.
///
/// A call is a single attempt; retries and pacing belong to the caller.
pub trait SuiteSource {
    fn fetch_suite(&self, suite_id: u64) -> impl Future<Output = Result<String>>;
}

/// HTTP client for the tracker's test plan API.
pub struct TrackerClient {
    client: Client,
    plan_url: Url,
    api_version: Option<String>,
    credentials: Option<Credentials>,
}

impl TrackerClient {
    pub fn new(
        tracker: &TrackerConfig,
        credentials: Option<Credentials>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("alm-import/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .danger_accept_invalid_certs(tracker.accept_invalid_certs)
            .build()
            .map_err(|e| AlmError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = format!("{}/", tracker.base_url.trim_end_matches('/'));
        let plan_url = Url::parse(&base)
            .map_err(|e| AlmError::Config(format!("Invalid base URL: {e}")))?
            .join(&format!("{}/", tracker.plan_id))
            .map_err(|e| AlmError::Config(format!("Invalid plan URL: {e}")))?;

        Ok(Self {
            client,
            plan_url,
            api_version: tracker.api_version.clone(),
            credentials,
        })
    }

    /// `{base}/{plan}/Suites/{suite}/TestCase[?api-version=..]`
    pub fn suite_url(&self, suite_id: u64) -> Result<Url> {
        let mut url = self
            .plan_url
            .join(&format!("Suites/{suite_id}/TestCase"))
            .map_err(|e| AlmError::Config(format!("Invalid suite URL: {e}")))?;

        if let Some(version) = &self.api_version {
            url.query_pairs_mut().append_pair("api-version", version);
        }

        Ok(url)
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(credentials) = &self.credentials {
            request.header(AUTHORIZATION, credentials.header_value())
        } else {
            request
        }
    }
}

impl SuiteSource for TrackerClient {
    async fn fetch_suite(&self, suite_id: u64) -> Result<String> {
        let url = self.suite_url(suite_id)?;
        debug!("GET {url}");

        let request = self.auth_request(
            self.client
                .get(url)
                .header(ACCEPT, "application/json"),
        );

        let response = request.send().await.map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(AlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(classify_transport_error)?;

        serde_json::from_str::<serde_json::Value>(&body)
            .map_err(|e| AlmError::MalformedResponse(e.to_string()))?;

        Ok(body)
    }
}

fn classify_transport_error(error: reqwest::Error) -> AlmError {
    if error.is_timeout() {
        AlmError::Timeout
    } else {
        AlmError::Network(error)
    }
}
