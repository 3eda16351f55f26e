use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use time::Date;
use tracing::{debug, warn};

use super::{Endpoint, Lookup, OfficerQuery, SearchFilters};
use crate::config::RegistrySettings;
use crate::domain::{CompanyNumber, CompanyProfile, OfficerList, SearchPage};
use crate::error::ApiError;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};
use crate::retry::RetryConfig;
use crate::throttling::{RateBudget, RateLimiter};

/// What the client does with a final (post-retry) response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Success,
    NotFound,
    Cooldown,
    Abort,
}

pub const fn classify_status(status: u16) -> StatusAction {
    match status {
        200..=299 => StatusAction::Success,
        404 => StatusAction::NotFound,
        429 => StatusAction::Cooldown,
        _ => StatusAction::Abort,
    }
}

/// Authenticated, rate-limited client for the three registry endpoints.
///
/// Every attempt (retries and post-cooldown re-issues included) takes a
/// limiter slot first, so the budget covers all traffic that reaches the wire.
pub struct RegistryClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    auth: HttpAuth,
    limiter: RateLimiter,
    retry: RetryConfig,
    cooldown: Duration,
    max_cooldowns: u32,
    timeout_ms: Option<u64>,
}

impl RegistryClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            auth: HttpAuth::api_key(api_key),
            limiter: RateLimiter::default(),
            retry: RetryConfig::default(),
            cooldown: Duration::from_secs(290),
            max_cooldowns: 1,
            timeout_ms: None,
        }
    }

    pub fn from_settings(http_client: Arc<dyn HttpClient>, settings: &RegistrySettings) -> Self {
        let mut client = Self::new(http_client, &settings.base_url, &settings.api_key)
            .with_rate_budget(settings.rate_limit)
            .with_retry(RetryConfig::from(&settings.retry))
            .with_cooldown(
                Duration::from_secs(settings.cooldown_secs),
                settings.max_cooldowns,
            );
        client.timeout_ms = settings.timeout_ms;
        client
    }

    pub fn with_rate_budget(mut self, budget: RateBudget) -> Self {
        self.limiter = RateLimiter::new(budget);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration, max_cooldowns: u32) -> Self {
        self.cooldown = cooldown;
        self.max_cooldowns = max_cooldowns;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Advanced search restricted to companies incorporated on `day`.
    pub async fn search(
        &self,
        filters: &SearchFilters,
        day: Date,
        page_size: u32,
        start_index: Option<u32>,
    ) -> Result<Lookup<SearchPage>, ApiError> {
        let request = filters.apply(
            self.request(format!("{}/advanced-search/companies", self.base_url)),
            day,
            page_size,
            start_index,
        );
        self.fetch_json(Endpoint::Search, request).await
    }

    pub async fn get_company(&self, id: &CompanyNumber) -> Result<Lookup<CompanyProfile>, ApiError> {
        let request = self.request(format!(
            "{}/company/{}",
            self.base_url,
            urlencoding::encode(id.as_str())
        ));
        self.fetch_json(Endpoint::CompanyProfile, request).await
    }

    pub async fn get_officers(
        &self,
        id: &CompanyNumber,
        query: &OfficerQuery,
    ) -> Result<Lookup<OfficerList>, ApiError> {
        let request = query.apply(self.request(format!(
            "{}/company/{}/officers",
            self.base_url,
            urlencoding::encode(id.as_str())
        )));
        self.fetch_json(Endpoint::CompanyOfficers, request).await
    }

    fn request(&self, url: String) -> HttpRequest {
        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_auth(&self.auth);
        match self.timeout_ms {
            Some(timeout_ms) => request.with_timeout_ms(timeout_ms),
            None => request,
        }
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: HttpRequest,
    ) -> Result<Lookup<T>, ApiError> {
        match self.send(endpoint, request).await? {
            Lookup::Found(body) => serde_json::from_str::<T>(&body)
                .map(Lookup::Found)
                .map_err(|error| ApiError::malformed(endpoint, &error)),
            Lookup::NotFound => Ok(Lookup::NotFound),
        }
    }

    /// Issues the request and applies the status table. 429 that outlives the
    /// retry policy costs one cooldown sleep per re-issue, up to `max_cooldowns`.
    async fn send(&self, endpoint: Endpoint, request: HttpRequest) -> Result<Lookup<String>, ApiError> {
        let mut cooldowns = 0_u32;
        loop {
            let response = self.execute_with_retry(endpoint, &request).await?;
            match classify_status(response.status) {
                StatusAction::Success => return Ok(Lookup::Found(response.body)),
                StatusAction::NotFound => {
                    debug!(%endpoint, url = %request.url, "no results matching query");
                    return Ok(Lookup::NotFound);
                }
                StatusAction::Cooldown => {
                    if cooldowns >= self.max_cooldowns {
                        return Err(ApiError::rate_limited(endpoint, cooldowns));
                    }
                    cooldowns += 1;
                    warn!(
                        %endpoint,
                        cooldown_secs = self.cooldown.as_secs(),
                        cooldowns,
                        "request limit hit; cooling down before re-issuing"
                    );
                    tokio::time::sleep(self.cooldown).await;
                }
                StatusAction::Abort => {
                    return Err(ApiError::from_status(endpoint, response.status));
                }
            }
        }
    }

    async fn execute_with_retry(
        &self,
        endpoint: Endpoint,
        request: &HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        let mut attempt = 0_u32;
        loop {
            self.limiter.acquire().await;
            debug!(%endpoint, url = %request.url, attempt, "sending registry request");

            match self.http_client.execute(request.clone()).await {
                Ok(response)
                    if self.retry.should_retry_status(response.status)
                        && self.retry.has_attempts_left(attempt) =>
                {
                    let delay = self.retry.delay_for_attempt(attempt);
                    debug!(
                        %endpoint,
                        status = response.status,
                        delay_ms = delay.as_millis() as u64,
                        "retryable status; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => {
                    debug!(%endpoint, status = response.status, "registry response");
                    return Ok(response);
                }
                Err(error)
                    if self.retry.should_retry_error(&error)
                        && self.retry.has_attempts_left(attempt) =>
                {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        %endpoint,
                        error = error.message(),
                        delay_ms = delay.as_millis() as u64,
                        "transport failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(ApiError::transport(endpoint, &error)),
            }
            attempt += 1;
        }
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .field("budget", &self.limiter.budget())
            .field("retry", &self.retry)
            .field("cooldown", &self.cooldown)
            .field("max_cooldowns", &self.max_cooldowns)
            .finish()
    }
}
