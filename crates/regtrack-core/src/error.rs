use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::http_client::HttpError;
use crate::registry::Endpoint;

/// Validation errors for identifiers and configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("company number cannot be empty")]
    EmptyCompanyNumber,
    #[error("company number length {len} exceeds max {max}")]
    CompanyNumberTooLong { len: usize, max: usize },
    #[error("company number contains invalid character '{ch}' at index {index}")]
    CompanyNumberInvalidChar { ch: char, index: usize },

    #[error("registry api key is not configured")]
    MissingApiKey,
    #[error("registry base url must start with http:// or https://: '{value}'")]
    InvalidBaseUrl { value: String },
    #[error("rate budget must allow at least one call in a non-zero window")]
    ZeroRateBudget,
    #[error("search page size must be greater than zero")]
    ZeroPageSize,
    #[error("lead age window must be at least one day")]
    ZeroLeadAge,
    #[error("email notifications need a recipient")]
    MissingRecipient,
    #[error("smtp setting '{field}' is empty")]
    IncompleteSmtp { field: &'static str },
}

/// Category named in operator notifications for a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    BadRequest,
    Unauthorized,
    UpstreamUnavailable,
    UnexpectedStatus,
    RateLimited,
    Transport,
    MalformedResponse,
    NoValidLeads,
    Sink,
    RunInProgress,
}

impl FailureCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "bad-request",
            Self::Unauthorized => "unauthorized",
            Self::UpstreamUnavailable => "upstream-unavailable",
            Self::UnexpectedStatus => "unexpected-status",
            Self::RateLimited => "rate-limited",
            Self::Transport => "transport",
            Self::MalformedResponse => "malformed-response",
            Self::NoValidLeads => "no-valid-leads",
            Self::Sink => "sink",
            Self::RunInProgress => "run-in-progress",
        }
    }

    /// Operator hint appended to fatal notifications.
    pub const fn hint(self) -> &'static str {
        match self {
            Self::BadRequest => "Check the search filters and configuration.",
            Self::Unauthorized => "Check the registry API key.",
            Self::UpstreamUnavailable => "The registry API is most likely having problems.",
            Self::UnexpectedStatus => "The registry API answered with a status this job does not handle.",
            Self::RateLimited => "The registry kept refusing calls after the cooldown; check the rate budget.",
            Self::Transport => "The registry API could not be reached.",
            Self::MalformedResponse => "The registry API returned a body that could not be parsed.",
            Self::NoValidLeads => "No new leads passed validation in this run.",
            Self::Sink => "The lead table store could not be read or written.",
            Self::RunInProgress => "Another run still holds the run lock; this run was skipped.",
        }
    }
}

impl Display for FailureCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a failed registry call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 400.
    BadRequest,
    /// 401.
    Unauthorized,
    /// Any 5xx.
    UpstreamUnavailable,
    /// Any status outside the handled set.
    UnexpectedStatus,
    /// 429 persisted through retries and cooldowns.
    RateLimited,
    /// Connection-level failure that survived the retry policy.
    Transport,
    /// Body did not decode into the expected shape.
    MalformedResponse,
}

impl ApiErrorKind {
    pub const fn category(self) -> FailureCategory {
        match self {
            Self::BadRequest => FailureCategory::BadRequest,
            Self::Unauthorized => FailureCategory::Unauthorized,
            Self::UpstreamUnavailable => FailureCategory::UpstreamUnavailable,
            Self::UnexpectedStatus => FailureCategory::UnexpectedStatus,
            Self::RateLimited => FailureCategory::RateLimited,
            Self::Transport => FailureCategory::Transport,
            Self::MalformedResponse => FailureCategory::MalformedResponse,
        }
    }

    /// Per-record failures that enrichment may absorb instead of aborting.
    pub const fn is_record_level(self) -> bool {
        matches!(self, Self::Transport | Self::MalformedResponse)
    }
}

/// Structured registry error returned to the pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{endpoint} call failed ({}): {message}", kind_label(.kind))]
pub struct ApiError {
    kind: ApiErrorKind,
    endpoint: Endpoint,
    status: Option<u16>,
    message: String,
}

fn kind_label(kind: &ApiErrorKind) -> &'static str {
    kind.category().as_str()
}

impl ApiError {
    /// Classifies a non-success, non-404, non-429 status.
    pub fn from_status(endpoint: Endpoint, status: u16) -> Self {
        let (kind, message) = match status {
            400 => (
                ApiErrorKind::BadRequest,
                String::from("status 400, request parameters were rejected"),
            ),
            401 => (
                ApiErrorKind::Unauthorized,
                String::from("status 401, credentials were rejected"),
            ),
            500.. => (
                ApiErrorKind::UpstreamUnavailable,
                format!("status {status}, upstream unavailable"),
            ),
            _ => (
                ApiErrorKind::UnexpectedStatus,
                format!("unexpected status {status}"),
            ),
        };

        Self {
            kind,
            endpoint,
            status: Some(status),
            message,
        }
    }

    pub fn rate_limited(endpoint: Endpoint, cooldowns: u32) -> Self {
        Self {
            kind: ApiErrorKind::RateLimited,
            endpoint,
            status: Some(429),
            message: format!("still rate limited after {cooldowns} cooldown period(s)"),
        }
    }

    pub fn transport(endpoint: Endpoint, error: &HttpError) -> Self {
        Self {
            kind: ApiErrorKind::Transport,
            endpoint,
            status: None,
            message: error.message().to_owned(),
        }
    }

    pub fn malformed(endpoint: Endpoint, error: &serde_json::Error) -> Self {
        Self {
            kind: ApiErrorKind::MalformedResponse,
            endpoint,
            status: Some(200),
            message: format!("failed to parse response body: {error}"),
        }
    }

    pub const fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub const fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn category(&self) -> FailureCategory {
        self.kind.category()
    }
}

/// Failure of the external table store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sink error: {message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure to deliver an operator notification. Logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("notification failed: {message}")]
pub struct NotifyError {
    message: String,
}

impl NotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Fatal outcome of a run, returned to the orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no companies passed validation ({collected} collected)")]
    NoValidLeads { collected: usize },

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl PipelineError {
    pub const fn category(&self) -> FailureCategory {
        match self {
            Self::Api(error) => error.category(),
            Self::NoValidLeads { .. } => FailureCategory::NoValidLeads,
            Self::Sink(_) => FailureCategory::Sink,
        }
    }
}
