//! # Regtrack Core
//!
//! Company registry client and lead pipeline for regtrack.
//!
//! ## Overview
//!
//! A run looks up companies incorporated in the last N days in a set of
//! industry codes, drops the ones already tracked, fetches their officers and
//! exports the result to an external table store:
//!
//! - **Rate-limited registry client** with retry, backoff and 429 cooldown
//! - **Lead collection** over a window of incorporation days
//! - **Validation** against the known-company set and detailed status
//! - **Officer enrichment** with batched problem reporting
//! - **Run log** of stage timestamps and counters
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`collector`] | One search per incorporation day |
//! | [`config`] | Tracker configuration with production defaults |
//! | [`domain`] | Company records, identifiers and the run log |
//! | [`enrichment`] | Officer summaries |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`notify`] | Operator notifications |
//! | [`registry`] | Registry endpoints and client |
//! | [`retry`] | Retry policy and backoff |
//! | [`runner`] | End-to-end run orchestration |
//! | [`sink`] | Table store contract |
//! | [`throttling`] | GCRA rate limiter on tokio time |
//! | [`validator`] | Lead validation |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  LeadRun        │──────────────────────────┐
//! └────────┬────────┘                          │
//!          │                                   ▼
//!          ▼                          ┌──────────────────┐
//! ┌─────────────────┐                 │ LeadSink         │
//! │ Collector /     │                 │ (external store) │
//! │ Validator /     │                 └──────────────────┘
//! │ Enrichment      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ RegistryClient  │────▶│ RateLimiter      │
//! │                 │────▶│ RetryConfig      │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ HttpClient      │
//! │ (reqwest)       │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Stages return [`PipelineError`]; its category is what the operator sees:
//!
//! ```rust
//! use regtrack_core::{FailureCategory, PipelineError};
//!
//! fn describe(error: &PipelineError) -> &'static str {
//!     match error.category() {
//!         FailureCategory::Unauthorized => "check the API key",
//!         FailureCategory::NoValidLeads => "nothing new today",
//!         _ => "see logs",
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The API key is sent as HTTP Basic credentials and redacted from `Debug`
//!   output and logs

pub mod collector;
pub mod config;
pub mod domain;
pub mod enrichment;
pub mod error;
pub mod http_client;
pub mod notify;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod sink;
pub mod throttling;
pub mod validator;

// Pipeline stages
pub use collector::{date_window, LeadCollector};
pub use enrichment::{EnrichmentOutcome, EnrichmentStage};
pub use runner::{failure_message, failure_notice, summary_message, LeadRun, RunReport};
pub use validator::LeadValidator;

// Configuration
pub use config::{
    NotificationSettings, RegistrySettings, SearchSettings, SmtpSettings, TrackerConfig,
    ValidationSettings, DEFAULT_BASE_URL,
};

// Domain models
pub use domain::{
    format_timestamp, CompanyNumber, CompanyProfile, CompanyRecord, KnownIdentifierSet, Officer,
    OfficerList, RegisteredAddress, RunLog, RunLogKey, RunLogValue, SearchPage,
};

// Error types
pub use error::{
    ApiError, ApiErrorKind, FailureCategory, NotifyError, PipelineError, SinkError,
    ValidationError,
};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Notifications
pub use notify::{notify_best_effort, LogNotifier, Notifier, SmtpNotifier, WebhookNotifier};

// Registry
pub use registry::{Endpoint, Lookup, OfficerQuery, RegistryClient, SearchFilters};

// Retry and throttling
pub use retry::{Backoff, RetryConfig, RetrySettings};
pub use throttling::{quota_for, RateBudget, RateLimiter, TokioClock};

// Table store
pub use sink::{LeadRow, LeadSink, TableSetup, LEAD_COLUMNS, LOG_COLUMNS};
