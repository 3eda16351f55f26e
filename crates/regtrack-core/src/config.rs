//! Tracker configuration.
//!
//! Every field has a default matching the production job, so a config file
//! only needs to carry what differs (in practice: the API key).

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::ValidationError;
use crate::registry::{OfficerQuery, SearchFilters};
use crate::retry::RetrySettings;
use crate::throttling::RateBudget;

pub const DEFAULT_BASE_URL: &str = "https://api.company-information.service.gov.uk";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub registry: RegistrySettings,
    pub search: SearchSettings,
    pub validation: ValidationSettings,
    pub notification: NotificationSettings,
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.registry.validate()?;
        self.search.validate()?;
        self.notification.validate()
    }
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub base_url: String,
    pub api_key: String,
    pub rate_limit: RateBudget,
    /// Sleep after a 429 that outlived the retry policy.
    pub cooldown_secs: u64,
    /// Cooldowns allowed per call before it fails as rate limited.
    pub max_cooldowns: u32,
    pub retry: RetrySettings,
    pub timeout_ms: Option<u64>,
}

impl RegistrySettings {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.trim().is_empty() {
            return Err(ValidationError::MissingApiKey);
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(ValidationError::InvalidBaseUrl {
                value: self.base_url.clone(),
            });
        }
        if self.rate_limit.max_calls == 0 || self.rate_limit.window.is_zero() {
            return Err(ValidationError::ZeroRateBudget);
        }
        Ok(())
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            api_key: String::new(),
            rate_limit: RateBudget::default(),
            cooldown_secs: 290,
            max_cooldowns: 1,
            retry: RetrySettings::default(),
            timeout_ms: None,
        }
    }
}

impl std::fmt::Debug for RegistrySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("rate_limit", &self.rate_limit)
            .field("cooldown_secs", &self.cooldown_secs)
            .field("max_cooldowns", &self.max_cooldowns)
            .field("retry", &self.retry)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub filters: SearchFilters,
    pub page_size: u32,
    /// Leads older than this many days are not searched for.
    pub max_age_days: u32,
    pub officers: OfficerQuery,
}

impl SearchSettings {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.page_size == 0 {
            return Err(ValidationError::ZeroPageSize);
        }
        if self.max_age_days == 0 {
            return Err(ValidationError::ZeroLeadAge);
        }
        Ok(())
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            filters: SearchFilters::restaurants(),
            page_size: 5000,
            max_age_days: 60,
            officers: OfficerQuery::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Fetch each profile and drop excluded status details.
    pub check_detailed_status: bool,
    pub excluded_status_details: BTreeSet<String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            check_detailed_status: false,
            excluded_status_details: BTreeSet::from([String::from(
                "active-proposal-to-strike-off",
            )]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Who gets notified. An email address when `smtp` is set.
    pub recipient: Option<String>,
    /// When set (and `smtp` is not), notifications are POSTed here as JSON.
    pub webhook_url: Option<String>,
    /// When set, notifications are mailed to `recipient`.
    pub smtp: Option<SmtpSettings>,
}

impl NotificationSettings {
    fn validate(&self) -> Result<(), ValidationError> {
        let Some(smtp) = &self.smtp else {
            return Ok(());
        };
        if self.recipient.as_deref().map_or(true, |value| value.trim().is_empty()) {
            return Err(ValidationError::MissingRecipient);
        }
        for (field, value) in [("host", &smtp.host), ("username", &smtp.username)] {
            if value.trim().is_empty() {
                return Err(ValidationError::IncompleteSmtp { field });
            }
        }
        Ok(())
    }
}

/// Implicit-TLS SMTP account used to mail notifications.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// `From` address; the username when empty.
    pub sender: String,
    pub subject: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::from("smtp.gmail.com"),
            port: 465,
            username: String::new(),
            password: String::new(),
            sender: String::new(),
            subject: String::from("UK Leads Alert"),
        }
    }
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sender", &self.sender)
            .field("subject", &self.subject)
            .finish()
    }
}
