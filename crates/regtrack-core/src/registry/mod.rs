//! Company registry API: endpoints, request filters and the rate-limited client.
//!
//! # Endpoints
//!
//! | Endpoint | Path | Response |
//! |----------|------|----------|
//! | Search | `/advanced-search/companies` | [`SearchPage`](crate::domain::SearchPage) |
//! | CompanyProfile | `/company/{id}` | [`CompanyProfile`](crate::domain::CompanyProfile) |
//! | CompanyOfficers | `/company/{id}/officers` | [`OfficerList`](crate::domain::OfficerList) |
//!
//! # Status handling
//!
//! | Status | Outcome |
//! |--------|---------|
//! | 2xx | body decoded, [`Lookup::Found`] |
//! | 404 | [`Lookup::NotFound`] |
//! | 429 | retried with backoff, then a cooldown sleep and a re-issue |
//! | 400, 401, 5xx, other | [`ApiError`](crate::error::ApiError), fatal for the run |

mod client;

use std::fmt::{Display, Formatter};

use serde::Deserialize;
use time::macros::format_description;
use time::Date;

pub use client::{classify_status, RegistryClient, StatusAction};

use crate::http_client::HttpRequest;

/// Registry endpoint, used for logging and error attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Search,
    CompanyProfile,
    CompanyOfficers,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "advanced search",
            Self::CompanyProfile => "company profile",
            Self::CompanyOfficers => "company officers",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a registry call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    /// 404: nothing matched. Callers decide what that means.
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound => Lookup::NotFound,
        }
    }
}

/// Advanced search filters. List filters are sent comma-joined; empty and
/// absent filters are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub company_name: Option<String>,
    pub company_status: Vec<String>,
    pub company_subtype: Option<String>,
    pub company_type: Vec<String>,
    pub dissolved_from: Option<String>,
    pub dissolved_to: Option<String>,
    pub location: Option<String>,
    pub sic_codes: Vec<String>,
}

impl SearchFilters {
    /// Industry codes of the default target (restaurants and food service).
    pub fn restaurants() -> Self {
        Self {
            company_status: vec![String::from("active"), String::from("open")],
            sic_codes: ["56101", "56102", "56103"].map(String::from).to_vec(),
            ..Self::default()
        }
    }

    pub(crate) fn apply(
        &self,
        request: HttpRequest,
        incorporated_on: Date,
        page_size: u32,
        start_index: Option<u32>,
    ) -> HttpRequest {
        let day = format_day(incorporated_on);
        request
            .with_query("company_name", self.company_name.as_deref())
            .with_query_list("company_status", &self.company_status)
            .with_query("company_subtype", self.company_subtype.as_deref())
            .with_query_list("company_type", &self.company_type)
            .with_query("dissolved_from", self.dissolved_from.as_deref())
            .with_query("dissolved_to", self.dissolved_to.as_deref())
            .with_query("incorporated_from", Some(day.as_str()))
            .with_query("incorporated_to", Some(day.as_str()))
            .with_query("location", self.location.as_deref())
            .with_query_list("sic_codes", &self.sic_codes)
            .with_query("size", Some(page_size))
            .with_query("start_index", start_index)
    }
}

/// Paging and register filters for the officers endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OfficerQuery {
    pub items_per_page: Option<u32>,
    pub register_type: Option<String>,
    pub register_view: Option<bool>,
    pub start_index: Option<u32>,
    pub order_by: Option<String>,
}

impl OfficerQuery {
    pub(crate) fn apply(&self, request: HttpRequest) -> HttpRequest {
        request
            .with_query("items_per_page", self.items_per_page)
            .with_query("register_type", self.register_type.as_deref())
            .with_query("register_view", self.register_view)
            .with_query("start_index", self.start_index)
            .with_query("order_by", self.order_by.as_deref())
    }
}

/// `YYYY-MM-DD`, the date format of every registry filter.
pub fn format_day(day: Date) -> String {
    day.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| day.to_string())
}
