use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::CompanyNumber;

/// Registered office address as returned by the registry.
///
/// Field order is the order used when flattening for export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredAddress {
    #[serde(default)]
    pub premises: Option<String>,
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub address_line_2: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl RegisteredAddress {
    /// Present, non-blank parts joined by `", "`.
    pub fn display_string(&self) -> String {
        [
            &self.premises,
            &self.address_line_1,
            &self.address_line_2,
            &self.locality,
            &self.region,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// One company returned by the advanced search; the unit of a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company_number: CompanyNumber,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_status: Option<String>,
    #[serde(default)]
    pub company_type: Option<String>,
    /// `YYYY-MM-DD`, as returned by the registry.
    #[serde(default)]
    pub date_of_creation: Option<String>,
    #[serde(default)]
    pub registered_office_address: RegisteredAddress,
    #[serde(default)]
    pub sic_codes: Vec<String>,
    /// Filled by the enrichment stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub officer_summary: Option<String>,
}

impl CompanyRecord {
    pub fn new(company_number: CompanyNumber, company_name: impl Into<String>) -> Self {
        Self {
            company_number,
            company_name: company_name.into(),
            company_status: None,
            company_type: None,
            date_of_creation: None,
            registered_office_address: RegisteredAddress::default(),
            sic_codes: Vec::new(),
            officer_summary: None,
        }
    }

    pub fn id(&self) -> &CompanyNumber {
        &self.company_number
    }

    pub fn address_string(&self) -> String {
        self.registered_office_address.display_string()
    }

    pub fn sic_codes_string(&self) -> String {
        self.sic_codes.join(", ")
    }
}

/// Advanced search response page.
///
/// Items decode one at a time: a row without a usable company number is
/// logged and left out, the rest of the page is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawSearchPage")]
pub struct SearchPage {
    pub items: Vec<CompanyRecord>,
    pub hits: Option<u64>,
}

#[derive(Deserialize)]
struct RawSearchPage {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    hits: Option<u64>,
}

impl From<RawSearchPage> for SearchPage {
    fn from(raw: RawSearchPage) -> Self {
        let items = raw
            .items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(error) => {
                    warn!(index, %error, "skipping unreadable search item");
                    None
                }
            })
            .collect();
        Self {
            items,
            hits: raw.hits,
        }
    }
}

/// Company profile response; only the fields the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompanyProfile {
    #[serde(default)]
    pub company_number: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_status: Option<String>,
    /// Secondary status, e.g. `active-proposal-to-strike-off`. Often absent.
    #[serde(default)]
    pub company_status_detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Officer {
    pub officer_role: String,
    pub name: String,
    #[serde(default)]
    pub appointed_on: Option<String>,
    #[serde(default)]
    pub resigned_on: Option<String>,
}

/// Officers response. `items` is required: a body without it is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OfficerList {
    pub items: Vec<Officer>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

impl OfficerList {
    /// `"{role}: {name}"` pairs joined by `"; "`.
    pub fn summary(&self) -> String {
        self.items
            .iter()
            .map(|officer| format!("{}: {}", officer.officer_role, officer.name))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
