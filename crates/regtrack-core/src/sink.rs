//! Contract of the external lead table store.
//!
//! The store holds two tables: one row per lead ([`LEAD_COLUMNS`]) and one row
//! per run ([`LOG_COLUMNS`]). Implementations live outside the core.

use time::OffsetDateTime;

use crate::domain::{format_timestamp, CompanyNumber, CompanyRecord, KnownIdentifierSet, RunLogKey};
use crate::error::SinkError;

pub const LEAD_COLUMNS: [&str; 8] = [
    "company_name",
    "company_number",
    "address_string",
    "date_of_creation",
    "company_type",
    "sic_codes_string",
    "run_added_ts",
    "company_officer_names",
];

pub const LOG_COLUMNS: [&str; 8] = [
    RunLogKey::RunStart.as_str(),
    RunLogKey::CompaniesCollected.as_str(),
    RunLogKey::DataCollectionDone.as_str(),
    RunLogKey::ValidatedCompanies.as_str(),
    RunLogKey::ValidationDone.as_str(),
    RunLogKey::InterimUpdate.as_str(),
    RunLogKey::FollowUpDone.as_str(),
    RunLogKey::RunFinished.as_str(),
];

/// Which tables `ensure_tables` had to create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableSetup {
    pub leads_created: bool,
    pub log_created: bool,
}

/// One leads-table row, flattened for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadRow {
    pub company_name: String,
    pub company_number: CompanyNumber,
    pub address_string: String,
    pub date_of_creation: String,
    pub company_type: String,
    pub sic_codes_string: String,
    pub run_added_ts: String,
    pub company_officer_names: String,
}

impl LeadRow {
    pub fn from_record(record: &CompanyRecord, run_added: OffsetDateTime) -> Self {
        Self {
            company_name: record.company_name.clone(),
            company_number: record.id().clone(),
            address_string: record.address_string(),
            date_of_creation: record.date_of_creation.clone().unwrap_or_default(),
            company_type: record.company_type.clone().unwrap_or_default(),
            sic_codes_string: record.sic_codes_string(),
            run_added_ts: format_timestamp(run_added),
            company_officer_names: record.officer_summary.clone().unwrap_or_default(),
        }
    }

    /// Cells in [`LEAD_COLUMNS`] order.
    pub fn to_columns(&self) -> [&str; 8] {
        [
            self.company_name.as_str(),
            self.company_number.as_str(),
            self.address_string.as_str(),
            self.date_of_creation.as_str(),
            self.company_type.as_str(),
            self.sic_codes_string.as_str(),
            self.run_added_ts.as_str(),
            self.company_officer_names.as_str(),
        ]
    }
}

/// External table store. Calls are synchronous and made from the run task.
pub trait LeadSink {
    fn ensure_tables(&mut self) -> Result<TableSetup, SinkError>;

    /// Identifiers of every lead already stored.
    fn known_identifiers(&self) -> Result<KnownIdentifierSet, SinkError>;

    fn append_leads(&mut self, rows: &[LeadRow]) -> Result<(), SinkError>;

    /// Fills the officer column of the rows added by the run started at
    /// `run_added_ts`.
    fn update_officer_summaries(
        &mut self,
        run_added_ts: &str,
        summaries: &[(CompanyNumber, String)],
    ) -> Result<(), SinkError>;

    /// `row` follows [`LOG_COLUMNS`].
    fn append_log(&mut self, row: &[String]) -> Result<(), SinkError>;
}
