use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::domain::{CompanyNumber, CompanyRecord, KnownIdentifierSet, RunLog, RunLogKey};
use crate::error::PipelineError;
use crate::registry::{Lookup, RegistryClient};

/// Drops already-tracked companies and, optionally, companies whose detailed
/// status is in the exclusion set.
pub struct LeadValidator<'a> {
    client: &'a RegistryClient,
    excluded_status_details: &'a BTreeSet<String>,
}

impl<'a> LeadValidator<'a> {
    pub fn new(client: &'a RegistryClient, excluded_status_details: &'a BTreeSet<String>) -> Self {
        Self {
            client,
            excluded_status_details,
        }
    }

    /// Input order is preserved and a repeated identifier is kept once (first
    /// occurrence). Profiles are only fetched when `check_detailed_status` is
    /// set, and only for records that are not already known.
    pub async fn validate(
        &self,
        records: Vec<CompanyRecord>,
        known: &KnownIdentifierSet,
        check_detailed_status: bool,
        log: &mut RunLog,
    ) -> Result<Vec<CompanyRecord>, PipelineError> {
        let collected = records.len();
        let mut seen: HashSet<CompanyNumber> = HashSet::with_capacity(collected);
        let mut valid = Vec::with_capacity(collected);

        for record in records {
            if !seen.insert(record.id().clone()) {
                debug!(company_number = %record.id(), "duplicate search result skipped");
                continue;
            }
            if known.contains(record.id()) {
                continue;
            }
            if check_detailed_status && self.is_excluded(record.id()).await? {
                debug!(company_number = %record.id(), "excluded by status detail");
                continue;
            }
            valid.push(record);
        }

        if valid.is_empty() {
            return Err(PipelineError::NoValidLeads { collected });
        }

        log.record_count(RunLogKey::ValidatedCompanies, valid.len());
        log.record_timestamp(RunLogKey::ValidationDone);
        info!(collected, validated = valid.len(), "validation done");
        Ok(valid)
    }

    async fn is_excluded(&self, id: &CompanyNumber) -> Result<bool, PipelineError> {
        let detail = match self.client.get_company(id).await? {
            Lookup::Found(profile) => profile.company_status_detail,
            Lookup::NotFound => None,
        };
        Ok(detail.is_some_and(|detail| self.excluded_status_details.contains(&detail)))
    }
}
