use tracing::{debug, info, warn};

use crate::domain::{format_timestamp, CompanyNumber, CompanyRecord, RunLog, RunLogKey};
use crate::error::PipelineError;
use crate::notify::{notify_best_effort, Notifier};
use crate::registry::{Lookup, OfficerQuery, RegistryClient};

/// Enriched records plus the identifiers whose officers could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentOutcome {
    pub records: Vec<CompanyRecord>,
    pub problem_ids: Vec<CompanyNumber>,
}

impl EnrichmentOutcome {
    /// `(id, summary)` pairs for the officer column update.
    pub fn officer_summaries(&self) -> Vec<(CompanyNumber, String)> {
        self.records
            .iter()
            .map(|record| {
                (
                    record.id().clone(),
                    record.officer_summary.clone().unwrap_or_default(),
                )
            })
            .collect()
    }
}

/// Attaches an officer summary to every validated record.
///
/// A single company failing (404, undecodable body, transport failure after
/// retries) leaves that company's summary empty and the batch continues. Only
/// run-level failures (bad request, credentials, upstream outage, rate limit)
/// abort.
pub struct EnrichmentStage<'a> {
    client: &'a RegistryClient,
    query: &'a OfficerQuery,
    notifier: &'a dyn Notifier,
}

impl<'a> EnrichmentStage<'a> {
    pub fn new(client: &'a RegistryClient, query: &'a OfficerQuery, notifier: &'a dyn Notifier) -> Self {
        Self {
            client,
            query,
            notifier,
        }
    }

    pub async fn enrich(
        &self,
        records: Vec<CompanyRecord>,
        log: &mut RunLog,
    ) -> Result<EnrichmentOutcome, PipelineError> {
        let mut enriched = Vec::with_capacity(records.len());
        let mut problem_ids = Vec::new();

        for mut record in records {
            let summary = match self.client.get_officers(record.id(), self.query).await {
                Ok(Lookup::Found(officers)) => officers.summary(),
                Ok(Lookup::NotFound) => {
                    debug!(company_number = %record.id(), "no officer data");
                    problem_ids.push(record.id().clone());
                    String::new()
                }
                Err(error) if error.kind().is_record_level() => {
                    warn!(company_number = %record.id(), %error, "officer lookup failed; skipping company");
                    problem_ids.push(record.id().clone());
                    String::new()
                }
                Err(error) => return Err(error.into()),
            };
            record.officer_summary = Some(summary);
            enriched.push(record);
        }

        if !problem_ids.is_empty() {
            warn!(count = problem_ids.len(), "companies without officer data");
            let message = problem_report(log, &problem_ids);
            notify_best_effort(self.notifier, &message).await;
        }

        log.record_timestamp(RunLogKey::FollowUpDone);
        info!(
            enriched = enriched.len(),
            problems = problem_ids.len(),
            "officer follow-up done"
        );
        Ok(EnrichmentOutcome {
            records: enriched,
            problem_ids,
        })
    }
}

fn problem_report(log: &RunLog, problem_ids: &[CompanyNumber]) -> String {
    let ids = problem_ids
        .iter()
        .map(CompanyNumber::as_str)
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "The following companies did not return officer data during the {} run:\n{ids}",
        format_timestamp(log.started_at())
    )
}
