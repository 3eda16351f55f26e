use std::fmt::Display;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{error, info};

use crate::collector::{date_window, LeadCollector};
use crate::config::TrackerConfig;
use crate::domain::{format_timestamp, CompanyNumber, CompanyRecord, RunLog, RunLogKey};
use crate::enrichment::EnrichmentStage;
use crate::error::{FailureCategory, PipelineError};
use crate::notify::{notify_best_effort, Notifier};
use crate::registry::RegistryClient;
use crate::sink::{LeadRow, LeadSink};
use crate::validator::LeadValidator;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub log: RunLog,
    pub leads: Vec<CompanyRecord>,
    pub problem_ids: Vec<CompanyNumber>,
}

/// One end-to-end lead run: collect, validate, export, enrich, export, log.
pub struct LeadRun {
    client: RegistryClient,
    config: TrackerConfig,
    notifier: Arc<dyn Notifier>,
}

impl LeadRun {
    pub fn new(client: RegistryClient, config: TrackerConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            config,
            notifier,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub async fn execute(&self, sink: &mut dyn LeadSink) -> Result<RunReport, PipelineError> {
        self.execute_from(sink, OffsetDateTime::now_utc()).await
    }

    /// Runs as if started at `started_at`; the date window ends on its date.
    pub async fn execute_from(
        &self,
        sink: &mut dyn LeadSink,
        started_at: OffsetDateTime,
    ) -> Result<RunReport, PipelineError> {
        let mut log = RunLog::start_at(started_at);
        let run_added_ts = format_timestamp(started_at);
        info!(run_start = %run_added_ts, "lead run started");

        let setup = sink.ensure_tables()?;
        if setup.leads_created || setup.log_created {
            info!(
                leads_created = setup.leads_created,
                log_created = setup.log_created,
                "created missing tables"
            );
        }
        let known = sink.known_identifiers()?;
        info!(known = known.len(), "loaded known companies");

        let search = &self.config.search;
        let dates = date_window(started_at.date(), search.max_age_days);
        let collected = LeadCollector::new(&self.client, search.page_size)
            .collect(&dates, &search.filters, &mut log)
            .await?;

        let validation = &self.config.validation;
        let validated = LeadValidator::new(&self.client, &validation.excluded_status_details)
            .validate(collected, &known, validation.check_detailed_status, &mut log)
            .await?;

        let interim: Vec<LeadRow> = validated
            .iter()
            .map(|record| LeadRow::from_record(record, started_at))
            .collect();
        sink.append_leads(&interim)?;
        log.record_timestamp(RunLogKey::InterimUpdate);
        info!(rows = interim.len(), "interim leads exported");

        let outcome = EnrichmentStage::new(&self.client, &search.officers, self.notifier.as_ref())
            .enrich(validated, &mut log)
            .await?;
        sink.update_officer_summaries(&run_added_ts, &outcome.officer_summaries())?;

        log.record_timestamp(RunLogKey::RunFinished);
        sink.append_log(&log.to_row())?;
        info!(leads = outcome.records.len(), "lead run finished");

        Ok(RunReport {
            log,
            leads: outcome.records,
            problem_ids: outcome.problem_ids,
        })
    }

    /// Runs and reports to the operator: a summary when the run completes,
    /// or exactly one message naming the failure category when it does not.
    pub async fn run_and_notify(&self, sink: &mut dyn LeadSink) -> Result<RunReport, PipelineError> {
        match self.execute(sink).await {
            Ok(report) => {
                notify_best_effort(self.notifier.as_ref(), &summary_message(&report)).await;
                Ok(report)
            }
            Err(err) => {
                error!(category = %err.category(), error = %err, "lead run aborted");
                notify_best_effort(self.notifier.as_ref(), &failure_message(&err)).await;
                Err(err)
            }
        }
    }
}

/// Body of the single notification sent for an aborted run. Starts with the
/// category label.
pub fn failure_message(err: &PipelineError) -> String {
    failure_notice(err.category(), err)
}

/// `"{category}: {detail}"` followed by the category's operator hint.
pub fn failure_notice(category: FailureCategory, detail: &dyn Display) -> String {
    format!("{category}: {detail}\n{}", category.hint())
}

pub fn summary_message(report: &RunReport) -> String {
    let mut message = format!("Lead run finished with {} new lead(s).", report.leads.len());
    if !report.problem_ids.is_empty() {
        message.push_str(&format!(
            " {} without officer data.",
            report.problem_ids.len()
        ));
    }
    message.push('\n');
    message.push_str(&report.log.summary());
    message
}
