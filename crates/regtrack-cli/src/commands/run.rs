use std::sync::Arc;

use regtrack_core::{
    failure_notice, format_timestamp, notify_best_effort, FailureCategory, HttpClient, LeadRun,
    LogNotifier, NotificationSettings, Notifier, RegistryClient, ReqwestHttpClient, SmtpNotifier,
    TrackerConfig, WebhookNotifier,
};
use regtrack_warehouse::Warehouse;
use serde_json::json;

use super::{open_warehouse, CommandOutput};
use crate::cli::{Cli, RunArgs};
use crate::error::CliError;
use crate::lock::RunLock;
use crate::settings;
use crate::sink::WarehouseSink;

pub async fn run(cli: &Cli, args: &RunArgs) -> CommandOutput {
    let mut config = settings::load(cli.config.as_deref())?;
    apply_overrides(&mut config, args);
    config.validate()?;

    let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let notifier = notifier_for(&config.notification, Arc::clone(&http_client))?;

    let (warehouse, _lock) = match open_store(cli) {
        Ok(store) => store,
        Err(error) => {
            report_store_failure(notifier.as_ref(), &error).await;
            return Err(error);
        }
    };

    let client = RegistryClient::from_settings(http_client, &config.registry);
    let lead_run = LeadRun::new(client, config, notifier);

    let mut sink = WarehouseSink::new(warehouse);
    let report = lead_run.run_and_notify(&mut sink).await?;

    Ok(json!({
        "run_start_ts": format_timestamp(report.log.started_at()),
        "new_leads": report.leads.len(),
        "problem_ids": report
            .problem_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        "log": report.log.to_row(),
    }))
}

fn apply_overrides(config: &mut TrackerConfig, args: &RunArgs) {
    if let Some(days) = args.max_age_days {
        config.search.max_age_days = days;
    }
    if args.check_detailed_status {
        config.validation.check_detailed_status = true;
    }
}

/// SMTP when configured, then the webhook, then the log.
fn notifier_for(
    settings: &NotificationSettings,
    http_client: Arc<dyn HttpClient>,
) -> Result<Arc<dyn Notifier>, CliError> {
    if let (Some(smtp), Some(recipient)) = (&settings.smtp, &settings.recipient) {
        return Ok(Arc::new(SmtpNotifier::from_settings(smtp, recipient)?));
    }
    Ok(match &settings.webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(http_client, url).with_recipient(settings.recipient.clone()),
        ),
        None => Arc::new(LogNotifier::new(settings.recipient.clone())),
    })
}

/// Opens the warehouse and takes the run lock next to it.
fn open_store(cli: &Cli) -> Result<(Warehouse, RunLock), CliError> {
    let warehouse = open_warehouse(cli)?;
    let lock = RunLock::acquire(warehouse.db_path().with_extension("lock"))?;
    Ok((warehouse, lock))
}

async fn report_store_failure(notifier: &dyn Notifier, error: &CliError) {
    let category = match error {
        CliError::RunInProgress { .. } => FailureCategory::RunInProgress,
        _ => FailureCategory::Sink,
    };
    tracing::error!(%category, %error, "lead run did not start");
    notify_best_effort(notifier, &failure_notice(category, error)).await;
}
