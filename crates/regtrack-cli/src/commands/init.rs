use serde_json::json;
use tracing::info;

use super::{open_warehouse, CommandOutput};
use crate::cli::Cli;

pub fn run(cli: &Cli) -> CommandOutput {
    let warehouse = open_warehouse(cli)?;
    let status = warehouse.ensure_tables()?;
    info!(
        db_path = %warehouse.db_path().display(),
        leads_created = status.leads_created,
        run_log_created = status.run_log_created,
        "tables ready"
    );

    Ok(json!({
        "db_path": warehouse.db_path().display().to_string(),
        "leads_created": status.leads_created,
        "run_log_created": status.run_log_created,
        "leads": warehouse.lead_count()?,
        "runs": warehouse.run_count()?,
    }))
}
