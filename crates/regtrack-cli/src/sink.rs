//! [`LeadSink`] over the DuckDB warehouse.

use regtrack_core::{
    CompanyNumber, KnownIdentifierSet, LeadRow, LeadSink, SinkError, TableSetup,
};
use regtrack_warehouse::{LeadRecord, Warehouse, WarehouseError};
use tracing::debug;

pub struct WarehouseSink {
    warehouse: Warehouse,
}

impl WarehouseSink {
    pub fn new(warehouse: Warehouse) -> Self {
        Self { warehouse }
    }
}

fn sink_error(error: WarehouseError) -> SinkError {
    SinkError::new(error.to_string())
}

impl LeadSink for WarehouseSink {
    fn ensure_tables(&mut self) -> Result<TableSetup, SinkError> {
        let status = self.warehouse.ensure_tables().map_err(sink_error)?;
        Ok(TableSetup {
            leads_created: status.leads_created,
            log_created: status.run_log_created,
        })
    }

    fn known_identifiers(&self) -> Result<KnownIdentifierSet, SinkError> {
        let numbers = self.warehouse.company_numbers().map_err(sink_error)?;
        let known = KnownIdentifierSet::from_raw(&numbers);
        if known.len() < numbers.len() {
            debug!(
                stored = numbers.len(),
                usable = known.len(),
                "ignored duplicate or malformed stored company numbers"
            );
        }
        Ok(known)
    }

    fn append_leads(&mut self, rows: &[LeadRow]) -> Result<(), SinkError> {
        let records: Vec<LeadRecord> = rows
            .iter()
            .map(|row| LeadRecord {
                company_name: row.company_name.clone(),
                company_number: row.company_number.to_string(),
                address_string: row.address_string.clone(),
                date_of_creation: row.date_of_creation.clone(),
                company_type: row.company_type.clone(),
                sic_codes_string: row.sic_codes_string.clone(),
                run_added_ts: row.run_added_ts.clone(),
                company_officer_names: row.company_officer_names.clone(),
            })
            .collect();
        self.warehouse.append_leads(&records).map_err(sink_error)
    }

    fn update_officer_summaries(
        &mut self,
        run_added_ts: &str,
        summaries: &[(CompanyNumber, String)],
    ) -> Result<(), SinkError> {
        let updates: Vec<(String, String)> = summaries
            .iter()
            .map(|(id, summary)| (id.to_string(), summary.clone()))
            .collect();
        let updated = self
            .warehouse
            .update_officer_names(run_added_ts, &updates)
            .map_err(sink_error)?;
        debug!(updated, "officer column updated");
        Ok(())
    }

    fn append_log(&mut self, row: &[String]) -> Result<(), SinkError> {
        self.warehouse.append_run_log(row).map_err(sink_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regtrack_core::{CompanyRecord, RunLog, RunLogKey};
    use regtrack_warehouse::WarehouseConfig;
    use tempfile::tempdir;
    use time::macros::datetime;

    #[test]
    fn run_round_trips_through_the_warehouse() {
        let temp = tempdir().expect("tempdir");
        let warehouse =
            Warehouse::open(WarehouseConfig::at(temp.path().join("leads.duckdb"))).expect("open");
        let mut sink = WarehouseSink::new(warehouse.clone());

        let setup = sink.ensure_tables().expect("setup");
        assert!(setup.leads_created && setup.log_created);
        assert!(sink.known_identifiers().expect("known").is_empty());

        let started = datetime!(2024-01-20 06:00:00 UTC);
        let id = CompanyNumber::parse("15400001").expect("id");
        let record = CompanyRecord::new(id.clone(), "NOODLE BAR LTD");
        let row = LeadRow::from_record(&record, started);
        sink.append_leads(std::slice::from_ref(&row)).expect("append");
        sink.update_officer_summaries(&row.run_added_ts, &[(id.clone(), String::from("director: Jane Doe"))])
            .expect("update");

        let mut log = RunLog::start_at(started);
        log.record_count(RunLogKey::CompaniesCollected, 1);
        sink.append_log(&log.to_row()).expect("log");

        assert!(sink.known_identifiers().expect("known").contains(&id));
        assert_eq!(
            warehouse.officer_names("15400001").expect("officers").as_deref(),
            Some("director: Jane Doe")
        );
        assert_eq!(warehouse.run_count().expect("runs"), 1);
    }
}
