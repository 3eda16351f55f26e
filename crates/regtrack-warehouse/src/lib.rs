//! # Regtrack Warehouse
//!
//! DuckDB-backed lead store for regtrack.
//!
//! ## Overview
//!
//! Holds the two tables a lead run reads and appends to. All values are
//! passed as statement parameters; multi-row writes run in one transaction.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use regtrack_warehouse::{Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::default())?;
//!     let status = warehouse.ensure_tables()?;
//!     println!("leads table created: {}", status.leads_created);
//!     println!("{} leads tracked", warehouse.lead_count()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `leads` | One row per tracked company, stamped with the run that added it |
//! | `run_log` | One row per completed run: stage timestamps and counters |

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};
pub use migrations::{LEADS_TABLE, RUN_LOG_TABLE};

/// Number of cells in a `run_log` row.
pub const RUN_LOG_WIDTH: usize = 8;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{table} row has {actual} cells, expected {expected}")]
    InvalidRow {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for regtrack data.
    pub regtrack_home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl WarehouseConfig {
    /// Database at `db_path`, with the home directory set to its parent.
    pub fn at(db_path: impl Into<PathBuf>) -> Self {
        let db_path = db_path.into();
        let regtrack_home = db_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            regtrack_home,
            db_path,
            max_pool_size: 2,
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let regtrack_home = resolve_regtrack_home();
        let db_path = regtrack_home.join("leads.duckdb");
        Self {
            regtrack_home,
            db_path,
            max_pool_size: 2,
        }
    }
}

/// Which tables [`Warehouse::ensure_tables`] had to create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStatus {
    pub leads_created: bool,
    pub run_log_created: bool,
}

/// One `leads` row. Empty strings are stored as NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadRecord {
    pub company_name: String,
    pub company_number: String,
    pub address_string: String,
    pub date_of_creation: String,
    pub company_type: String,
    pub sic_codes_string: String,
    pub run_added_ts: String,
    pub company_officer_names: String,
}

#[derive(Debug, Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Opens (or creates) the database file. Tables are created by
    /// [`Warehouse::ensure_tables`].
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        // Fail on open rather than on first use.
        drop(manager.acquire()?);
        Ok(Self { config, manager })
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn ensure_tables(&self) -> Result<TableStatus, WarehouseError> {
        let connection = self.manager.acquire()?;
        let created = migrations::ensure_tables(&connection)?;
        Ok(TableStatus {
            leads_created: created.contains(&LEADS_TABLE),
            run_log_created: created.contains(&RUN_LOG_TABLE),
        })
    }

    /// Every stored company number, in insertion order.
    pub fn company_numbers(&self) -> Result<Vec<String>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare("SELECT company_number FROM leads")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(WarehouseError::from)
    }

    pub fn lead_count(&self) -> Result<u64, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 = connection.query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn run_count(&self) -> Result<u64, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM run_log", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn append_leads(&self, rows: &[LeadRecord]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                let params: [&dyn ToSql; 8] = [
                    &non_empty(&row.company_name),
                    &row.company_number,
                    &non_empty(&row.address_string),
                    &non_empty(&row.date_of_creation),
                    &non_empty(&row.company_type),
                    &non_empty(&row.sic_codes_string),
                    &row.run_added_ts,
                    &non_empty(&row.company_officer_names),
                ];
                connection.execute(
                    "INSERT INTO leads \
                     (company_name, company_number, address_string, date_of_creation, \
                      company_type, sic_codes_string, run_added_ts, company_officer_names) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    params.as_slice(),
                )?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Sets the officer column of rows added by the run `run_added_ts`.
    /// Returns how many rows changed.
    pub fn update_officer_names(
        &self,
        run_added_ts: &str,
        officers: &[(String, String)],
    ) -> Result<usize, WarehouseError> {
        if officers.is_empty() {
            return Ok(0);
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut updated = 0;
            for (company_number, names) in officers {
                let params: [&dyn ToSql; 3] = [&non_empty(names), company_number, &run_added_ts];
                updated += connection.execute(
                    "UPDATE leads SET company_officer_names = ? \
                     WHERE company_number = ? AND run_added_ts = ?",
                    params.as_slice(),
                )?;
            }
            Ok(updated)
        })();

        finalize_transaction(&connection, result)
    }

    /// Appends one `run_log` row of exactly [`RUN_LOG_WIDTH`] cells.
    pub fn append_run_log(&self, row: &[String]) -> Result<(), WarehouseError> {
        if row.len() != RUN_LOG_WIDTH {
            return Err(WarehouseError::InvalidRow {
                table: RUN_LOG_TABLE,
                expected: RUN_LOG_WIDTH,
                actual: row.len(),
            });
        }

        let cells: Vec<Option<&str>> = row.iter().map(|cell| non_empty(cell)).collect();
        let params: Vec<&dyn ToSql> = cells.iter().map(|cell| cell as &dyn ToSql).collect();
        let connection = self.manager.acquire()?;
        connection.execute(
            "INSERT INTO run_log \
             (run_start_ts, companies_collected, data_collection_done_ts, validated_companies, \
              validation_done_ts, interim_update_ts, follow_up_done_ts, run_finished_ts) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// Officer column of one stored lead; `None` when unset or unknown.
    pub fn officer_names(&self, company_number: &str) -> Result<Option<String>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection
            .prepare("SELECT company_officer_names FROM leads WHERE company_number = ? LIMIT 1")?;
        let mut rows = statement.query_map([company_number], |row| row.get::<_, Option<String>>(0))?;
        match rows.next() {
            Some(value) => Ok(value?),
            None => Ok(None),
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn resolve_regtrack_home() -> PathBuf {
    if let Some(path) = env::var_os("REGTRACK_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".regtrack");
    }

    PathBuf::from(".regtrack")
}
