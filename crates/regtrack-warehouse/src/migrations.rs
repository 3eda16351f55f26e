use ::duckdb::Connection;

pub const LEADS_TABLE: &str = "leads";
pub const RUN_LOG_TABLE: &str = "run_log";

struct TableDefinition {
    name: &'static str,
    sql: &'static str,
}

const TABLES: &[TableDefinition] = &[
    TableDefinition {
        name: LEADS_TABLE,
        sql: r#"
CREATE TABLE IF NOT EXISTS leads (
    company_name TEXT,
    company_number TEXT NOT NULL,
    address_string TEXT,
    date_of_creation TEXT,
    company_type TEXT,
    sic_codes_string TEXT,
    run_added_ts TEXT NOT NULL,
    company_officer_names TEXT
);
"#,
    },
    TableDefinition {
        name: RUN_LOG_TABLE,
        sql: r#"
CREATE TABLE IF NOT EXISTS run_log (
    run_start_ts TEXT,
    companies_collected TEXT,
    data_collection_done_ts TEXT,
    validated_companies TEXT,
    validation_done_ts TEXT,
    interim_update_ts TEXT,
    follow_up_done_ts TEXT,
    run_finished_ts TEXT
);
"#,
    },
];

/// Creates missing tables and returns the names of the ones it created.
pub fn ensure_tables(connection: &Connection) -> Result<Vec<&'static str>, ::duckdb::Error> {
    let mut created = Vec::new();
    for table in TABLES {
        if !table_exists(connection, table.name)? {
            connection.execute_batch(table.sql)?;
            created.push(table.name);
        }
    }
    Ok(created)
}

pub fn table_exists(connection: &Connection, name: &str) -> Result<bool, ::duckdb::Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
