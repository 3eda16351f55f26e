mod init;
mod run;

use std::process::ExitCode;

use regtrack_warehouse::{Warehouse, WarehouseConfig};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let output = match &cli.command {
        Command::Run(args) => run::run(cli, args).await?,
        Command::Init => init::run(cli)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::SUCCESS)
}

fn open_warehouse(cli: &Cli) -> Result<Warehouse, CliError> {
    let config = match &cli.db_path {
        Some(path) => WarehouseConfig::at(path),
        None => WarehouseConfig::default(),
    };
    Ok(Warehouse::open(config)?)
}

type CommandOutput = Result<Value, CliError>;
