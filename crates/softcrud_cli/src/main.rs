//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `softcrud_core` linkage with deterministic output.
//! - When `SOFTCRUD_DB_PATH` is set, open the database and report row counts
//!   for every soft-deletable table.

use log::info;
use softcrud_core::db::migrations::current_version;
use softcrud_core::db::relations::SOFT_DELETE_TABLES;
use softcrud_core::{init_logging_from_config, open_db, table_counts, CoreConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("softcrud_core ping={}", softcrud_core::ping());
    println!("softcrud_core version={}", softcrud_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("softcrud error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_logging_from_config(&config)?;

    let Some(db_path) = config.db_path.as_deref() else {
        return Ok(());
    };

    let conn = open_db(db_path).map_err(|err| err.to_string())?;
    let version = current_version(&conn).map_err(|err| err.to_string())?;
    println!("schema_version={version}");

    for &table in SOFT_DELETE_TABLES {
        let counts = table_counts(&conn, table).map_err(|err| err.to_string())?;
        println!("{table} active={} total={}", counts.active, counts.total);
    }

    info!("event=cli_report module=cli status=ok tables={}", SOFT_DELETE_TABLES.len());
    Ok(())
}
