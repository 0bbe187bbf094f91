use anyhow::{Context, Result};
use tracing::info;

use crate::cli::InitArgs;
use crate::commands::ingest::{ensure_tracking_schema, open_store};
use crate::config::AppConfig;

pub fn run(args: InitArgs) -> Result<()> {
    let config = AppConfig::resolve(args.overrides());

    let connection = open_store(&config.db_path)?;
    ensure_tracking_schema(&connection)?;

    let tables = list_tables(&connection)?;
    info!(
        path = %config.db_path.display(),
        tables = %tables.join(","),
        "database initialized"
    );

    Ok(())
}

pub(crate) fn list_tables(connection: &rusqlite::Connection) -> Result<Vec<String>> {
    let mut statement = connection.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let tables = statement
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to list tables")?;
    Ok(tables)
}
