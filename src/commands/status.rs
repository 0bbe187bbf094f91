use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::ingest::{TRACKING_TABLE, list_records, open_store, table_exists};
use crate::config::AppConfig;
use crate::datasets;
use crate::model::DatasetSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableStatus {
    pub(crate) rows: i64,
    pub(crate) first_date: Option<String>,
    pub(crate) last_date: Option<String>,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let config = AppConfig::resolve(args.overrides());

    let db_path = match config.require_store() {
        Ok(path) => path,
        Err(err) => {
            warn!(error = %err, "database file missing");
            return Ok(());
        }
    };

    let connection = open_store(db_path)?;
    info!(path = %db_path.display(), "status requested");

    if table_exists(&connection, TRACKING_TABLE)? {
        let records = list_records(&connection)?;
        info!(files = records.len(), "tracked files");
        for record in records {
            info!(
                file = %record.file_name,
                table = %record.table_name,
                last_modified = %record.last_modified,
                last_processed = %record.last_processed.unwrap_or_default(),
                "tracking record"
            );
        }
    } else {
        warn!(table = TRACKING_TABLE, "tracking table missing; run init");
    }

    for spec in datasets::all() {
        match table_status(&connection, spec)? {
            Some(status) => info!(
                dataset = spec.name,
                table = spec.table,
                rows = status.rows,
                first_date = %status.first_date.unwrap_or_default(),
                last_date = %status.last_date.unwrap_or_default(),
                "dataset status"
            ),
            None => info!(dataset = spec.name, table = spec.table, "dataset not loaded yet"),
        }
    }

    Ok(())
}

pub(crate) fn table_status(connection: &Connection, spec: &DatasetSpec) -> Result<Option<TableStatus>> {
    if !table_exists(connection, spec.table)? {
        return Ok(None);
    }

    let partition = spec.partition_column();
    let sql = format!("SELECT COUNT(*), MIN({partition}), MAX({partition}) FROM {}", spec.table);
    let status = connection
        .query_row(&sql, [], |row| {
            Ok(TableStatus {
                rows: row.get(0)?,
                first_date: row.get(1)?,
                last_date: row.get(2)?,
            })
        })
        .with_context(|| format!("failed to summarize {}", spec.table))?;
    Ok(Some(status))
}
