use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rusqlite::Connection;
use rusqlite::types::Value;
use rust_xlsxwriter::Workbook;
use tracing::{error, info, warn};

use crate::cli::BackupArgs;
use crate::commands::ingest::open_store;
use crate::commands::init::list_tables;
use crate::config::AppConfig;
use crate::datasets::date_column_for_table;
use crate::util::ensure_directory;

/// Integers at or above this magnitude are exported as text.
const LARGE_INTEGER: u64 = 1_000_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BackupStats {
    pub(crate) table: String,
    pub(crate) total_rows: usize,
    pub(crate) full_backup_created: bool,
    pub(crate) files_created: usize,
    pub(crate) invalid_dates: usize,
    pub(crate) errors: usize,
}

struct TableDump {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

pub fn run(args: BackupArgs) -> Result<()> {
    let config = AppConfig::resolve(args.overrides());
    let db_path = config.require_store()?;

    let connection = open_store(db_path)?;
    ensure_directory(&config.backup_dir)?;
    info!(
        db_path = %db_path.display(),
        backup_dir = %config.backup_dir.display(),
        "starting backup"
    );

    let stats = export_store(&connection, &config.backup_dir)?;

    let mut errors = 0;
    for table in &stats {
        info!(
            table = %table.table,
            rows = table.total_rows,
            full_backup = table.full_backup_created,
            date_files = table.files_created,
            invalid_dates = table.invalid_dates,
            errors = table.errors,
            "table backup"
        );
        errors += table.errors;
    }
    info!(
        tables = stats.len(),
        files = stats
            .iter()
            .map(|table| table.files_created + usize::from(table.full_backup_created))
            .sum::<usize>(),
        errors,
        "backup completed"
    );

    if errors > 0 {
        bail!("backup finished with {errors} failed export(s)");
    }
    Ok(())
}

pub(crate) fn export_store(connection: &Connection, backup_dir: &Path) -> Result<Vec<BackupStats>> {
    list_tables(connection)?
        .into_iter()
        .map(|table| export_table(connection, &table, backup_dir))
        .collect()
}

fn export_table(connection: &Connection, table: &str, backup_dir: &Path) -> Result<BackupStats> {
    let mut stats = BackupStats {
        table: table.to_string(),
        ..BackupStats::default()
    };

    let dump = read_table(connection, table)?;
    if dump.rows.is_empty() {
        warn!(table, "table is empty; nothing to back up");
        return Ok(stats);
    }
    stats.total_rows = dump.rows.len();

    let table_dir = backup_dir.join(table);
    ensure_directory(&table_dir)?;

    let full_path = table_dir.join(format!("{table}_backup_completo.xlsx"));
    match write_sheet(&full_path, &dump.columns, dump.rows.iter()) {
        Ok(()) => stats.full_backup_created = true,
        Err(err) => record_failure(&mut stats, &full_path, &err),
    }

    let Some(date_idx) = date_column_for_table(table)
        .and_then(|column| dump.columns.iter().position(|name| name == column))
    else {
        info!(table, "no date column configured; full backup only");
        return Ok(stats);
    };

    let mut by_date: BTreeMap<NaiveDate, Vec<&Vec<Value>>> = BTreeMap::new();
    for row in &dump.rows {
        match row.get(date_idx).and_then(partition_date) {
            Some(date) => by_date.entry(date).or_default().push(row),
            None => stats.invalid_dates += 1,
        }
    }
    if stats.invalid_dates > 0 {
        warn!(table, rows = stats.invalid_dates, "rows with unreadable dates skipped");
    }

    for (date, rows) in by_date {
        let path = dated_path(backup_dir, table, date);
        let written = path
            .parent()
            .map_or(Ok(()), ensure_directory)
            .and_then(|()| write_sheet(&path, &dump.columns, rows.into_iter()));
        match written {
            Ok(()) => stats.files_created += 1,
            Err(err) => record_failure(&mut stats, &path, &err),
        }
    }

    Ok(stats)
}

fn record_failure(stats: &mut BackupStats, path: &Path, err: &anyhow::Error) {
    error!(path = %path.display(), error = %format!("{err:#}"), "failed to write backup file");
    stats.errors += 1;
}

fn read_table(connection: &Connection, table: &str) -> Result<TableDump> {
    let mut statement = connection
        .prepare(&format!("SELECT * FROM {table}"))
        .with_context(|| format!("failed to read {table}"))?;
    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let width = columns.len();

    let rows = statement
        .query_map([], |row| {
            (0..width)
                .map(|idx| row.get::<_, Value>(idx))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to read rows of {table}"))?;

    Ok(TableDump { columns, rows })
}

/// Both stored date layouts start with `YYYY-MM-DD`.
fn partition_date(value: &Value) -> Option<NaiveDate> {
    let Value::Text(text) = value else {
        return None;
    };
    let day = text.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn dated_path(backup_dir: &Path, table: &str, date: NaiveDate) -> PathBuf {
    backup_dir
        .join(table)
        .join(date.format("%Y").to_string())
        .join(date.format("%m").to_string())
        .join(format!("{table}_{}.xlsx", date.format("%Y-%m-%d")))
}

fn write_sheet<'r>(
    path: &Path,
    columns: &[String],
    rows: impl Iterator<Item = &'r Vec<Value>>,
) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in columns.iter().enumerate() {
        worksheet.write_string(0, column_index(col)?, name)?;
    }

    for (row_idx, row) in rows.enumerate() {
        let row_num = u32::try_from(row_idx + 1).context("too many rows for one worksheet")?;
        for (col, value) in row.iter().enumerate() {
            let col = column_index(col)?;
            match value {
                Value::Null => {}
                Value::Integer(number) if number.unsigned_abs() >= LARGE_INTEGER => {
                    worksheet.write_string(row_num, col, number.to_string())?;
                }
                Value::Integer(number) => {
                    worksheet.write_number(row_num, col, *number as f64)?;
                }
                Value::Real(number) => {
                    worksheet.write_number(row_num, col, *number)?;
                }
                Value::Text(text) => {
                    worksheet.write_string(row_num, col, text)?;
                }
                Value::Blob(bytes) => {
                    worksheet.write_string(row_num, col, String::from_utf8_lossy(bytes))?;
                }
            }
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    Ok(())
}

fn column_index(idx: usize) -> Result<u16> {
    u16::try_from(idx).context("too many columns for one worksheet")
}
