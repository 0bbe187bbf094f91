use rusqlite::params_from_iter;

use super::*;

/// Current-month-anchored datasets anchor on the run date even when the file
/// names a reporting date; snapshot datasets anchor on the reporting date.
pub(super) fn open_window(
    policy: WindowPolicy,
    reporting_date: Option<NaiveDate>,
    run_date: NaiveDate,
) -> MonthWindow {
    match policy {
        WindowPolicy::CurrentMonthAnchored => MonthWindow::trailing(run_date),
        WindowPolicy::SnapshotAnchored => MonthWindow::single(reporting_date.unwrap_or(run_date)),
    }
}

pub(super) fn delete_window(
    connection: &Connection,
    spec: &DatasetSpec,
    window: &MonthWindow,
) -> Result<usize> {
    let partition = spec.partition_column();
    let sql = format!(
        "DELETE FROM {} WHERE {partition} >= ?1 AND {partition} < ?2",
        spec.table
    );
    let deleted = connection
        .execute(&sql, params![window.start_text(), window.end_text()])
        .with_context(|| {
            format!(
                "failed to clear {} window [{}, {})",
                spec.table,
                window.start_text(),
                window.end_text()
            )
        })?;
    Ok(deleted)
}

pub(super) fn insert_batch(
    connection: &Connection,
    table: &str,
    batch: &TransformedBatch,
) -> Result<usize> {
    if batch.columns.is_empty() || batch.rows.is_empty() {
        return Ok(0);
    }

    let placeholders = (1..=batch.columns.len())
        .map(|idx| format!("?{idx}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {table}({}) VALUES({placeholders})",
        batch.columns.join(", ")
    );

    let mut statement = connection
        .prepare(&sql)
        .with_context(|| format!("failed to prepare insert into {table}"))?;
    for (row_idx, row) in batch.rows.iter().enumerate() {
        statement
            .execute(params_from_iter(row.iter()))
            .with_context(|| format!("failed to insert row {} into {table}", row_idx + 1))?;
    }

    Ok(batch.rows.len())
}
