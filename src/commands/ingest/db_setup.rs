use super::*;

pub(crate) fn open_store(db_path: &Path) -> Result<Connection> {
    ensure_parent_directory(db_path)?;

    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub(crate) fn table_exists(connection: &Connection, table_name: &str) -> Result<bool> {
    let exists = connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table_name],
            |row| row.get::<_, bool>(0),
        )
        .with_context(|| format!("failed to look up table {table_name}"))?;
    Ok(exists)
}

fn dataset_table_sql(spec: &DatasetSpec) -> String {
    let mut definitions = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    definitions.extend(
        spec.columns
            .iter()
            .map(|column| format!("{} {}", column.column, column.coercion.sql_type())),
    );
    if let PartitionKey::FileReportingDate(column) = spec.partition_key {
        definitions.push(format!("{column} TEXT"));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        spec.table,
        definitions.join(",\n  ")
    )
}

pub(super) fn ensure_dataset_table(connection: &Connection, spec: &DatasetSpec) -> Result<()> {
    connection
        .execute(&dataset_table_sql(spec), [])
        .with_context(|| format!("failed to create table {}", spec.table))?;

    let partition = spec.partition_column();
    connection
        .execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{partition} ON {table}({partition})",
                table = spec.table
            ),
            [],
        )
        .with_context(|| format!("failed to index {}.{partition}", spec.table))?;

    Ok(())
}
