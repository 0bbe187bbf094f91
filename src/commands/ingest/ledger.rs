use super::*;

pub(crate) const TRACKING_TABLE: &str = "tb_rastreamento_arquivos";

pub(crate) fn ensure_tracking_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tb_rastreamento_arquivos (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              nome_arquivo TEXT NOT NULL UNIQUE,
              nome_tabela TEXT NOT NULL,
              ultima_modificacao TEXT NOT NULL,
              ultimo_processamento TEXT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_rastreamento_nome_arquivo
              ON tb_rastreamento_arquivos(nome_arquivo);
            ",
        )
        .context("failed to initialize tracking table")?;
    Ok(())
}

pub(super) fn find_record(
    connection: &Connection,
    file_name: &str,
) -> Result<Option<TrackingRecord>> {
    let record = connection
        .query_row(
            "
            SELECT nome_arquivo, nome_tabela, ultima_modificacao, ultimo_processamento
            FROM tb_rastreamento_arquivos
            WHERE nome_arquivo = ?1
            ",
            [file_name],
            row_to_record,
        )
        .optional()
        .with_context(|| format!("failed to read tracking record for {file_name}"))?;
    Ok(record)
}

pub(crate) fn list_records(connection: &Connection) -> Result<Vec<TrackingRecord>> {
    let mut statement = connection.prepare(
        "
        SELECT nome_arquivo, nome_tabela, ultima_modificacao, ultimo_processamento
        FROM tb_rastreamento_arquivos
        ORDER BY nome_tabela ASC, nome_arquivo ASC
        ",
    )?;

    let records = statement
        .query_map([], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to list tracking records")?;
    Ok(records)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrackingRecord> {
    Ok(TrackingRecord {
        file_name: row.get(0)?,
        table_name: row.get(1)?,
        last_modified: row.get(2)?,
        last_processed: row.get(3)?,
    })
}

pub(super) fn upsert_record(
    connection: &Connection,
    file_name: &str,
    table_name: &str,
    modified: DateTime<Utc>,
    processed: DateTime<Utc>,
) -> Result<()> {
    connection
        .execute(
            "
            INSERT INTO tb_rastreamento_arquivos(nome_arquivo, nome_tabela, ultima_modificacao, ultimo_processamento)
            VALUES(?1, ?2, ?3, ?4)
            ON CONFLICT(nome_arquivo) DO UPDATE SET
              nome_tabela=excluded.nome_tabela,
              ultima_modificacao=excluded.ultima_modificacao,
              ultimo_processamento=excluded.ultimo_processamento
            ",
            params![
                file_name,
                table_name,
                utc_micros_string(modified),
                utc_micros_string(processed),
            ],
        )
        .with_context(|| format!("failed to update tracking record for {file_name}"))?;
    Ok(())
}

/// Accepts RFC 3339 as written by this tool and the naive local timestamps
/// found in ledgers written by earlier tooling.
pub(super) fn parse_tracked_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(trimmed, format) {
            let Some(local) = naive.and_local_timezone(Local).earliest() else {
                bail!("tracked timestamp does not exist in local time: {raw}");
            };
            return Ok(local.with_timezone(&Utc));
        }
    }

    bail!("unrecognized tracked timestamp: {raw}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 250_000_000)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn upsert_inserts_then_updates_a_single_record() {
        let connection = Connection::open_in_memory().expect("in-memory DB should open");
        ensure_tracking_schema(&connection).expect("schema should initialize");

        upsert_record(&connection, "saldo_20241102_x.xlsx", "tb_saldo", ts(100), ts(200))
            .expect("insert should succeed");
        upsert_record(&connection, "saldo_20241102_x.xlsx", "tb_saldo", ts(300), ts(400))
            .expect("update should succeed");

        let records = list_records(&connection).expect("records should list");
        assert_eq!(records.len(), 1);

        let record = find_record(&connection, "saldo_20241102_x.xlsx")
            .expect("lookup should succeed")
            .expect("record should exist");
        assert_eq!(record.table_name, "tb_saldo");
        assert_eq!(
            parse_tracked_timestamp(&record.last_modified).expect("timestamp should parse"),
            ts(300)
        );
        assert_eq!(
            parse_tracked_timestamp(record.last_processed.as_deref().unwrap_or_default())
                .expect("timestamp should parse"),
            ts(400)
        );
    }

    #[test]
    fn find_record_returns_none_for_unknown_files() {
        let connection = Connection::open_in_memory().expect("in-memory DB should open");
        ensure_tracking_schema(&connection).expect("schema should initialize");
        assert!(
            find_record(&connection, "missing.xlsx")
                .expect("lookup should succeed")
                .is_none()
        );
    }

    #[test]
    fn parse_tracked_timestamp_reads_naive_legacy_values() {
        let parsed = parse_tracked_timestamp("2024-11-02 10:30:45.123456")
            .expect("legacy timestamp should parse");
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 11, 2)
            .and_then(|date| date.and_hms_micro_opt(10, 30, 45, 123_456))
            .and_then(|naive| naive.and_local_timezone(Local).earliest())
            .expect("valid local timestamp")
            .with_timezone(&Utc);
        assert_eq!(parsed, expected);

        assert!(parse_tracked_timestamp("2024-11-02 10:30:45").is_ok());
        assert!(parse_tracked_timestamp("yesterday").is_err());
    }
}
