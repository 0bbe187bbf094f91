use super::*;

/// Differences up to this many seconds are filesystem timestamp truncation.
pub(super) const MODIFIED_TOLERANCE_MS: i64 = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum ProcessReason {
    NeverProcessed,
    Modified { drift_ms: i64 },
    DetectionFailed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Decision {
    Process(ProcessReason),
    Skip(SkipReason),
}

/// Lookup errors resolve to processing: a redundant reload is preferable
/// to silently missing data.
pub(super) fn decide(
    connection: &Connection,
    spec: &DatasetSpec,
    file: &LocatedFile,
    reporting_date: Option<NaiveDate>,
) -> Decision {
    evaluate(connection, spec, file, reporting_date).unwrap_or_else(|err| {
        Decision::Process(ProcessReason::DetectionFailed {
            error: format!("{err:#}"),
        })
    })
}

fn evaluate(
    connection: &Connection,
    spec: &DatasetSpec,
    file: &LocatedFile,
    reporting_date: Option<NaiveDate>,
) -> Result<Decision> {
    let Some(record) = find_record(connection, &file.file_name)? else {
        if spec.snapshot_guard {
            if let Some(date) = reporting_date {
                if partition_has_date(connection, spec, date)? {
                    return Ok(Decision::Skip(SkipReason::SnapshotAlreadyLoaded {
                        reporting_date: date,
                    }));
                }
            }
        }
        return Ok(Decision::Process(ProcessReason::NeverProcessed));
    };

    let tracked = parse_tracked_timestamp(&record.last_modified)?;
    let drift_ms = (file.modified - tracked).num_milliseconds().abs();
    if drift_ms > MODIFIED_TOLERANCE_MS {
        Ok(Decision::Process(ProcessReason::Modified { drift_ms }))
    } else {
        Ok(Decision::Skip(SkipReason::Unchanged))
    }
}

fn partition_has_date(connection: &Connection, spec: &DatasetSpec, date: NaiveDate) -> Result<bool> {
    if !table_exists(connection, spec.table)? {
        return Ok(false);
    }

    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE date({}) = ?1)",
        spec.table,
        spec.partition_column()
    );
    let exists = connection
        .query_row(&sql, [date.format("%Y-%m-%d").to_string()], |row| {
            row.get::<_, bool>(0)
        })
        .with_context(|| format!("failed to look up {} rows for {date}", spec.table))?;
    Ok(exists)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::datasets::{ORDENS_RF, POSITIVADOR, SALDO};

    fn located(name: &str, secs: i64) -> LocatedFile {
        LocatedFile {
            path: PathBuf::from(name),
            file_name: name.to_string(),
            modified: Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
        }
    }

    fn store() -> Connection {
        let connection = Connection::open_in_memory().expect("in-memory DB should open");
        ensure_tracking_schema(&connection).expect("schema should initialize");
        connection
    }

    fn track(connection: &Connection, file: &LocatedFile, table: &str) {
        upsert_record(connection, &file.file_name, table, file.modified, file.modified)
            .expect("tracking should upsert");
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn untracked_file_is_processed() {
        let connection = store();
        let file = located("ordens_rf_20241102_x.xlsx", 1_000);
        assert_eq!(
            decide(&connection, &ORDENS_RF, &file, Some(date(2024, 11, 2))),
            Decision::Process(ProcessReason::NeverProcessed)
        );
    }

    #[test]
    fn modification_within_one_second_is_unchanged() {
        let connection = store();
        let tracked = located("ordens_rf_20241102_x.xlsx", 1_000);
        track(&connection, &tracked, "tb_ordens_rf");

        let same = located("ordens_rf_20241102_x.xlsx", 1_000);
        let within = located("ordens_rf_20241102_x.xlsx", 1_001);
        let later = located("ordens_rf_20241102_x.xlsx", 1_002);

        assert_eq!(
            decide(&connection, &ORDENS_RF, &same, None),
            Decision::Skip(SkipReason::Unchanged)
        );
        assert_eq!(
            decide(&connection, &ORDENS_RF, &within, None),
            Decision::Skip(SkipReason::Unchanged)
        );
        assert_eq!(
            decide(&connection, &ORDENS_RF, &later, None),
            Decision::Process(ProcessReason::Modified { drift_ms: 2_000 })
        );
    }

    #[test]
    fn snapshot_guard_skips_untracked_file_with_loaded_date() {
        let connection = store();
        ensure_dataset_table(&connection, &SALDO).expect("table should exist");
        connection
            .execute(
                "INSERT INTO tb_saldo(codigo_cliente, data_saldo) VALUES (1, '2024-11-02')",
                [],
            )
            .expect("seed row should insert");

        let file = located("saldo_20241102_x.xlsx", 1_000);
        assert_eq!(
            decide(&connection, &SALDO, &file, Some(date(2024, 11, 2))),
            Decision::Skip(SkipReason::SnapshotAlreadyLoaded {
                reporting_date: date(2024, 11, 2)
            })
        );

        let other_day = located("saldo_20241103_x.xlsx", 1_000);
        assert_eq!(
            decide(&connection, &SALDO, &other_day, Some(date(2024, 11, 3))),
            Decision::Process(ProcessReason::NeverProcessed)
        );
    }

    #[test]
    fn snapshot_guard_matches_timestamped_partition_values() {
        let connection = store();
        ensure_dataset_table(&connection, &POSITIVADOR).expect("table should exist");
        connection
            .execute(
                "INSERT INTO tb_positivador(codigo_cliente, data_posicao) VALUES (1, '2024-11-02 00:00:00')",
                [],
            )
            .expect("seed row should insert");

        let file = located("positivador_20241102_x.xlsx", 1_000);
        assert!(matches!(
            decide(&connection, &POSITIVADOR, &file, Some(date(2024, 11, 2))),
            Decision::Skip(SkipReason::SnapshotAlreadyLoaded { .. })
        ));
    }

    #[test]
    fn datasets_without_guard_ignore_existing_rows() {
        let connection = store();
        ensure_dataset_table(&connection, &ORDENS_RF).expect("table should exist");
        connection
            .execute("INSERT INTO tb_ordens_rf(data_ordem) VALUES ('2024-11-02')", [])
            .expect("seed row should insert");

        let file = located("ordens_rf_20241102_x.xlsx", 1_000);
        assert_eq!(
            decide(&connection, &ORDENS_RF, &file, Some(date(2024, 11, 2))),
            Decision::Process(ProcessReason::NeverProcessed)
        );
    }

    #[test]
    fn lookup_errors_fail_open() {
        let connection = Connection::open_in_memory().expect("in-memory DB should open");
        let file = located("saldo_20241102_x.xlsx", 1_000);
        assert!(matches!(
            decide(&connection, &SALDO, &file, Some(date(2024, 11, 2))),
            Decision::Process(ProcessReason::DetectionFailed { .. })
        ));
    }

    #[test]
    fn unreadable_tracked_timestamp_fails_open() {
        let connection = store();
        connection
            .execute(
                "INSERT INTO tb_rastreamento_arquivos(nome_arquivo, nome_tabela, ultima_modificacao)
                 VALUES ('saldo_20241102_x.xlsx', 'tb_saldo', 'garbage')",
                [],
            )
            .expect("seed record should insert");

        let file = located("saldo_20241102_x.xlsx", 1_000);
        assert!(matches!(
            decide(&connection, &SALDO, &file, None),
            Decision::Process(ProcessReason::DetectionFailed { .. })
        ));
    }
}
